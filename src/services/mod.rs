pub mod image_prep;
pub mod openrouter; // OpenRouter AI service

pub use openrouter::{EstimationService, OpenRouterService};
