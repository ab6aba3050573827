mod config;
mod error;
mod models;
mod services;
mod web;

use std::sync::Arc;

use anyhow::Result;
use dotenv::dotenv;
use tokio::sync::Mutex;

use config::AppConfig;
use services::OpenRouterService;
use web::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Load environment variables
    dotenv().ok();

    log::info!("🚀 Starting Calorie Adviser...");

    let config = AppConfig::from_env();
    if config.api_key.is_none() {
        log::warn!("⚠️ OPENROUTER_API_KEY not set; submissions will fail until it is configured");
    }

    let estimator = Arc::new(OpenRouterService::new(
        config.api_key.clone(),
        config.model.clone(),
    ));
    log::info!("✅ OpenRouter service initialized with model: {}", config.model);

    let state = Arc::new(AppState {
        estimator,
        prompt: config.prompt.clone(),
        preprocess: config.preprocess.clone(),
        upload: Mutex::new(None),
    });
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    log::info!("🌐 Web server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            log::error!("❌ Web server error: {}", err);
        }
    });

    log::info!("🎉 Calorie Adviser is ready!");

    println!("\n🍱 Calorie Adviser is running!");
    println!("🌐 Open http://localhost:{} in your browser", config.port);
    println!("\n📸 Upload a meal photo (PNG or JPEG)");
    println!("🍎 Press \"Tell me about the total calories\" for the estimate");
    println!("\n🛑 Press Ctrl+C to stop\n");

    // Keep running
    tokio::signal::ctrl_c().await?;

    log::info!("🛑 Shutting down...");

    Ok(())
}
