use std::env;

/// Instructions sent alongside every meal photo. Overridable once at
/// startup via the ANALYSIS_PROMPT environment variable.
pub const DEFAULT_PROMPT: &str = "\
You are a certified nutritionist specializing in food image analysis.

Please analyze the following image of a meal. Your task is to:
1. Identify and name each visible food item (e.g., rice, curry, chapati, salad).
2. Estimate the number of calories for each item based on common serving sizes.
3. Calculate the total calorie count for the entire meal.
4. At the end, briefly state whether this meal is high/low in calories, balanced, or needs improvement.

Format your answer as:
1. Item Name - Approx. X calories
2. Item Name - Approx. Y calories
...
Total - Z calories

Include only relevant food items and ignore background objects or cutlery.
Be concise, clear, and professional.";

const DEFAULT_MODEL: &str = "anthropic/claude-3-haiku:beta";
const DEFAULT_MAX_DIMENSION: u32 = 1024;
const DEFAULT_PORT: u16 = 8080;

/// How uploads are normalized before encoding. Bounds the payload size and
/// gives the model a consistent input; not a correctness requirement.
#[derive(Debug, Clone)]
pub struct PreprocessPolicy {
    /// Convert to three-channel RGB and fit inside the bounding box.
    pub normalize: bool,
    /// Edge length of the square bounding box, in pixels.
    pub max_dimension: u32,
}

impl Default for PreprocessPolicy {
    fn default() -> Self {
        Self {
            normalize: true,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// OpenRouter credential. Absence is reported to the user at submission
    /// time instead of crashing the process.
    pub api_key: Option<String>,
    pub model: String,
    pub prompt: String,
    pub preprocess: PreprocessPolicy,
    pub port: u16,
}

/// Case-insensitive toggle: only an explicit "0"/"false"/"off"/"no"
/// disables preprocessing.
fn preprocess_enabled(value: Option<&str>) -> bool {
    match value.map(|v| v.trim().to_lowercase()) {
        Some(v) => !matches!(v.as_str(), "0" | "false" | "off" | "no"),
        None => true,
    }
}

impl AppConfig {
    /// Read configuration from the environment once at startup.
    pub fn from_env() -> Self {
        let api_key = env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let model =
            env::var("OPENROUTER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let prompt =
            env::var("ANALYSIS_PROMPT").unwrap_or_else(|_| DEFAULT_PROMPT.to_string());

        let normalize = preprocess_enabled(env::var("PREPROCESS_IMAGES").ok().as_deref());

        let max_dimension = env::var("MAX_IMAGE_DIMENSION")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|dim| *dim > 0)
            .unwrap_or(DEFAULT_MAX_DIMENSION);

        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        Self {
            api_key,
            model,
            prompt,
            preprocess: PreprocessPolicy {
                normalize,
                max_dimension,
            },
            port,
        }
    }
}
