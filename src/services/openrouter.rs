use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::models::EncodedImage;

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1000;

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        #[serde(rename = "type")]
        content_type: String,
        text: String,
    },
    ImageUrl {
        #[serde(rename = "type")]
        content_type: String,
        image_url: ImageData,
    },
}

#[derive(Debug, Serialize)]
struct ImageData {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    content: String,
}

/// Seam between the web layer and the remote model. The production
/// implementation is [`OpenRouterService`]; tests substitute a mock.
#[async_trait]
pub trait EstimationService: Send + Sync {
    /// One synchronous round trip: encoded image + prompt in, the model's
    /// free-text answer out, verbatim.
    async fn estimate(&self, image: &EncodedImage, prompt: &str) -> Result<String, AnalysisError>;
}

pub struct OpenRouterService {
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    base_url: String,
    client: reqwest::Client,
}

impl OpenRouterService {
    pub fn new(api_key: Option<String>, model: String) -> Self {
        Self {
            api_key,
            model,
            max_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            base_url: OPENROUTER_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the client at a local stand-in endpoint.
    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request(&self, image: &EncodedImage, prompt: &str) -> ChatRequest {
        let messages = vec![ChatMessage {
            role: "user".to_string(),
            content: vec![
                ContentPart::Text {
                    content_type: "text".to_string(),
                    text: prompt.to_string(),
                },
                ContentPart::ImageUrl {
                    content_type: "image_url".to_string(),
                    image_url: ImageData {
                        url: image.to_data_url(),
                    },
                },
            ],
        }];

        ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
        }
    }

    /// Pull `choices[0].message.content` out of a response body.
    fn extract_answer(body: &str) -> Result<String, AnalysisError> {
        let envelope: ChatResponse = serde_json::from_str(body)
            .map_err(|err| AnalysisError::Parse(format!("undecodable response envelope: {err}")))?;

        let choice = envelope
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AnalysisError::Parse("response contained no choices".to_string()))?;

        Ok(choice.message.content)
    }
}

#[async_trait]
impl EstimationService for OpenRouterService {
    async fn estimate(&self, image: &EncodedImage, prompt: &str) -> Result<String, AnalysisError> {
        // The credential check happens before anything touches the network.
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(AnalysisError::Configuration(
                "API key not found. Please set OPENROUTER_API_KEY in the environment or .env file."
                    .to_string(),
            ));
        };

        let request = self.build_request(image, prompt);
        log::info!("🤖 Sending request to OpenRouter with model: {}", self.model);
        log::debug!(
            "📤 Request payload size: {} bytes",
            serde_json::to_string(&request)
                .map(|body| body.len())
                .unwrap_or(0)
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", "https://github.com/calorie-adviser")
            .header("X-Title", "Calorie Adviser")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        log::debug!("📥 OpenRouter response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("❌ OpenRouter API error ({}): {}", status, body);
            return Err(AnalysisError::Http {
                status: Some(status.as_u16()),
                detail: format!("OpenRouter API error ({status}): {body}"),
            });
        }

        let body = response.text().await?;
        let answer = Self::extract_answer(&body)?;
        log::info!("💬 Received estimate ({} chars)", answer.len());

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    fn sample_image() -> EncodedImage {
        EncodedImage {
            png_base64: "aGVsbG8=".to_string(),
            width: 8,
            height: 8,
        }
    }

    fn test_service() -> OpenRouterService {
        OpenRouterService::new(Some("test_key".to_string()), "test_model".to_string())
    }

    /// Serve `router` on an ephemeral local port and return a base URL for it.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_request_payload_shape() {
        let service = test_service();
        let request = service.build_request(&sample_image(), "How many calories?");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "test_model");
        assert_eq!(json["max_tokens"], 1000);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"][0]["type"], "text");
        assert_eq!(json["messages"][0]["content"][0]["text"], "How many calories?");
        assert_eq!(json["messages"][0]["content"][1]["type"], "image_url");
        assert_eq!(
            json["messages"][0]["content"][1]["image_url"]["url"],
            "data:image/png;base64,aGVsbG8="
        );
    }

    #[test]
    fn test_extract_answer_returns_first_choice_verbatim() {
        let body = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "1. Rice - Approx. 200 calories\nTotal - 200 calories"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]
        }"#;

        let answer = OpenRouterService::extract_answer(body).unwrap();
        assert_eq!(
            answer,
            "1. Rice - Approx. 200 calories\nTotal - 200 calories"
        );
    }

    #[test]
    fn test_empty_choice_list_is_a_parse_error() {
        let err = OpenRouterService::extract_answer(r#"{"choices": []}"#).unwrap_err();
        match err {
            AnalysisError::Parse(msg) => assert!(msg.contains("no choices")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_envelope_is_a_parse_error() {
        let err = OpenRouterService::extract_answer(r#"{"error": "boom"}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::Parse(_)));

        let err = OpenRouterService::extract_answer("not json at all").unwrap_err();
        assert!(matches!(err, AnalysisError::Parse(_)));
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_any_network_call() {
        let service = OpenRouterService::new(None, "test_model".to_string());
        let err = service
            .estimate(&sample_image(), "prompt")
            .await
            .unwrap_err();

        match err {
            AnalysisError::Configuration(msg) => assert!(msg.contains("OPENROUTER_API_KEY")),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_estimate_returns_answer_from_endpoint() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async {
                Json(serde_json::json!({
                    "choices": [
                        {"message": {"role": "assistant", "content": "Total - 420 calories"}}
                    ]
                }))
            }),
        );
        let base_url = serve(router).await;

        let service = test_service().with_base_url(base_url);
        let answer = service.estimate(&sample_image(), "prompt").await.unwrap();
        assert_eq!(answer, "Total - 420 calories");
    }

    #[tokio::test]
    async fn test_non_success_status_becomes_http_error_with_detail() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    r#"{"error":"rate limited, slow down"}"#,
                )
            }),
        );
        let base_url = serve(router).await;

        let service = test_service().with_base_url(base_url);
        let err = service
            .estimate(&sample_image(), "prompt")
            .await
            .unwrap_err();

        match err {
            AnalysisError::Http { status, detail } => {
                assert_eq!(status, Some(429));
                assert!(detail.contains("429"));
                assert!(detail.contains("rate limited, slow down"));
            }
            other => panic!("expected http error, got {:?}", other),
        }
    }
}
