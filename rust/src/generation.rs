use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use tracing::debug;

use crate::config_store::GenerationSettings;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("request to generation service failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("generation service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed generation response: {0}")]
    MalformedResponse(String),

    #[error("no code generated")]
    EmptyCompletion,
}

/// One outbound request producing a single text completion.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, instruction: &str) -> Result<String, GenerationError>;
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, settings: &GenerationSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: settings.api_base_url.clone(),
            model: settings.model.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(&self, instruction: &str) -> Result<String, GenerationError> {
        debug!(model = %self.model, chars = instruction.len(), "sending generateContent");

        let resp = self
            .client
            .post(self.endpoint())
            .header("content-type", "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .json(&build_request_body(instruction))
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(transport)?;
        if !status.is_success() {
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }

        let json: Value = serde_json::from_str(&body)
            .map_err(|err| GenerationError::MalformedResponse(err.to_string()))?;
        parse_completion(&json)
    }
}

fn transport(err: reqwest::Error) -> GenerationError {
    GenerationError::Transport(err.without_url())
}

fn build_request_body(instruction: &str) -> Value {
    json!({
        "contents": [
            {
                "role": "user",
                "parts": [{ "text": instruction }]
            }
        ]
    })
}

/// Concatenates the text parts of the first candidate. A candidate with no
/// text yields an empty string; the caller decides what that means.
fn parse_completion(json: &Value) -> Result<String, GenerationError> {
    let candidate = json["candidates"]
        .as_array()
        .and_then(|candidates| candidates.first())
        .ok_or_else(|| {
            let reason = json["promptFeedback"]["blockReason"]
                .as_str()
                .map(|r| format!("prompt blocked: {r}"))
                .unwrap_or_else(|| "missing candidates".to_string());
            GenerationError::MalformedResponse(reason)
        })?;

    let text = candidate["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect::<String>()
        })
        .unwrap_or_default();

    Ok(text)
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::{
        build_request_body, extract_error_message, parse_completion, GeminiClient,
        GenerationClient, GenerationError, API_KEY_HEADER,
    };
    use crate::config_store::GenerationSettings;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    const STUB_KEY: &str = "SECRET123";

    fn settings(api_base_url: String) -> GenerationSettings {
        GenerationSettings {
            model: "gemini-1.5-flash".to_string(),
            api_base_url,
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }

    async fn stub_generate(
        Path(call): Path<String>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let key = headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if key != STUB_KEY {
            return (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": { "code": 403, "message": "API key not valid" } })),
            );
        }

        let echoed = body["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        (
            StatusCode::OK,
            Json(json!({
                "candidates": [
                    { "content": { "parts": [{ "text": format!("<html>{call}|{echoed}</html>") }] } }
                ]
            })),
        )
    }

    /// Serves a local `generateContent` stand-in and returns its base URL.
    async fn spawn_stub() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub");
        let addr = listener.local_addr().expect("stub addr");
        let app = Router::new().route("/v1beta/models/{call}", post(stub_generate));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}/v1beta")
    }

    #[test]
    fn request_body_carries_instruction_as_single_user_part() {
        let body = build_request_body("make a site");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "make a site");
        assert_eq!(body["contents"][0]["parts"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn endpoint_targets_model_generate_content() {
        let client = GeminiClient::new(
            "k3y".to_string(),
            &GenerationSettings {
                model: "gemini-1.5-flash".to_string(),
                api_base_url: "https://example.test/v1beta".to_string(),
                api_key_env: "GEMINI_API_KEY".to_string(),
            },
        );
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert!(!format!("{client:?}").contains("k3y"));
    }

    #[test]
    fn completion_joins_text_parts_of_first_candidate() {
        let response = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "<html>" }, { "text": "...</html>" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        });
        assert_eq!(
            parse_completion(&response).expect("completion"),
            "<html>...</html>"
        );
    }

    #[test]
    fn completion_without_parts_is_empty() {
        let response = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        assert_eq!(parse_completion(&response).expect("completion"), "");
    }

    #[test]
    fn missing_candidates_is_malformed() {
        let response = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = parse_completion(&response).expect_err("should fail");
        assert!(err.to_string().contains("prompt blocked: SAFETY"));
    }

    #[test]
    fn error_message_prefers_api_error_field() {
        let body = r#"{"error":{"code":403,"message":"API key not valid"}}"#;
        assert_eq!(extract_error_message(body), "API key not valid");
        assert_eq!(extract_error_message("gateway down"), "gateway down");
    }

    #[tokio::test]
    async fn generate_sends_key_in_header() {
        let base = spawn_stub().await;
        let client = GeminiClient::new(STUB_KEY.to_string(), &settings(base));

        let text = client.generate("make a site").await.expect("completion");
        assert_eq!(text, "<html>gemini-1.5-flash:generateContent|make a site</html>");
    }

    #[tokio::test]
    async fn rejected_key_maps_to_api_error() {
        let base = spawn_stub().await;
        let client = GeminiClient::new("wrong".to_string(), &settings(base));

        match client.generate("make a site").await {
            Err(GenerationError::Api { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_error_does_not_reveal_key() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr").port()
        };
        let client = GeminiClient::new(
            STUB_KEY.to_string(),
            &settings(format!("http://127.0.0.1:{port}/v1beta")),
        );

        let err = client.generate("make a site").await.expect_err("refused");
        assert!(matches!(err, GenerationError::Transport(_)));
        let shown = err.to_string();
        assert!(!shown.contains(STUB_KEY), "{shown}");
        assert!(!shown.contains("generateContent"), "{shown}");
    }
}
