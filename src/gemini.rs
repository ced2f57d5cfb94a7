use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("API request failed with status {status}")]
    RequestFailed { status: u16 },

    #[error("unexpected response shape: {0}")]
    MalformedResponse(&'static str),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "topK")]
    top_k: i32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: i32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Client for the Gemini generateContent endpoint.
///
/// One best-effort call per user action: no retry, no timeout, no
/// cancellation. Both failure kinds must be handled by the caller.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(api_key: &str, model: &str, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one prompt and return the generated text verbatim.
    pub async fn query(&self, prompt: &str) -> Result<String, GeminiError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        // Deterministic sampling: the tutor should give the same solution
        // for the same problem.
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                top_k: 1,
                top_p: 1.0,
                max_output_tokens: 2048,
            },
        };

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeminiError::RequestFailed {
                status: status.as_u16(),
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|_| GeminiError::MalformedResponse("body is not generateContent JSON"))?;

        extract_text(body)
    }
}

/// Pull `candidates[0].content.parts[0].text` out of a response.
fn extract_text(response: GenerateContentResponse) -> Result<String, GeminiError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(GeminiError::MalformedResponse("no candidates"))?;
    let content = candidate
        .content
        .ok_or(GeminiError::MalformedResponse("candidate has no content"))?;
    let part = content
        .parts
        .into_iter()
        .next()
        .ok_or(GeminiError::MalformedResponse("content has no parts"))?;
    part.text
        .ok_or(GeminiError::MalformedResponse("part has no text"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn test_client(server: &MockServer) -> GeminiClient {
        GeminiClient::with_base_url("test-key", DEFAULT_MODEL, server.base_url())
    }

    #[tokio::test]
    async fn test_query_extracts_text() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(format!("/models/{}:generateContent", DEFAULT_MODEL))
                    .query_param("key", "test-key");
                then.status(200).json_body(serde_json::json!({
                    "candidates": [{
                        "content": {
                            "parts": [{ "text": "STEP: add 2\nANSWER: 4" }],
                            "role": "model"
                        }
                    }]
                }));
            })
            .await;

        let text = test_client(&server).query("2+2").await.unwrap();
        assert_eq!(text, "STEP: add 2\nANSWER: 4");
    }

    #[tokio::test]
    async fn test_query_sends_deterministic_generation_config() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .json_body_includes(
                        serde_json::json!({
                            "generationConfig": {
                                "temperature": 0.1,
                                "topK": 1,
                                "topP": 1.0,
                                "maxOutputTokens": 2048
                            }
                        })
                        .to_string(),
                    );
                then.status(200).json_body(serde_json::json!({
                    "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }]
                }));
            })
            .await;

        test_client(&server).query("2+2").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_request_failed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(500).body("internal error");
            })
            .await;

        let err = test_client(&server).query("2+2").await.unwrap_err();
        match err {
            GeminiError::RequestFailed { status } => assert_eq!(status, 500),
            other => panic!("expected RequestFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_candidates_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(serde_json::json!({ "candidates": [] }));
            })
            .await;

        let err = test_client(&server).query("2+2").await.unwrap_err();
        assert!(matches!(err, GeminiError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_missing_text_field_is_malformed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(serde_json::json!({
                    "candidates": [{ "content": { "parts": [{}] } }]
                }));
            })
            .await;

        let err = test_client(&server).query("2+2").await.unwrap_err();
        assert!(matches!(err, GeminiError::MalformedResponse(_)));
    }
}
