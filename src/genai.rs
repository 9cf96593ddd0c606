//! ==============================================================================
//! genai.rs - client for the external text-generation service
//! ==============================================================================
//!
//! purpose:
//!     turns a prompt into generated text. the server only sees the
//!     `InsightGenerator` trait, so tests can swap in a stub and count calls.
//!
//! contract:
//!     - one request per call, no retries, no streaming
//!     - model, base url and timeout come from configuration, never from
//!       the request
//!
//! wire format (gemini generateContent):
//!
//! ```text
//!     POST {base_url}/v1beta/models/{model}:generateContent
//!     x-goog-api-key: <key>
//!     {"contents":[{"role":"user","parts":[{"text":"..."}]}]}
//!
//!     -> {"candidates":[{"content":{"parts":[{"text":"..."}]}}]}
//! ```
//!
//! ==============================================================================

use crate::config::GenAiConfig;
use crate::error::GenAiError;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// upstream error bodies can be large; only this much goes into the error
const MAX_ERROR_BODY: usize = 512;

/// anything that can produce an insight from a prompt
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenAiError>;
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &GenAiConfig, api_key: String) -> Result<Self, GenAiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl InsightGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenAiError> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(code, body));
        }

        let bytes = response.bytes().await?;
        let parsed: GenerateContentResponse =
            serde_json::from_slice(&bytes).map_err(|e| GenAiError::Parse(e.to_string()))?;

        extract_text(parsed)
    }
}

fn classify_status(code: u16, mut body: String) -> GenAiError {
    // an invalid key comes back as 400 INVALID_ARGUMENT, not 401
    if code == 401 || code == 403 || body.contains("API_KEY_INVALID") {
        return GenAiError::Auth(code);
    }
    if code == 429 {
        return GenAiError::Quota;
    }
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    GenAiError::Status { code, body }
}

fn extract_text(response: GenerateContentResponse) -> Result<String, GenAiError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => Err(GenAiError::Blocked(reason)),
            None => Err(GenAiError::EmptyResponse),
        };
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GenAiError::EmptyResponse);
    }
    Ok(text)
}

// ==============================================================================
// wire types
// ==============================================================================

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_extract_joins_parts() {
        let response = parse(json!({
            "candidates": [{"content": {"parts": [{"text": "Clima "}, {"text": "ameno."}]}}]
        }));
        assert_eq!(extract_text(response).unwrap(), "Clima ameno.");
    }

    #[test]
    fn test_extract_blocked_prompt() {
        let response = parse(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        assert!(matches!(extract_text(response), Err(GenAiError::Blocked(r)) if r == "SAFETY"));
    }

    #[test]
    fn test_extract_whitespace_is_empty() {
        let response = parse(json!({"candidates": [{"content": {"parts": [{"text": "  \n"}]}}]}));
        assert!(matches!(extract_text(response), Err(GenAiError::EmptyResponse)));

        let response = parse(json!({"candidates": [{"finishReason": "SAFETY"}]}));
        assert!(matches!(extract_text(response), Err(GenAiError::EmptyResponse)));
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(classify_status(401, String::new()), GenAiError::Auth(401)));
        assert!(matches!(classify_status(403, String::new()), GenAiError::Auth(403)));
        assert!(matches!(
            classify_status(400, r#"{"reason":"API_KEY_INVALID"}"#.to_string()),
            GenAiError::Auth(400)
        ));
        assert!(matches!(classify_status(429, String::new()), GenAiError::Quota));
        assert!(matches!(
            classify_status(503, "overloaded".to_string()),
            GenAiError::Status { code: 503, .. }
        ));
    }

    #[test]
    fn test_classify_truncates_long_bodies() {
        let body = "é".repeat(MAX_ERROR_BODY);
        match classify_status(500, body) {
            GenAiError::Status { body, .. } => assert!(body.len() <= MAX_ERROR_BODY),
            other => panic!("unexpected {other:?}"),
        }
    }
}
