//! Type definitions for model provider interactions

use serde::{Deserialize, Serialize};
use wbs_core::{Result, WbsError};

/// Credential plus model identifier, set once and read by every call
#[derive(Clone, PartialEq, Eq)]
pub struct ModelSession {
    api_key: String,
    model: String,
}

impl ModelSession {
    /// Create a session; an empty credential or model id is rejected
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        let model = model.into();
        if api_key.trim().is_empty() {
            return Err(WbsError::NotInitialized("API key is required".to_string()));
        }
        if model.trim().is_empty() {
            return Err(WbsError::NotInitialized("model identifier is required".to_string()));
        }
        tracing::info!("Initializing model session with model {}", model);
        Ok(Self { api_key, model })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for ModelSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown: String = self.api_key.chars().take(4).collect();
        f.debug_struct("ModelSession")
            .field("api_key", &format!("{}...", shown))
            .field("model", &self.model)
            .finish()
    }
}

/// Gemini `generateContent` request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationParams>,
}

impl GeminiRequest {
    /// Single-turn request carrying one user prompt
    pub fn from_prompt(prompt: &str, generation_config: Option<GenerationParams>) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config,
        }
    }
}

/// Optional sampling parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Gemini `generateContent` response body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate
    pub fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage information
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: usize,
    #[serde(default)]
    pub candidates_token_count: usize,
}

/// Error envelope returned on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiErrorBody {
    pub error: GeminiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiErrorDetail {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_requires_key() {
        let err = ModelSession::new("", "gemini-1.5-flash").unwrap_err();
        assert!(matches!(err, WbsError::NotInitialized(_)));
        assert!(ModelSession::new("key", " ").is_err());

        let session = ModelSession::new("AIzaSecret", "gemini-1.5-flash").unwrap();
        assert_eq!(session.model(), "gemini-1.5-flash");
        assert_eq!(session.api_key(), "AIzaSecret");
    }

    #[test]
    fn test_session_debug_redacts_key() {
        let session = ModelSession::new("AIzaSecretValue", "gemini-1.5-flash").unwrap();
        let shown = format!("{:?}", session);
        assert!(shown.contains("AIza..."));
        assert!(!shown.contains("SecretValue"));
    }

    #[test]
    fn test_request_shape() {
        let params = GenerationParams {
            temperature: Some(0.4),
            max_output_tokens: None,
        };
        let value = serde_json::to_value(GeminiRequest::from_prompt("hi", Some(params))).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["contents"][0]["role"], "user");
        assert!(value["generationConfig"]["temperature"].is_number());
        assert!(value["generationConfig"].get("maxOutputTokens").is_none());

        let bare = serde_json::to_value(GeminiRequest::from_prompt("hi", None)).unwrap();
        assert!(bare.get("generationConfig").is_none());
    }

    #[test]
    fn test_response_text() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "[1,"}, {"text": "2]"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 4}
        }"#;
        let response: GeminiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.text().as_deref(), Some("[1,2]"));
        assert_eq!(response.usage_metadata.unwrap().candidates_token_count, 4);

        let empty: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(empty.text(), None);
    }
}
