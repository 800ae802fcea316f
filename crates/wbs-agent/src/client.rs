//! Language model client
//!
//! Each `generate` call is a single stateless request/response round trip.
//! Nothing is retried here; failures are tagged with an error kind at the
//! point they happen (transport, HTTP status, body decoding) and returned.

use async_trait::async_trait;
use wbs_core::{ModelConfig, Result, WbsError};

use crate::auth;
use crate::types::{GeminiErrorBody, GeminiRequest, GeminiResponse, GenerationParams, ModelSession};

/// Opaque text-in/text-out model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one prompt and return the raw reply text
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logging
    fn model_name(&self) -> &str;
}

/// Google Gemini `generateContent` client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    session: ModelSession,
    base_url: String,
    params: Option<GenerationParams>,
}

impl GeminiClient {
    /// Create a client for an initialized session
    pub fn new(session: ModelSession) -> Self {
        Self {
            http: reqwest::Client::new(),
            session,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            params: None,
        }
    }

    /// Build a client from configuration, reading the key from the environment
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let api_key = auth::get_api_key(&config.api_key_env)?;
        let session = ModelSession::new(api_key, config.name.clone())?;

        let params = if config.temperature.is_some() || config.max_output_tokens.is_some() {
            Some(GenerationParams {
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
            })
        } else {
            None
        };

        Ok(Self::new(session)
            .with_base_url(config.base_url.clone())
            .with_params(params))
    }

    /// Override the provider base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use a preconfigured HTTP client (proxies, timeouts)
    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Set sampling parameters
    pub fn with_params(mut self, params: Option<GenerationParams>) -> Self {
        self.params = params;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.session.model()
        )
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!(
            "Sending {} char prompt to {}",
            prompt.len(),
            self.session.model()
        );

        let request = GeminiRequest::from_prompt(prompt, self.params.clone());

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", self.session.api_key())
            .json(&request)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            let err = classify_status(status.as_u16(), &body);
            tracing::error!("Model provider returned {}: {}", status, err);
            return Err(err);
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| WbsError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        if let Some(ref usage) = parsed.usage_metadata {
            tracing::info!(
                "Model call complete ({} prompt tokens, {} output tokens)",
                usage.prompt_token_count,
                usage.candidates_token_count
            );
        }

        parsed
            .text()
            .ok_or_else(|| WbsError::InvalidResponse("No content in response".to_string()))
    }

    fn model_name(&self) -> &str {
        self.session.model()
    }
}

/// Map a transport-level failure to an error kind
///
/// The request URL is stripped from the message before it is kept.
fn classify_transport(err: reqwest::Error) -> WbsError {
    let err = err.without_url();
    if err.is_decode() {
        WbsError::InvalidResponse(err.to_string())
    } else {
        WbsError::Network(err.to_string())
    }
}

/// Map a non-2xx provider response to an error kind
pub(crate) fn classify_status(status: u16, body: &str) -> WbsError {
    let (message, provider_status) = match serde_json::from_str::<GeminiErrorBody>(body) {
        Ok(parsed) => (parsed.error.message, parsed.error.status),
        Err(_) => (body.to_string(), String::new()),
    };

    let credential_rejected = matches!(status, 401 | 403)
        || provider_status == "UNAUTHENTICATED"
        || provider_status == "PERMISSION_DENIED"
        || (status == 400 && message.contains("API key"));

    if credential_rejected {
        WbsError::Credential(message)
    } else if status == 429 || provider_status == "RESOURCE_EXHAUSTED" {
        WbsError::Quota(message)
    } else {
        WbsError::Provider { status, message }
    }
}
