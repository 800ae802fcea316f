//! Credential lookup for the model provider
//!
//! The API key is read from the environment variable named in
//! `ModelConfig::api_key_env` (`GEMINI_API_KEY` by default).

use wbs_core::{Result, WbsError};
use std::env;

/// Get the API key stored in `env_var`
///
/// An unset or blank variable means the session cannot be initialized.
pub fn get_api_key(env_var: &str) -> Result<String> {
    match env::var(env_var) {
        Ok(key) if !key.trim().is_empty() => {
            tracing::info!("Using API key from {}", env_var);
            Ok(key.trim().to_string())
        }
        _ => Err(WbsError::NotInitialized(format!(
            "API key is required. Set {}=<your key>",
            env_var
        ))),
    }
}
