//! Configuration management for WBS
//!
//! This module provides the repository-level settings: which model to call,
//! where its credential lives, and how generated batches are validated.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{NodeType, Result, WbsError};

/// Repository-level WBS configuration
///
/// Loaded from `.wbs/config.toml` in the working directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WbsConfig {
    /// Model selection and provider settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Batch generation behaviour
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier sent to the provider
    #[serde(default = "default_model")]
    pub name: String,

    /// Environment variable containing API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Provider base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

/// What to do with a batch where some records fail validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Reject the whole batch on the first invalid record
    #[default]
    Strict,
    /// Drop invalid records and keep the rest
    SkipInvalid,
}

/// Generation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub batch_policy: BatchPolicy,

    /// Deepest level the shell generates down to
    #[serde(default = "default_max_depth")]
    pub max_depth: NodeType,
}

// Default value providers
fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_max_depth() -> NodeType {
    NodeType::Task
}

impl WbsConfig {
    /// Load configuration from `.wbs/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(".wbs/config.toml");

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| WbsError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Write default configuration to `.wbs/config.toml`
    pub fn write_default(root: &Path) -> Result<()> {
        let config_dir = root.join(".wbs");
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| WbsError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            temperature: None,
            max_output_tokens: None,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            batch_policy: BatchPolicy::default(),
            max_depth: default_max_depth(),
        }
    }
}
