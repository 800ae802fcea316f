//! Unified error types for WBS

use thiserror::Error;

use crate::types::NodeType;

/// Unified error type for all WBS operations
#[derive(Error, Debug)]
pub enum WbsError {
    // Session errors
    #[error("Model session not initialized: {0}")]
    NotInitialized(String),

    // Provider errors
    #[error("Failed to generate content: {0}")]
    Credential(String),

    #[error("Failed to generate content: {0}")]
    Network(String),

    #[error("Failed to generate content: quota exceeded: {0}")]
    Quota(String),

    #[error("Failed to generate content: provider error {status}: {message}")]
    Provider { status: u16, message: String },

    // Response errors
    #[error("Invalid JSON response: {0}")]
    InvalidResponse(String),

    #[error("Invalid {level} record at index {index}: {reason}")]
    InvalidRecord {
        level: NodeType,
        index: usize,
        reason: String,
    },

    // Tree errors
    #[error("Hierarchy violation: {0}")]
    Hierarchy(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    // Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

/// Structured failure category, attached where the error originates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Initialization,
    Credential,
    Connectivity,
    Quota,
    InvalidResponse,
    InvalidRecord,
    Hierarchy,
    Config,
    Other,
}

impl WbsError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotInitialized(_) => ErrorKind::Initialization,
            Self::Credential(_) => ErrorKind::Credential,
            Self::Network(_) => ErrorKind::Connectivity,
            Self::Quota(_) => ErrorKind::Quota,
            Self::Provider { .. } => ErrorKind::Other,
            Self::InvalidResponse(_) | Self::Serialization(_) => ErrorKind::InvalidResponse,
            Self::InvalidRecord { .. } => ErrorKind::InvalidRecord,
            Self::Hierarchy(_) | Self::NodeNotFound(_) => ErrorKind::Hierarchy,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) | Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Whether re-issuing the same generation call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Quota(_) => true,
            Self::Provider { status, .. } => *status >= 500,
            Self::InvalidResponse(_) | Self::InvalidRecord { .. } | Self::Serialization(_) => true,
            _ => false,
        }
    }

    /// Message suitable for showing to the person running the generation
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Initialization => {
                "Model session not initialized. Please provide an API key.".to_string()
            }
            ErrorKind::Credential => {
                "Invalid API key. Please check your Gemini API key configuration.".to_string()
            }
            ErrorKind::Connectivity => {
                "Network error. Please check your internet connection and try again.".to_string()
            }
            ErrorKind::Quota => "Model quota exhausted. Please wait and try again.".to_string(),
            ErrorKind::InvalidResponse | ErrorKind::InvalidRecord => {
                "Invalid response format from AI. Please try again.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type alias using WbsError
pub type Result<T> = std::result::Result<T, WbsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            WbsError::NotInitialized("no key".into()).kind(),
            ErrorKind::Initialization
        );
        assert_eq!(WbsError::Credential("bad".into()).kind(), ErrorKind::Credential);
        assert_eq!(WbsError::Network("down".into()).kind(), ErrorKind::Connectivity);
        assert_eq!(
            WbsError::InvalidResponse("eof".into()).kind(),
            ErrorKind::InvalidResponse
        );

        let parse_err = serde_json::from_str::<serde_json::Value>("nope").unwrap_err();
        assert_eq!(WbsError::from(parse_err).kind(), ErrorKind::InvalidResponse);
    }

    #[test]
    fn test_is_retryable() {
        assert!(WbsError::Network("reset".into()).is_retryable());
        assert!(WbsError::InvalidResponse("eof".into()).is_retryable());
        assert!(WbsError::Provider {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());
        assert!(!WbsError::Provider {
            status: 400,
            message: "bad request".into()
        }
        .is_retryable());
        assert!(!WbsError::Credential("bad".into()).is_retryable());
        assert!(!WbsError::NotInitialized("none".into()).is_retryable());
    }

    #[test]
    fn test_user_message() {
        assert!(WbsError::Credential("401".into())
            .user_message()
            .starts_with("Invalid API key"));
        assert!(WbsError::Network("timeout".into())
            .user_message()
            .starts_with("Network error"));
        assert_eq!(
            WbsError::InvalidRecord {
                level: NodeType::Story,
                index: 2,
                reason: "missing field `title`".into()
            }
            .user_message(),
            "Invalid response format from AI. Please try again."
        );
        assert_eq!(WbsError::Other("boom".into()).user_message(), "boom");
    }

    #[test]
    fn test_provider_message_preserved() {
        let err = WbsError::Credential("API key not valid".into());
        assert!(err.to_string().contains("API key not valid"));
    }
}
