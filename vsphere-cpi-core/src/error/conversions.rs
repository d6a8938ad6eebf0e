//! Error conversion implementations for CpiError
//!
//! This module provides From trait implementations for converting
//! external error types into CpiError variants.

use super::types::CpiError;

impl From<std::io::Error> for CpiError {
    fn from(err: std::io::Error) -> Self {
        CpiError::IoError(Box::new(err))
    }
}

impl From<serde_json::Error> for CpiError {
    fn from(err: serde_json::Error) -> Self {
        CpiError::Serialization {
            operation: "json".to_string(),
            source: Box::new(err),
        }
    }
}

impl From<serde_yaml::Error> for CpiError {
    fn from(err: serde_yaml::Error) -> Self {
        CpiError::Serialization {
            operation: "yaml".to_string(),
            source: Box::new(err),
        }
    }
}

impl From<toml::de::Error> for CpiError {
    fn from(err: toml::de::Error) -> Self {
        CpiError::ConfigurationError {
            component: "toml".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for CpiError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            CpiError::Internal {
                message: format!("Task panicked: {}", err),
            }
        } else {
            CpiError::Internal {
                message: format!("Task cancelled: {}", err),
            }
        }
    }
}
