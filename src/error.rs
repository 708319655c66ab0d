//! Error types for the USB inventory service
//!
//! Provides structured error types for payload ingest, classification,
//! snapshot storage, configuration and the API surface.

use axum::http::StatusCode;
use thiserror::Error;

/// Unified error type for the inventory service
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Ingest Errors
    // =========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Vendor id has no parenthesized manufacturer: {vendor_id:?}")]
    MalformedVendorId { vendor_id: String },

    // =========================================================================
    // Classification Errors
    // =========================================================================
    #[error("Invalid classification rule for {device_type}: {reason}")]
    InvalidRulePattern { device_type: String, reason: String },

    // =========================================================================
    // Storage Errors
    // =========================================================================
    #[error("Storage operation failed: {backend} - {reason}")]
    Storage { backend: String, reason: String },

    // =========================================================================
    // Metrics Errors
    // =========================================================================
    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status reported to API callers for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidInput(_) | Error::MalformedVendorId { .. } | Error::JsonParse(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) | Error::JsonParse(_) => "invalid_input",
            Error::MalformedVendorId { .. } => "malformed_vendor_id",
            Error::InvalidRulePattern { .. } => "invalid_rule",
            Error::Configuration(_) | Error::YamlParse(_) => "configuration_error",
            Error::Storage { .. } | Error::Io(_) => "storage_error",
            Error::Metrics(_) | Error::Internal(_) => "internal_error",
        }
    }

    /// Check if the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Storage { .. } | Error::Io(_))
    }

    /// Check if the error was caused by the submitted data
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Result type alias for the inventory service
pub type Result<T> = std::result::Result<T, Error>;
