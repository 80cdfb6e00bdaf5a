//! Error types for the cookieless visitor client
//!
//! Failures are reported to the immediate caller either as an empty visitor
//! id (transport, polling) or as one of these errors (extractor, host,
//! configuration). Each variant carries:
//! - an error code for programmatic handling
//! - a retryable classification
//! - a user-facing message

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasm_bindgen::JsValue;

pub type Result<T> = std::result::Result<T, VisitorError>;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Host / extractor errors (1xx)
    HostUnavailable = 100,
    ExtractorFailed = 101,
    JsException = 102,

    // Transport errors (2xx)
    TransportFailed = 200,
    HttpStatus = 201,

    // Beacon errors (3xx)
    BeaconFailed = 300,

    // Serialization errors (4xx)
    SerializationFailed = 400,

    // Configuration errors (8xx)
    ConfigError = 800,
}

/// Main error type for the visitor client
#[derive(Error, Debug, Clone)]
pub enum VisitorError {
    // ===== Host / Extractor Errors =====
    #[error("Host capability unavailable: {0}")]
    HostUnavailable(String),

    #[error("{extractor} extractor failed: {reason}")]
    Extractor {
        extractor: &'static str,
        reason: String,
    },

    #[error("JavaScript error: {0}")]
    Js(String),

    // ===== Transport Errors =====
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {0}")]
    HttpStatus(u16),

    // ===== Beacon Errors =====
    #[error("Beacon error: {0}")]
    Beacon(String),

    // ===== Serialization Errors =====
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ===== Configuration Errors =====
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl VisitorError {
    /// Wrap a thrown JS value with the operation that raised it.
    pub fn js(context: &str, value: &JsValue) -> Self {
        VisitorError::Js(format!("{}: {:?}", context, value))
    }

    /// Attribute a failure to one of the five feature extractors.
    pub fn extractor(extractor: &'static str, reason: impl Into<String>) -> Self {
        VisitorError::Extractor {
            extractor,
            reason: reason.into(),
        }
    }

    /// Get the error code for programmatic handling
    pub fn code(&self) -> ErrorCode {
        match self {
            VisitorError::HostUnavailable(_) => ErrorCode::HostUnavailable,
            VisitorError::Extractor { .. } => ErrorCode::ExtractorFailed,
            VisitorError::Js(_) => ErrorCode::JsException,
            VisitorError::Transport(_) => ErrorCode::TransportFailed,
            VisitorError::HttpStatus(_) => ErrorCode::HttpStatus,
            VisitorError::Beacon(_) => ErrorCode::BeaconFailed,
            VisitorError::Serialization(_) => ErrorCode::SerializationFailed,
            VisitorError::Config(_) => ErrorCode::ConfigError,
        }
    }

    /// Whether a later, independent attempt might succeed.
    ///
    /// Nothing inside the client retries; this is advice for the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            VisitorError::Transport(_) => true,
            VisitorError::HttpStatus(status) => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Get a user-friendly message for display
    pub fn user_message(&self) -> String {
        match self {
            VisitorError::HostUnavailable(_) => {
                "This page is not running in a browser context with a document.".into()
            }
            VisitorError::Extractor { extractor, .. } => {
                format!("Could not read the {} signal from this browser.", extractor)
            }
            VisitorError::Js(_) => "The browser rejected an operation.".into(),
            VisitorError::Transport(_) => {
                "Could not reach the visitor service. Please check your connection.".into()
            }
            VisitorError::HttpStatus(status) => {
                format!("The visitor service answered with status {}.", status)
            }
            VisitorError::Beacon(_) => "Could not attach the verification beacon.".into(),
            VisitorError::Serialization(_) => "Failed to encode browser signals.".into(),
            VisitorError::Config(_) => {
                "Invalid visitor client configuration. Please check the endpoint.".into()
            }
        }
    }
}

impl From<serde_json::Error> for VisitorError {
    fn from(err: serde_json::Error) -> Self {
        VisitorError::Serialization(err.to_string())
    }
}

impl From<VisitorError> for JsValue {
    fn from(err: VisitorError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// Error information for JavaScript consumption
#[derive(Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: u32,
    pub message: String,
    pub user_message: String,
    pub is_retryable: bool,
}

impl From<&VisitorError> for ErrorInfo {
    fn from(err: &VisitorError) -> Self {
        ErrorInfo {
            code: err.code() as u32,
            message: err.to_string(),
            user_message: err.user_message(),
            is_retryable: err.is_retryable(),
        }
    }
}
