//! Crate-wide error type and result alias
//!
//! One taxonomy for the whole bridge:
//! - Request/credential shape problems are rejected before any store or
//!   network call
//! - Upstream Slack failures are carried as `Upstream` and rendered inside
//!   tool envelopes, never as transport faults
//! - Store failures surface as 5xx with a generic message

use thiserror::Error;

/// Bridge error taxonomy
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Missing or malformed required field
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Credential fails the platform token / api key shape check
    #[error("invalid credential format: {0}")]
    InvalidCredentialFormat(String),

    /// No or invalid bearer credential
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Unknown, expired, or already-redeemed authorization code
    #[error("invalid grant")]
    InvalidGrant,

    /// Token endpoint called with a grant type other than authorization_code
    #[error("unsupported grant type: {0}")]
    UnsupportedGrantType(String),

    /// The Slack API returned a non-success response
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Key-value store unavailable or returned an unexpected failure
    #[error("store error: {0}")]
    Store(String),

    /// Unexpected internal failure
    #[error("internal error: {0}")]
    Internal(String),

    /// Record (de)serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    /// Missing/malformed field error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Credential shape error
    pub fn credential_format(msg: impl Into<String>) -> Self {
        Self::InvalidCredentialFormat(msg.into())
    }

    /// Missing/invalid bearer credential
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    /// Upstream platform failure
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Store-layer failure
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Internal failure
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<redis::RedisError> for BridgeError {
    fn from(e: redis::RedisError) -> Self {
        Self::Store(e.to_string())
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors may embed URLs with query strings; keep the message terse
        Self::Upstream(format!("request failed: {e}"))
    }
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, BridgeError>;
