//! Error types for txn-insights.
//!
//! Defines the main error enum used throughout the crate.

use thiserror::Error;

/// Main error type for txn-insights operations.
#[derive(Error, Debug)]
pub enum InsightsError {
    /// Transport-level failures talking to the warehouse (DNS, TLS, resets, timeouts).
    #[error("Connection error: {0}")]
    Connection(String),

    /// Errors reported by the warehouse API itself (invalid query, permission denied, etc.)
    #[error("{0}")]
    Api(String),

    /// A statement was refused before reaching the warehouse.
    #[error("Policy error: {0}")]
    Policy(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (undecodable responses, unexpected states).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl InsightsError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a warehouse API error with the given message.
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Creates a policy error with the given message.
    pub fn policy(msg: impl Into<String>) -> Self {
        Self::Policy(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if the warehouse API reported this error.
    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api(_))
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Api(_) => "API Error",
            Self::Policy(_) => "Policy Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using InsightsError.
pub type Result<T> = std::result::Result<T, InsightsError>;
