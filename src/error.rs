//! Typed error kinds for the affective state engine.
//!
//! Five kinds, distinguished by recovery policy: `Config` and `Validation`
//! are surfaced to the caller with state left untouched; `Io` is surfaced
//! but the in-memory state the caller already holds remains valid;
//! `Schema` and `Classifier` are recovered locally (fallback to default
//! state / neutral classification) and never escape as an `Err` from the
//! operations that can hit them.

use thiserror::Error;

/// Top-level error type for all fallible engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing required option, out-of-range configuration value, or an
    /// unknown preset id. Fatal to the operation that raised it.
    #[error("config error: {0}")]
    Config(String),

    /// State write failure or lock-file collision after retry.
    #[error("io error: {message}")]
    Io {
        message: String,
        #[source]
        cause: Option<std::io::Error>,
    },

    /// Unreadable or malformed state file on read. Callers that can
    /// recover locally (`state::read`) never propagate this; it exists so
    /// the persistence layer has something concrete to return.
    #[error("schema error: {0}")]
    Schema(String),

    /// Network, HTTP, or parse failure from the classifier. Recovered
    /// locally by the classifier itself (§7) -- this variant is mostly
    /// useful for the classification log and tests.
    #[error("classifier error: {message}")]
    Classifier {
        message: String,
        cause_excerpt: Option<String>,
    },

    /// Invalid trait or config value passed to a mutation operation.
    #[error("validation error: {0}")]
    Validation(String),
}

impl EngineError {
    pub fn io(message: impl Into<String>, cause: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            cause: Some(cause),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn classifier(message: impl Into<String>, cause_excerpt: Option<String>) -> Self {
        Self::Classifier {
            message: message.into(),
            cause_excerpt,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
