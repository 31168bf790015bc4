use serde::{Deserialize, Serialize};
use std::fmt;

/// Single structured error shape shared by the core and AI crates.
///
/// The `code` carries the failure taxonomy; see [`ErrorClass`] for how codes
/// group into embedding, retrieval, generation and storage failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

/// Coarse failure class derived from an error code prefix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// No embedding provider, or the provider call failed.
    Embedding,
    /// The vector store could not answer a similarity query.
    Retrieval,
    /// Every generative provider failed or none is configured.
    Generation,
    /// SQLite open/query/transaction failures.
    Storage,
    /// Caller input or configuration was rejected.
    Invalid,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn class(&self) -> ErrorClass {
        let code = self.code.as_str();
        if code.starts_with("AI_EMBEDDING_") {
            ErrorClass::Embedding
        } else if code.starts_with("AI_RETRIEVAL_") {
            ErrorClass::Retrieval
        } else if code.starts_with("AI_GENERATION_") {
            ErrorClass::Generation
        } else if code.starts_with("DB_") {
            ErrorClass::Storage
        } else {
            ErrorClass::Invalid
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(d) = self.details.as_deref() {
            write!(f, " ({d})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}
