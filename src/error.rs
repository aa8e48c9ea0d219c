//! Error taxonomy shared across all services.
//!
//! Validation, not-found, and upload-constraint errors are always surfaced
//! to the caller unchanged. Oracle errors are surfaced for single
//! operations and captured per-type during a comprehensive sweep
//! (see [`crate::analysis::run_comprehensive`]).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Bad caller input: empty name, too few documents, weight sum off.
    #[error("{0}")]
    Validation(String),

    /// A referenced id does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Upload exceeds the configured size limit.
    #[error("file too large: {size} bytes exceeds limit of {limit} bytes")]
    SizeLimit { size: usize, limit: usize },

    /// Upload extension is not in the supported set.
    #[error("file type not supported: {0}")]
    UnsupportedType(String),

    /// The external AI call failed, timed out, or returned a malformed envelope.
    #[error("oracle error: {0}")]
    Oracle(String),

    /// The content extractor could not turn the stored bytes into oracle input.
    #[error("extraction failed: {0}")]
    Extract(String),

    #[error(transparent)]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn oracle(msg: impl Into<String>) -> Self {
        AppError::Oracle(msg.into())
    }

    /// Machine-readable error code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::SizeLimit { .. } => "size_limit",
            AppError::UnsupportedType(_) => "unsupported_type",
            AppError::Oracle(_) => "oracle",
            AppError::Extract(_) => "extract",
            AppError::Db(_) | AppError::Json(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
