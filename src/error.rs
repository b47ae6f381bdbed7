// ===============================
// src/error.rs
// ===============================
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self { field, reason: reason.into() }
    }
}

/// Genuine failures. Admission rejections are not errors (see `admission::Decision`).
#[derive(Debug, Error)]
pub enum BotError {
    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),
    #[error("invalid entry price {0}")]
    InvalidPrice(f64),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} unavailable")]
    DependencyUnavailable(String),
    #[error("total capital must be greater than 0")]
    NoCapital,
}
