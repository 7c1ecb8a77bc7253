//! Domain-level error type used across backends and services.
//!
//! This error type is HTTP-agnostic and backend-agnostic. Store-specific
//! failures are translated into this taxonomy at the adapter boundary and
//! never leak native error types upward. Handlers convert to
//! `crate::error::AppError` via the provided `From` implementation.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Central domain error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Bad credentials. Deliberately does not distinguish "unknown user"
    /// from "wrong password" so callers cannot enumerate usernames.
    InvalidAuthentication,
    /// Missing record in domain terms.
    NotFound(String),
    /// A record with this id already exists.
    AlreadyExists(String),
    /// Backend timeout or connection failure; retryable.
    Unavailable(String),
    /// Malformed stored record; not retryable, needs operator intervention.
    Corrupt(String),
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DomainError::InvalidAuthentication => write!(f, "invalid authentication"),
            DomainError::NotFound(d) => write!(f, "not found: {d}"),
            DomainError::AlreadyExists(d) => write!(f, "already exists: {d}"),
            DomainError::Unavailable(d) => write!(f, "backend unavailable: {d}"),
            DomainError::Corrupt(d) => write!(f, "backend record corrupt: {d}"),
        }
    }
}

impl Error for DomainError {}

impl DomainError {
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound(detail.into())
    }
    pub fn already_exists(detail: impl Into<String>) -> Self {
        Self::AlreadyExists(detail.into())
    }
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::Unavailable(detail.into())
    }
    pub fn corrupt(detail: impl Into<String>) -> Self {
        Self::Corrupt(detail.into())
    }
}
