//! Error handling for the authd backend.

pub mod domain;

pub use domain::DomainError;
