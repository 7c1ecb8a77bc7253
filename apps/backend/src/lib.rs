#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod auth;
pub mod backends;
pub mod config;
pub mod error;
pub mod errors;
pub mod extractors;
pub mod middleware;
pub mod rbac;
pub mod routes;
pub mod state;
pub mod telemetry;

// Re-exports for public API
pub use auth::claims::{Claims, ExtraClaims};
pub use auth::token::{mint_token, verify_token};
pub use backends::{Authenticator, UserData, UserStore};
pub use error::AppError;
pub use errors::domain::DomainError;
pub use middleware::cors::cors_middleware;
pub use middleware::role_guard::RoleGuard;
pub use rbac::{Identity, Policy, RbacState};
pub use state::app_state::{AdminState, AppState};
pub use state::security_config::SecurityConfig;
