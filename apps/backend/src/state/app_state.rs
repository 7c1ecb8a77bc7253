use std::sync::Arc;

use crate::backends::{Authenticator, UserStore};
use crate::rbac::RbacState;

use super::security_config::SecurityConfig;

/// Shared state for the token issuance server.
#[derive(Clone)]
pub struct AppState {
    /// Signing material and token lifetime
    pub security: SecurityConfig,
    /// The configured identity backend
    pub authenticator: Arc<dyn Authenticator>,
}

impl AppState {
    pub fn new(security: SecurityConfig, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            security,
            authenticator,
        }
    }
}

/// Shared state for the administrative server.
pub struct AdminState {
    /// Policy, verification key and escape hatches
    pub rbac: RbacState,
    /// The configured record store
    pub store: Arc<dyn UserStore>,
}

impl AdminState {
    pub fn new(rbac: RbacState, store: Arc<dyn UserStore>) -> Self {
        Self { rbac, store }
    }
}
