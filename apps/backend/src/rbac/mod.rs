//! Role-based access control over the administrative API.

pub mod policy;

use jsonwebtoken::{Algorithm, DecodingKey};
use serde::{Deserialize, Serialize};

use crate::auth::token::verify_token;
use crate::error::AppError;
use crate::state::security_config::verification_key;

pub use policy::{PathParams, Policy, Rule};

/// The caller's resolved identity, attached to the request once the
/// decision procedure allows it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Identity {
    pub sub: String,
    pub groups: Vec<String>,
}

impl Identity {
    fn admin() -> Self {
        Self {
            sub: "admin".to_string(),
            groups: vec!["admin".to_string()],
        }
    }

    /// Identity used when security is disabled; carries the admin role so
    /// every policy rule passes.
    fn anonymous() -> Self {
        Self {
            sub: "anonymous".to_string(),
            groups: vec!["admin".to_string()],
        }
    }
}

/// Immutable decision state: policy, trusted verification key, and the two
/// escape hatches. Built once at startup, shared read-only by every request.
pub struct RbacState {
    policy: Policy,
    algorithm: Algorithm,
    decoding_key: DecodingKey,
    admin_token: Option<String>,
    disable_security: bool,
}

impl RbacState {
    pub fn new(
        policy: Policy,
        signing_method: &str,
        public_key_pem: &[u8],
        admin_token: Option<String>,
        disable_security: bool,
    ) -> Result<Self, AppError> {
        let (algorithm, decoding_key) = verification_key(signing_method, public_key_pem)?;
        Ok(Self {
            policy,
            algorithm,
            decoding_key,
            admin_token,
            disable_security,
        })
    }

    /// Decide whether `verb path` may proceed with the presented bearer.
    ///
    /// Every call re-verifies the token signature; nothing is cached across
    /// requests.
    pub fn authorize(
        &self,
        verb: &str,
        path: &str,
        bearer: Option<&str>,
    ) -> Result<Identity, AppError> {
        if self.disable_security {
            return Ok(Identity::anonymous());
        }

        if let (Some(admin_token), Some(bearer)) = (self.admin_token.as_deref(), bearer) {
            if bearer == admin_token {
                return Ok(Identity::admin());
            }
        }

        let token = bearer.ok_or(AppError::UnauthorizedMissingBearer)?;
        let claims = verify_token(token, self.algorithm, &self.decoding_key)?;

        let (rule, params) = self
            .policy
            .matching_rule(verb, path)
            .ok_or(AppError::Forbidden)?;

        let allowed = rule.roles.iter().any(|role| {
            if role == "self" {
                params.values().any(|v| v == &claims.sub)
            } else {
                claims.extra.groups.iter().any(|g| g == role)
            }
        });

        if !allowed {
            return Err(AppError::Forbidden);
        }

        Ok(Identity {
            sub: claims.sub,
            groups: claims.extra.groups,
        })
    }
}
