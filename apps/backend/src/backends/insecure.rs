//! Accept-everything backend for local development.
//!
//! Any username/password pair authenticates and yields a token with no
//! extension claims. Never deploy this.

use std::time::SystemTime;

use async_trait::async_trait;
use tracing::warn;

use crate::auth::claims::{Claims, ExtraClaims};
use crate::backends::Authenticator;
use crate::errors::domain::DomainError;

pub struct InsecureAuth;

impl InsecureAuth {
    pub fn new() -> Self {
        warn!("insecure backend selected: every credential pair will authenticate");
        Self
    }
}

impl Default for InsecureAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Authenticator for InsecureAuth {
    async fn authenticate(
        &self,
        username: &str,
        _password: &str,
        expires_at: SystemTime,
    ) -> Result<Claims, DomainError> {
        Ok(Claims::new(
            username,
            ExtraClaims::default(),
            SystemTime::now(),
            expires_at,
        ))
    }
}
