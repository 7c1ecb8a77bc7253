//! Directory backend: a per-call bind attempt is the password check.
//!
//! The directory service owns credential verification; no digest is stored
//! or compared locally, and tokens carry standard claims only.

use std::time::SystemTime;

use async_trait::async_trait;
use ldap3::LdapConnAsync;
use tracing::{info, warn};

use crate::auth::claims::{Claims, ExtraClaims};
use crate::backends::Authenticator;
use crate::error::AppError;
use crate::errors::domain::DomainError;

pub struct LdapBindAuth {
    url: String,
    /// Bind DN template; `%s` is substituted with the username.
    user_template: String,
}

impl LdapBindAuth {
    pub fn new(server: &str, user_template: &str) -> Result<Self, AppError> {
        if !server.starts_with("ldap://") && !server.starts_with("ldaps://") {
            return Err(AppError::config(format!(
                "bad LDAP server URL {server:?}: expected ldap:// or ldaps://"
            )));
        }
        if !user_template.contains("%s") {
            return Err(AppError::config(format!(
                "LDAP user template {user_template:?} has no %s placeholder"
            )));
        }
        Ok(Self {
            url: server.to_string(),
            user_template: user_template.to_string(),
        })
    }
}

#[async_trait]
impl Authenticator for LdapBindAuth {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
        expires_at: SystemTime,
    ) -> Result<Claims, DomainError> {
        // An empty password would turn the bind into an RFC 4513
        // unauthenticated bind, which many directories report as success.
        if password.is_empty() {
            return Err(DomainError::InvalidAuthentication);
        }

        let (conn, mut ldap) = LdapConnAsync::new(&self.url).await.map_err(|e| {
            warn!("LDAP dial error: {e}");
            DomainError::unavailable(format!("LDAP dial failed: {e}"))
        })?;
        ldap3::drive!(conn);

        let dn = self.user_template.replacen("%s", username, 1);
        let bound = match ldap.simple_bind(&dn, password).await {
            Ok(result) => result.success().is_ok(),
            Err(e) => {
                warn!("LDAP bind error: {e}");
                false
            }
        };
        let _ = ldap.unbind().await;

        if !bound {
            info!(%dn, "LDAP bind refused");
            return Err(DomainError::InvalidAuthentication);
        }

        Ok(Claims::new(
            username,
            ExtraClaims::default(),
            SystemTime::now(),
            expires_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::LdapBindAuth;
    use crate::backends::Authenticator;
    use crate::errors::domain::DomainError;

    #[test]
    fn rejects_bad_server_urls_and_templates() {
        assert!(LdapBindAuth::new("http://x", "uid=%s,dc=example,dc=org").is_err());
        assert!(LdapBindAuth::new("ldap://x", "uid=alice,dc=example,dc=org").is_err());
        assert!(LdapBindAuth::new("ldaps://x:636", "uid=%s,dc=example,dc=org").is_ok());
    }

    #[tokio::test]
    async fn empty_password_is_refused_without_contacting_the_directory() {
        // An unreachable server: if the empty-password check did not come
        // first, this would surface as Unavailable instead.
        let auth = LdapBindAuth::new("ldap://127.0.0.1:1", "uid=%s,dc=example,dc=org").unwrap();
        let expires_at = SystemTime::now() + Duration::from_secs(60);

        let result = auth.authenticate("bob", "", expires_at).await;
        assert_eq!(result.unwrap_err(), DomainError::InvalidAuthentication);
    }
}
