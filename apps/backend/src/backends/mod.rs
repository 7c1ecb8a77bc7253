//! Identity store backends.
//!
//! Every store is reached through two narrow capabilities: [`Authenticator`]
//! for credential checks at token issuance, and [`UserStore`] for the
//! administrative CRUD protocol. Backend-native failures are translated into
//! the [`DomainError`] taxonomy at this boundary.

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::auth::claims::{Claims, ExtraClaims};
use crate::config::BackendConfig;
use crate::error::AppError;
use crate::errors::domain::DomainError;

pub mod file;
pub mod insecure;
pub mod ldap_bind;
pub mod mongo;
pub mod redis;
pub mod sql;

/// A user record as persisted by the stores that keep records locally.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct StoredUser {
    pub password_hash: String,
    #[serde(flatten)]
    pub extra: ExtraClaims,
}

/// The administrative API shape of a user record.
///
/// The wire field is named `password` for compatibility but always carries
/// the hex-encoded digest, never a plaintext password.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct UserData {
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(default)]
    pub claims: ExtraClaims,
}

impl From<StoredUser> for UserData {
    fn from(user: StoredUser) -> Self {
        Self {
            password_hash: user.password_hash,
            claims: user.extra,
        }
    }
}

impl From<UserData> for StoredUser {
    fn from(data: UserData) -> Self {
        Self {
            password_hash: data.password_hash,
            extra: data.claims,
        }
    }
}

/// Hex-encoded SHA-256 digest of a plaintext password.
///
/// Deterministic and unsalted: this matches the digests already present in
/// deployed stores. See README for why this is kept as-is.
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Compare a presented password against a stored record and build claims.
///
/// Digest mismatch yields the same error as a missing record so the two
/// cases stay indistinguishable to the caller.
pub(crate) fn verify_stored(
    username: &str,
    stored: &StoredUser,
    password: &str,
    expires_at: SystemTime,
) -> Result<Claims, DomainError> {
    if stored.password_hash != password_digest(password) {
        return Err(DomainError::InvalidAuthentication);
    }
    Ok(Claims::new(
        username,
        stored.extra.clone(),
        SystemTime::now(),
        expires_at,
    ))
}

/// Credential verification against the configured identity store.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Verify `password` for `username` and, on success, return claims with
    /// `sub = username`, `iat = now` and `exp = expires_at`.
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
        expires_at: SystemTime,
    ) -> Result<Claims, DomainError>;
}

/// User-record CRUD over any backend.
///
/// Implementations provide the three storage primitives; the protocol
/// itself (check-then-act create, read-modify-write update, fetch-confirmed
/// delete) is defined once here. The two round trips are not transactional:
/// concurrent writers on the same id can race. See README.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetch the record for `id`, or `DomainError::NotFound`.
    async fn fetch(&self, id: &str) -> Result<UserData, DomainError>;

    /// Write the full record for `id`, creating or replacing it.
    async fn put(&self, id: &str, user: &UserData) -> Result<(), DomainError>;

    /// Remove the record for `id`.
    async fn remove(&self, id: &str) -> Result<(), DomainError>;

    async fn get_user(&self, id: &str) -> Result<UserData, DomainError> {
        self.fetch(id).await
    }

    async fn create_user(&self, id: &str, user: &UserData) -> Result<(), DomainError> {
        match self.fetch(id).await {
            Ok(_) => Err(DomainError::already_exists(id)),
            Err(DomainError::NotFound(_)) => self.put(id, user).await,
            Err(e) => Err(e),
        }
    }

    async fn update_user(
        &self,
        id: &str,
        mutate: Box<dyn for<'a> FnOnce(&'a mut UserData) -> Result<(), DomainError> + Send>,
    ) -> Result<(), DomainError> {
        let mut user = self.fetch(id).await?;
        mutate(&mut user)?;
        self.put(id, &user).await
    }

    async fn delete_user(&self, id: &str) -> Result<(), DomainError> {
        self.fetch(id).await?;
        self.remove(id).await
    }
}

/// Build the authenticator selected by the configuration.
///
/// Selection happens exactly once at startup; per-request calls go through
/// the trait object, never through re-dispatch on the backend name.
pub async fn authenticator_from_config(
    config: &BackendConfig,
) -> Result<Arc<dyn Authenticator>, AppError> {
    match config {
        BackendConfig::Insecure => Ok(Arc::new(insecure::InsecureAuth::new())),
        BackendConfig::File { path } => Ok(Arc::new(file::FileStore::open(path)?)),
        BackendConfig::LdapBind {
            server,
            user_template,
        } => Ok(Arc::new(ldap_bind::LdapBindAuth::new(server, user_template)?)),
        BackendConfig::Redis {
            url,
            prefix,
            timeout,
        } => Ok(Arc::new(
            redis::RedisStore::connect(url, prefix, *timeout).await?,
        )),
        BackendConfig::Sql {
            url,
            table,
            timeout,
        } => Ok(Arc::new(
            sql::SqlStore::connect(url, table, *timeout).await?,
        )),
        BackendConfig::Mongo {
            uri,
            database,
            collection,
            field,
            timeout,
        } => Ok(Arc::new(
            mongo::MongoStore::connect(uri, database, collection, field, *timeout).await?,
        )),
    }
}

/// Build the user store selected by the configuration.
pub async fn user_store_from_config(
    config: &BackendConfig,
) -> Result<Arc<dyn UserStore>, AppError> {
    match config {
        BackendConfig::Insecure => Err(AppError::config(
            "the insecure backend keeps no records to manage",
        )),
        BackendConfig::LdapBind { .. } => Err(AppError::config(
            "directory records are managed by the directory's own tooling, not this API",
        )),
        BackendConfig::File { path } => Ok(Arc::new(file::FileStore::open(path)?)),
        BackendConfig::Redis {
            url,
            prefix,
            timeout,
        } => Ok(Arc::new(
            redis::RedisStore::connect(url, prefix, *timeout).await?,
        )),
        BackendConfig::Sql {
            url,
            table,
            timeout,
        } => {
            let store = sql::SqlStore::connect(url, table, *timeout).await?;
            store.ensure_table().await?;
            Ok(Arc::new(store))
        }
        BackendConfig::Mongo {
            uri,
            database,
            collection,
            field,
            timeout,
        } => Ok(Arc::new(
            mongo::MongoStore::connect(uri, database, collection, field, *timeout).await?,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic_sha256_hex() {
        // Known SHA-256 of "secret"; stored records in existing deployments
        // carry exactly this form.
        assert_eq!(
            password_digest("secret"),
            "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b"
        );
        assert_eq!(password_digest("secret"), password_digest("secret"));
    }

    #[test]
    fn user_data_wire_field_is_named_password() {
        let data = UserData {
            password_hash: "abc".to_string(),
            claims: ExtraClaims::default(),
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["password"], "abc");
    }

    #[test]
    fn stored_user_round_trips_through_user_data() {
        let stored = StoredUser {
            password_hash: password_digest("pw"),
            extra: ExtraClaims {
                display_name: Some("Bob".to_string()),
                email: Some("bob@example.org".to_string()),
                email_verified: false,
                groups: vec!["viewer".to_string()],
            },
        };
        let data: UserData = stored.clone().into();
        let back: StoredUser = data.into();
        assert_eq!(back, stored);
    }
}
