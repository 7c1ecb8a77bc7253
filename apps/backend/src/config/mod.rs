//! Process configuration, read once from the environment at startup.
//!
//! Environment variables must be set by the runtime environment (container
//! env files, systemd unit, or sourced manually for local dev). Anything
//! missing or malformed is a startup error: misconfiguration is an
//! operational concern, never a per-request one.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 5;
const DEFAULT_TOKEN_DURATION_SECS: u64 = 3600;

/// The configured identity store and its connection parameters.
///
/// Exactly one backend is selected per process via `AUTH_BACKEND`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Insecure,
    File {
        path: PathBuf,
    },
    LdapBind {
        server: String,
        user_template: String,
    },
    Redis {
        url: String,
        prefix: String,
        timeout: Duration,
    },
    Sql {
        url: String,
        table: String,
        timeout: Duration,
    },
    Mongo {
        uri: String,
        database: String,
        collection: String,
        field: String,
        timeout: Duration,
    },
}

impl BackendConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let timeout = backend_timeout()?;

        match env::var("AUTH_BACKEND").unwrap_or_default().as_str() {
            "" | "insecure" => Ok(Self::Insecure),
            "file" => Ok(Self::File {
                path: PathBuf::from(require_env(
                    "AUTH_FILE",
                    "JSON file containing users when using the file backend",
                )?),
            }),
            "ldap-bind" => Ok(Self::LdapBind {
                server: require_env("LDAP_SERVER", "LDAP server URL (ldap:// or ldaps://)")?,
                user_template: require_env(
                    "LDAP_USER",
                    "LDAP bind DN template (%s is substituted with the username)",
                )?,
            }),
            "redis" => Ok(Self::Redis {
                url: require_env("REDIS_URL", "redis connection URL")?,
                prefix: require_env("REDIS_PREFIX", "key prefix for user records")?,
                timeout,
            }),
            "sql" => Ok(Self::Sql {
                url: require_env("DATABASE_URL", "postgres connection URL")?,
                table: require_env("SQL_USER_TABLE", "table holding user records")?,
                timeout,
            }),
            "mongo" => Ok(Self::Mongo {
                uri: require_env("MONGO_URI", "mongodb connection URI")?,
                database: require_env("MONGO_DATABASE", "mongo database")?,
                collection: require_env("MONGO_COLLECTION", "mongo collection")?,
                field: env::var("MONGO_FIELD").unwrap_or_else(|_| "_id".to_string()),
                timeout,
            }),
            other => Err(AppError::config(format!("unknown auth backend: {other}"))),
        }
    }
}

/// Configuration for the token issuance server (`authd`).
pub struct AuthServerConfig {
    pub bind: String,
    pub signing_method: String,
    pub signing_key_pem: Vec<u8>,
    pub public_key_pem: Vec<u8>,
    pub token_duration: Duration,
    pub backend: BackendConfig,
}

impl AuthServerConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            bind: env::var("AUTHD_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            signing_method: require_env(
                "JWT_SIGNING_METHOD",
                "signature method to use (must match the key, e.g. RS256)",
            )?,
            signing_key_pem: read_pem(&require_env(
                "JWT_SIGNING_KEY_FILE",
                "PEM file with the private key used to sign tokens",
            )?)?,
            public_key_pem: read_pem(&require_env(
                "JWT_PUBLIC_KEY_FILE",
                "PEM file with the public key used to verify tokens",
            )?)?,
            token_duration: duration_env("TOKEN_DURATION_SECS", DEFAULT_TOKEN_DURATION_SECS)?,
            backend: BackendConfig::from_env()?,
        })
    }
}

/// Configuration for the administrative server (`authd-admin`).
pub struct AdminServerConfig {
    pub bind: String,
    pub signing_method: String,
    pub public_key_pem: Vec<u8>,
    pub rbac_file: PathBuf,
    /// Static bearer that bypasses per-route role checks (bootstrap only).
    pub admin_token: Option<String>,
    /// Bypass all checks. Local development only.
    pub disable_security: bool,
    pub backend: BackendConfig,
}

impl AdminServerConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let disable_security = env::var("DISABLE_SECURITY")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let admin_token = if disable_security {
            env::var("ADMIN_TOKEN").ok()
        } else {
            Some(require_env(
                "ADMIN_TOKEN",
                "static admin bearer (required unless DISABLE_SECURITY=true)",
            )?)
        };

        Ok(Self {
            bind: env::var("ADMIN_BIND").unwrap_or_else(|_| "0.0.0.0:8181".to_string()),
            signing_method: require_env(
                "JWT_SIGNING_METHOD",
                "signature method the issuer uses (e.g. RS256)",
            )?,
            public_key_pem: read_pem(&require_env(
                "JWT_PUBLIC_KEY_FILE",
                "PEM file with the public key used to verify tokens",
            )?)?,
            rbac_file: PathBuf::from(
                env::var("RBAC_FILE").unwrap_or_else(|_| "/etc/authd/rbac.json".to_string()),
            ),
            admin_token,
            disable_security,
            backend: BackendConfig::from_env()?,
        })
    }
}

fn require_env(name: &str, description: &str) -> Result<String, AppError> {
    match env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::config(format!(
            "env {name} is required: {description}"
        ))),
    }
}

fn read_pem(path: &str) -> Result<Vec<u8>, AppError> {
    std::fs::read(path).map_err(|e| AppError::config(format!("failed to read {path}: {e}")))
}

fn duration_env(name: &str, default_secs: u64) -> Result<Duration, AppError> {
    match env::var(name) {
        Err(_) => Ok(Duration::from_secs(default_secs)),
        Ok(v) => v
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| AppError::config(format!("invalid {name}: {v:?} (expected seconds)"))),
    }
}

fn backend_timeout() -> Result<Duration, AppError> {
    duration_env("BACKEND_TIMEOUT_SECS", DEFAULT_BACKEND_TIMEOUT_SECS)
}
