//! Key-value backend: one JSON document per user under `prefix/<id>`.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use crate::auth::claims::Claims;
use crate::backends::{verify_stored, Authenticator, StoredUser, UserData, UserStore};
use crate::error::AppError;
use crate::errors::domain::DomainError;

pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
    timeout: Duration,
}

impl RedisStore {
    pub async fn connect(url: &str, prefix: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = redis::Client::open(url)
            .map_err(|e| AppError::config(format!("invalid redis URL: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::config(format!("failed to connect to redis: {e}")))?;

        info!("connected to redis");

        Ok(Self {
            conn,
            prefix: prefix.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn key(&self, id: &str) -> String {
        format!("{}/{}", self.prefix, id)
    }

    async fn get_raw(&self, id: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self.conn.clone();
        let key = self.key(id);
        match tokio::time::timeout(self.timeout, conn.get::<_, Option<String>>(&key)).await {
            Err(_) => Err(DomainError::unavailable(format!(
                "redis GET {key} timed out"
            ))),
            Ok(Err(e)) => Err(DomainError::unavailable(format!("redis GET failed: {e}"))),
            Ok(Ok(value)) => Ok(value),
        }
    }

    fn parse(&self, id: &str, raw: &str) -> Result<StoredUser, DomainError> {
        serde_json::from_str(raw)
            .map_err(|e| DomainError::corrupt(format!("malformed record for {id}: {e}")))
    }
}

#[async_trait]
impl Authenticator for RedisStore {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
        expires_at: SystemTime,
    ) -> Result<Claims, DomainError> {
        match self.get_raw(username).await? {
            None => Err(DomainError::InvalidAuthentication),
            Some(raw) => {
                let stored = self.parse(username, &raw)?;
                verify_stored(username, &stored, password, expires_at)
            }
        }
    }
}

#[async_trait]
impl UserStore for RedisStore {
    async fn fetch(&self, id: &str) -> Result<UserData, DomainError> {
        match self.get_raw(id).await? {
            None => Err(DomainError::not_found(id)),
            Some(raw) => Ok(UserData::from(self.parse(id, &raw)?)),
        }
    }

    async fn put(&self, id: &str, user: &UserData) -> Result<(), DomainError> {
        let raw = serde_json::to_string(&StoredUser::from(user.clone()))
            .map_err(|e| DomainError::corrupt(format!("failed to serialize record: {e}")))?;
        let mut conn = self.conn.clone();
        let key = self.key(id);
        match tokio::time::timeout(self.timeout, conn.set::<_, _, ()>(&key, raw)).await {
            Err(_) => Err(DomainError::unavailable(format!(
                "redis SET {key} timed out"
            ))),
            Ok(Err(e)) => Err(DomainError::unavailable(format!("redis SET failed: {e}"))),
            Ok(Ok(())) => Ok(()),
        }
    }

    async fn remove(&self, id: &str) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();
        let key = self.key(id);
        match tokio::time::timeout(self.timeout, conn.del::<_, i64>(&key)).await {
            Err(_) => Err(DomainError::unavailable(format!(
                "redis DEL {key} timed out"
            ))),
            Ok(Err(e)) => Err(DomainError::unavailable(format!("redis DEL failed: {e}"))),
            Ok(Ok(0)) => Err(DomainError::not_found(id)),
            Ok(Ok(_)) => Ok(()),
        }
    }
}
