//! Flat-file backend: a JSON object mapping user id to stored record.
//!
//! The whole file is loaded at startup and kept in memory behind a lock;
//! every write rewrites the file. Suited to small installations and tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::info;

use crate::auth::claims::Claims;
use crate::backends::{verify_stored, Authenticator, StoredUser, UserData, UserStore};
use crate::error::AppError;
use crate::errors::domain::DomainError;

pub struct FileStore {
    path: PathBuf,
    users: RwLock<HashMap<String, StoredUser>>,
}

impl FileStore {
    /// Load the user file, or start empty if it does not exist yet.
    /// A present-but-malformed file is a startup error.
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let users = if path.exists() {
            let raw = std::fs::read(path)
                .map_err(|e| AppError::config(format!("failed to read {}: {e}", path.display())))?;
            serde_json::from_slice(&raw)
                .map_err(|e| AppError::config(format!("malformed user file {}: {e}", path.display())))?
        } else {
            HashMap::new()
        };

        info!(path = %path.display(), "loaded user file");

        Ok(Self {
            path: path.to_path_buf(),
            users: RwLock::new(users),
        })
    }

    fn persist(&self, users: &HashMap<String, StoredUser>) -> Result<(), DomainError> {
        let raw = serde_json::to_vec_pretty(users)
            .map_err(|e| DomainError::corrupt(format!("failed to serialize user file: {e}")))?;
        std::fs::write(&self.path, raw).map_err(|e| {
            DomainError::unavailable(format!("failed to write {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl Authenticator for FileStore {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
        expires_at: SystemTime,
    ) -> Result<Claims, DomainError> {
        let stored = self.users.read().get(username).cloned();
        match stored {
            Some(user) => verify_stored(username, &user, password, expires_at),
            None => Err(DomainError::InvalidAuthentication),
        }
    }
}

#[async_trait]
impl UserStore for FileStore {
    async fn fetch(&self, id: &str) -> Result<UserData, DomainError> {
        self.users
            .read()
            .get(id)
            .cloned()
            .map(UserData::from)
            .ok_or_else(|| DomainError::not_found(id))
    }

    async fn put(&self, id: &str, user: &UserData) -> Result<(), DomainError> {
        let mut users = self.users.write();
        users.insert(id.to_string(), StoredUser::from(user.clone()));
        self.persist(&users)
    }

    async fn remove(&self, id: &str) -> Result<(), DomainError> {
        let mut users = self.users.write();
        if users.remove(id).is_none() {
            return Err(DomainError::not_found(id));
        }
        self.persist(&users)
    }
}
