//! Document-store backend over MongoDB.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::claims::{Claims, ExtraClaims};
use crate::backends::{verify_stored, Authenticator, StoredUser, UserData, UserStore};
use crate::error::AppError;
use crate::errors::domain::DomainError;

/// Document shape: the record id doubles as the document `_id`.
#[derive(Debug, Serialize, Deserialize, Clone)]
struct MongoUser {
    #[serde(rename = "_id")]
    id: String,
    password_hash: String,
    #[serde(flatten)]
    extra: ExtraClaims,
}

impl MongoUser {
    fn stored(&self) -> StoredUser {
        StoredUser {
            password_hash: self.password_hash.clone(),
            extra: self.extra.clone(),
        }
    }
}

pub struct MongoStore {
    collection: Collection<MongoUser>,
    /// Field the authenticator looks users up by; defaults to `_id`.
    field: String,
    timeout: Duration,
}

impl MongoStore {
    pub async fn connect(
        uri: &str,
        database: &str,
        collection: &str,
        field: &str,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|e| AppError::config(format!("invalid mongo URI: {e}")))?;
        let client = Client::with_options(options)
            .map_err(|e| AppError::config(format!("failed to create mongo client: {e}")))?;

        let db = client.database(database);
        tokio::time::timeout(timeout, db.run_command(doc! { "ping": 1 }))
            .await
            .map_err(|_| AppError::config("mongo ping timed out".to_string()))?
            .map_err(|e| AppError::config(format!("failed to connect to mongo: {e}")))?;

        info!("connected to mongo");

        Ok(Self {
            collection: db.collection::<MongoUser>(collection),
            field: field.to_string(),
            timeout,
        })
    }

    async fn find_by(&self, filter: Document) -> Result<Option<MongoUser>, DomainError> {
        match tokio::time::timeout(self.timeout, self.collection.find_one(filter)).await {
            Err(_) => Err(DomainError::unavailable("mongo query timed out")),
            Ok(Err(e)) => Err(map_mongo_error(e)),
            Ok(Ok(user)) => Ok(user),
        }
    }
}

#[async_trait]
impl Authenticator for MongoStore {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
        expires_at: SystemTime,
    ) -> Result<Claims, DomainError> {
        let mut filter = Document::new();
        filter.insert(self.field.clone(), username);

        match self.find_by(filter).await? {
            None => Err(DomainError::InvalidAuthentication),
            Some(user) => verify_stored(username, &user.stored(), password, expires_at),
        }
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn fetch(&self, id: &str) -> Result<UserData, DomainError> {
        match self.find_by(doc! { "_id": id }).await? {
            None => Err(DomainError::not_found(id)),
            Some(user) => Ok(UserData::from(user.stored())),
        }
    }

    async fn put(&self, id: &str, user: &UserData) -> Result<(), DomainError> {
        let replacement = MongoUser {
            id: id.to_string(),
            password_hash: user.password_hash.clone(),
            extra: user.claims.clone(),
        };
        let result = tokio::time::timeout(
            self.timeout,
            self.collection
                .replace_one(doc! { "_id": id }, replacement)
                .upsert(true),
        )
        .await;

        match result {
            Err(_) => Err(DomainError::unavailable("mongo write timed out")),
            Ok(Err(e)) => Err(map_mongo_error(e)),
            Ok(Ok(_)) => Ok(()),
        }
    }

    async fn remove(&self, id: &str) -> Result<(), DomainError> {
        let result =
            tokio::time::timeout(self.timeout, self.collection.delete_one(doc! { "_id": id }))
                .await;

        match result {
            Err(_) => Err(DomainError::unavailable("mongo delete timed out")),
            Ok(Err(e)) => Err(map_mongo_error(e)),
            Ok(Ok(done)) if done.deleted_count == 0 => Err(DomainError::not_found(id)),
            Ok(Ok(_)) => Ok(()),
        }
    }
}

fn map_mongo_error(e: mongodb::error::Error) -> DomainError {
    match *e.kind {
        mongodb::error::ErrorKind::BsonDeserialization(_) => {
            DomainError::corrupt(format!("malformed stored document: {e}"))
        }
        _ => DomainError::unavailable(format!("mongo error: {e}")),
    }
}
