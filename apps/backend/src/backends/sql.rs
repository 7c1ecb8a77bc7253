//! Relational backend over Postgres.
//!
//! Groups are stored comma-joined in a single text column for compatibility
//! with records provisioned by earlier tooling.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::auth::claims::{Claims, ExtraClaims};
use crate::backends::{verify_stored, Authenticator, StoredUser, UserData, UserStore};
use crate::error::AppError;
use crate::errors::domain::DomainError;

pub struct SqlStore {
    pool: PgPool,
    table: String,
    timeout: Duration,
}

impl SqlStore {
    pub async fn connect(url: &str, table: &str, timeout: Duration) -> Result<Self, AppError> {
        // The table name is interpolated into queries, so restrict it to a
        // plain identifier.
        if table.is_empty()
            || !table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AppError::config(format!(
                "invalid user table name: {table:?}"
            )));
        }

        let pool = PgPoolOptions::new()
            .acquire_timeout(timeout)
            .connect(url)
            .await
            .map_err(|e| AppError::config(format!("failed to connect to the database: {e}")))?;

        info!("connected to the database");

        Ok(Self {
            pool,
            table: table.to_string(),
            timeout,
        })
    }

    /// Create the user table when it does not exist yet.
    pub async fn ensure_table(&self) -> Result<(), AppError> {
        let query = format!(
            r#"CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL,
                display_name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                email_verified BOOLEAN NOT NULL DEFAULT FALSE,
                "groups" TEXT NOT NULL DEFAULT ''
            )"#,
            self.table
        );
        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::config(format!("failed to create user table: {e}")))?;
        Ok(())
    }

    async fn fetch_stored(&self, id: &str) -> Result<Option<StoredUser>, DomainError> {
        let query = format!(
            r#"SELECT password_hash, display_name, email, email_verified, "groups"
               FROM {} WHERE id = $1"#,
            self.table
        );

        let row = match tokio::time::timeout(
            self.timeout,
            sqlx::query(&query).bind(id).fetch_optional(&self.pool),
        )
        .await
        {
            Err(_) => return Err(DomainError::unavailable("database query timed out")),
            Ok(Err(e)) => return Err(map_sqlx_error(e)),
            Ok(Ok(row)) => row,
        };

        row.map(|row| {
            let password_hash: String = row
                .try_get("password_hash")
                .map_err(|e| DomainError::corrupt(format!("bad password_hash column: {e}")))?;
            let display_name: String = row
                .try_get("display_name")
                .map_err(|e| DomainError::corrupt(format!("bad display_name column: {e}")))?;
            let email: String = row
                .try_get("email")
                .map_err(|e| DomainError::corrupt(format!("bad email column: {e}")))?;
            let email_verified: bool = row
                .try_get("email_verified")
                .map_err(|e| DomainError::corrupt(format!("bad email_verified column: {e}")))?;
            let groups: String = row
                .try_get("groups")
                .map_err(|e| DomainError::corrupt(format!("bad groups column: {e}")))?;

            Ok(StoredUser {
                password_hash,
                extra: ExtraClaims {
                    display_name: non_empty(display_name),
                    email: non_empty(email),
                    email_verified,
                    groups: split_groups(&groups),
                },
            })
        })
        .transpose()
    }
}

#[async_trait]
impl Authenticator for SqlStore {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
        expires_at: SystemTime,
    ) -> Result<Claims, DomainError> {
        match self.fetch_stored(username).await? {
            None => Err(DomainError::InvalidAuthentication),
            Some(stored) => verify_stored(username, &stored, password, expires_at),
        }
    }
}

#[async_trait]
impl UserStore for SqlStore {
    async fn fetch(&self, id: &str) -> Result<UserData, DomainError> {
        match self.fetch_stored(id).await? {
            None => Err(DomainError::not_found(id)),
            Some(stored) => Ok(UserData::from(stored)),
        }
    }

    async fn put(&self, id: &str, user: &UserData) -> Result<(), DomainError> {
        let query = format!(
            r#"INSERT INTO {} (id, password_hash, display_name, email, email_verified, "groups")
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (id) DO UPDATE SET
                   password_hash = EXCLUDED.password_hash,
                   display_name = EXCLUDED.display_name,
                   email = EXCLUDED.email,
                   email_verified = EXCLUDED.email_verified,
                   "groups" = EXCLUDED."groups""#,
            self.table
        );

        let claims = &user.claims;
        let result = tokio::time::timeout(
            self.timeout,
            sqlx::query(&query)
                .bind(id)
                .bind(&user.password_hash)
                .bind(claims.display_name.as_deref().unwrap_or_default())
                .bind(claims.email.as_deref().unwrap_or_default())
                .bind(claims.email_verified)
                .bind(join_groups(&claims.groups))
                .execute(&self.pool),
        )
        .await;

        match result {
            Err(_) => Err(DomainError::unavailable("database write timed out")),
            Ok(Err(e)) => Err(map_sqlx_error(e)),
            Ok(Ok(_)) => Ok(()),
        }
    }

    async fn remove(&self, id: &str) -> Result<(), DomainError> {
        let query = format!("DELETE FROM {} WHERE id = $1", self.table);
        let result = tokio::time::timeout(
            self.timeout,
            sqlx::query(&query).bind(id).execute(&self.pool),
        )
        .await;

        match result {
            Err(_) => Err(DomainError::unavailable("database delete timed out")),
            Ok(Err(e)) => Err(map_sqlx_error(e)),
            Ok(Ok(done)) if done.rows_affected() == 0 => Err(DomainError::not_found(id)),
            Ok(Ok(_)) => Ok(()),
        }
    }
}

fn map_sqlx_error(e: sqlx::Error) -> DomainError {
    match e {
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
            DomainError::corrupt(format!("unexpected row shape: {e}"))
        }
        _ => DomainError::unavailable(format!("database error: {e}")),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn join_groups(groups: &[String]) -> String {
    groups.join(",")
}

fn split_groups(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{join_groups, split_groups};

    #[test]
    fn groups_round_trip_through_the_comma_join() {
        let groups = vec!["admin".to_string(), "self-service".to_string()];
        assert_eq!(split_groups(&join_groups(&groups)), groups);
    }

    #[test]
    fn empty_groups_round_trip_to_empty() {
        assert_eq!(join_groups(&[]), "");
        assert!(split_groups("").is_empty());
    }
}
