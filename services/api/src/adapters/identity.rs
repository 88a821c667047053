//! services/api/src/adapters/identity.rs
//!
//! Concrete implementation of the `IdentityProvider` port: argon2 password
//! hashing over an `accounts` table, with opaque auth sessions. Stands in
//! for the hosted identity service; the core only ever sees
//! `(uid, email, display_name)`.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use attendance_core::ports::{AuthUser, IdentityProvider, PortError, PortResult};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::error;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgIdentityAdapter {
    pool: PgPool,
}

impl PgIdentityAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct AccountRecord {
    id: Uuid,
    email: String,
    display_name: String,
}
impl AccountRecord {
    fn to_domain(self) -> AuthUser {
        AuthUser {
            uid: self.id,
            email: self.email,
            display_name: self.display_name,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    display_name: String,
    password_hash: String,
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[async_trait]
impl IdentityProvider for PgIdentityAdapter {
    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> PortResult<AuthUser> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                error!("Failed to hash password: {:?}", e);
                PortError::Unexpected("failed to hash password".to_string())
            })?
            .to_string();

        let record = sqlx::query_as::<_, AccountRecord>(
            "INSERT INTO accounts (email, display_name, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, email, display_name",
        )
        .bind(email)
        .bind(display_name)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                PortError::Unexpected("an account with this email already exists".to_string())
            } else {
                PortError::Unexpected(e.to_string())
            }
        })?;
        Ok(record.to_domain())
    }

    async fn authenticate(&self, email: &str, password: &str) -> PortResult<AuthUser> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, display_name, password_hash FROM accounts WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::Unauthorized,
            _ => PortError::Unexpected(e.to_string()),
        })?;

        let parsed_hash = PasswordHash::new(&record.password_hash).map_err(|e| {
            error!("Failed to parse stored password hash: {:?}", e);
            PortError::Unexpected("stored credentials are unreadable".to_string())
        })?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| PortError::Unauthorized)?;

        Ok(AuthUser {
            uid: record.id,
            email: record.email,
            display_name: record.display_name,
        })
    }

    async fn open_auth_session(
        &self,
        uid: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<String> {
        let auth_session_id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO auth_sessions (id, account_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&auth_session_id)
            .bind(uid)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(auth_session_id)
    }

    async fn resolve_auth_session(&self, auth_session_id: &str) -> PortResult<AuthUser> {
        let record = sqlx::query_as::<_, AccountRecord>(
            "SELECT a.id, a.email, a.display_name \
             FROM auth_sessions s JOIN accounts a ON a.id = s.account_id \
             WHERE s.id = $1 AND s.expires_at > now()",
        )
        .bind(auth_session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::Unauthorized,
            _ => PortError::Unexpected(e.to_string()),
        })?;
        Ok(record.to_domain())
    }

    async fn close_auth_session(&self, auth_session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(auth_session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
