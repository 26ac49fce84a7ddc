//! Session repository for database operations
//!
//! Sessions are never physically deleted: logout flips the `active` flag
//! and expiry is a query-time check against `expires_at`.

use anyhow::Result;
use sqlx::PgPool;

use crate::models::{NewSession, Session};

/// Session repository
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Create a new session repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a session for a freshly issued token
    pub async fn create(&self, new_session: &NewSession) -> Result<Session> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, token, ip_address, user_agent, expires_at, active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING id, user_id, token, ip_address, user_agent, created_at, expires_at, active
            "#,
        )
        .bind(new_session.user_id)
        .bind(&new_session.token)
        .bind(&new_session.ip_address)
        .bind(&new_session.user_agent)
        .bind(new_session.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    /// Look up a session by exact token match
    pub async fn find_by_token(&self, token: &str) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, token, ip_address, user_agent, created_at, expires_at, active
            FROM sessions
            WHERE token = $1
            LIMIT 1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Mark the session holding this token as invalidated
    ///
    /// Returns false when no session row matched (double logout).
    pub async fn invalidate(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE sessions SET active = FALSE WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
