//! Login diagnostics for development
//!
//! A small injectable sink that remembers the most recent sanitized login
//! attempt. It is constructed only when `AUTH_DEBUG_ENDPOINTS` is set, so
//! production deployments carry neither the state nor the endpoint that
//! reads it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Sanitized snapshot of a login attempt. The password itself is never
/// recorded, only whether one was present.
#[derive(Debug, Clone, Serialize)]
pub struct LoginAttempt {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_present: bool,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub at: DateTime<Utc>,
}

/// Shared sink holding the last login attempt
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsSink {
    last_attempt: Arc<Mutex<Option<LoginAttempt>>>,
}

impl DiagnosticsSink {
    /// Create a new, empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether debug endpoints were requested via `AUTH_DEBUG_ENDPOINTS`
    pub fn enabled_from_env() -> bool {
        std::env::var("AUTH_DEBUG_ENDPOINTS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Record an attempt, replacing the previous one
    pub async fn record(&self, attempt: LoginAttempt) {
        *self.last_attempt.lock().await = Some(attempt);
    }

    /// Read back the most recent attempt
    pub async fn last_attempt(&self) -> Option<LoginAttempt> {
        self.last_attempt.lock().await.clone()
    }
}
