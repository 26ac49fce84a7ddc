//! Request authorization
//!
//! Every protected request runs the same ordered guard sequence: token
//! present, signature and embedded expiry valid, then a session-row
//! cross-check (found, not invalidated, not past its own expiry). The
//! outcome is a tagged [`Decision`] so each rejection reason stays
//! independently testable. Exactly one signature check and one session
//! lookup happen per request; there is no caching layer in between.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::{
    jwt::{Claims, JwtService},
    models::Session,
    repositories::SessionRepository,
};

/// Why a request was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No Authorization header on the request
    MissingToken,
    /// Signature or embedded expiry failed verification
    InvalidToken,
    /// No session row matches the token
    SessionNotFound,
    /// The session was explicitly revoked by logout
    SessionInvalidated,
    /// The session row's own expiry has passed
    SessionExpired,
}

impl RejectReason {
    /// Client-facing message carried in the 401 body
    pub fn message(&self) -> &'static str {
        match self {
            RejectReason::MissingToken => "token not provided",
            RejectReason::InvalidToken => "invalid or expired token",
            RejectReason::SessionNotFound => "session not found",
            RejectReason::SessionInvalidated => "session invalidated",
            RejectReason::SessionExpired => "session expired",
        }
    }
}

/// Identity attached to the request once every guard has passed
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: Claims,
    pub session: Session,
}

/// Outcome of the guard sequence
#[derive(Debug, Clone)]
pub enum Decision {
    Authenticated(AuthContext),
    Unauthenticated(RejectReason),
}

/// Strip the Bearer scheme from an Authorization header value; a bare
/// token is accepted as-is.
pub fn token_from_header(header: &str) -> &str {
    header.strip_prefix("Bearer ").unwrap_or(header)
}

/// Session-row half of the guard sequence, pure over the clock
fn check_session(session: Option<Session>, now: DateTime<Utc>) -> Result<Session, RejectReason> {
    let session = session.ok_or(RejectReason::SessionNotFound)?;

    if !session.active {
        return Err(RejectReason::SessionInvalidated);
    }

    if session.expires_at <= now {
        return Err(RejectReason::SessionExpired);
    }

    Ok(session)
}

/// Run the full guard sequence for one request
///
/// Storage failures during the session lookup propagate as errors; every
/// other outcome is a [`Decision`].
pub async fn authorize(
    jwt_service: &JwtService,
    sessions: &SessionRepository,
    auth_header: Option<&str>,
) -> Result<Decision> {
    let Some(header) = auth_header else {
        return Ok(Decision::Unauthenticated(RejectReason::MissingToken));
    };
    let token = token_from_header(header);

    let claims = match jwt_service.validate_token(token) {
        Ok(claims) => claims,
        Err(_) => return Ok(Decision::Unauthenticated(RejectReason::InvalidToken)),
    };

    let row = sessions.find_by_token(token).await?;
    match check_session(row, Utc::now()) {
        Ok(session) => Ok(Decision::Authenticated(AuthContext { claims, session })),
        Err(reason) => Ok(Decision::Unauthenticated(reason)),
    }
}
