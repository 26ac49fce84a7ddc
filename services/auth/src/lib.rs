//! Authentication service
//!
//! Credential verification, token issuance, session lifecycle, and the
//! request authorizer. The authorizer is consumed both by this service's
//! own protected routes and by the API service, which gates the device
//! registry and sensor endpoints with the same guard sequence.

pub mod authorizer;
pub mod debug;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod validation;

use sqlx::PgPool;

use crate::{
    debug::DiagnosticsSink,
    jwt::JwtService,
    repositories::{SessionRepository, UserRepository},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_service: JwtService,
    pub user_repository: UserRepository,
    pub session_repository: SessionRepository,
    /// Present only when debug endpoints are enabled
    pub diagnostics: Option<DiagnosticsSink>,
}
