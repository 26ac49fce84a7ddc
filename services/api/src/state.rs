//! Application state shared across handlers

use auth::{jwt::JwtService, repositories::SessionRepository};
use sqlx::PgPool;

use crate::repositories::{DeviceRepository, ReadingRepository};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_service: JwtService,
    pub session_repository: SessionRepository,
    pub device_repository: DeviceRepository,
    pub reading_repository: ReadingRepository,
}
