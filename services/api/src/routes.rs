//! API service routes

use auth::authorizer::AuthContext;
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_middleware,
    models::{
        CleanupQuery, DevicePatch, DeviceStatus, LatestQuery, NewDevice, NewReading, RangeQuery,
        RecentQuery, StatsQuery, StatusUpdateRequest,
    },
    state::AppState,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/devices", get(list_devices).post(create_device))
        .route(
            "/api/devices/:id",
            get(get_device).put(update_device).delete(delete_device),
        )
        .route("/api/devices/:id/status", patch(update_device_status))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/data", post(ingest_reading))
        .route("/api/data/recent", get(recent_readings))
        .route("/api/data/latest", get(latest_reading))
        .route("/api/data/stats", get(reading_stats))
        .route("/api/data/range", get(readings_in_range))
        .route("/api/data/cleanup", delete(cleanup_readings))
        .merge(protected)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or(false);

    Json(json!({
        "status": "ok",
        "service": "api-service",
        "database": (if database { "connected" } else { "disconnected" }),
    }))
}

fn internal(context: &'static str) -> impl Fn(anyhow::Error) -> ApiError {
    move |e| {
        error!("{context}: {e}");
        ApiError::Internal(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor data (firmware-facing, unauthenticated as in the original system)
// ---------------------------------------------------------------------------

/// Ingest one sample from a device
pub async fn ingest_reading(
    State(state): State<AppState>,
    Json(payload): Json<NewReading>,
) -> Result<impl IntoResponse, ApiError> {
    let (device, temperature, humidity) = payload.validate().map_err(ApiError::BadRequest)?;

    let reading = state
        .reading_repository
        .insert(device, temperature, humidity)
        .await
        .map_err(internal("failed to store reading"))?;

    info!(
        "reading stored from {}: {:.1} C, {:.1} %",
        reading.device, reading.temperature, reading.humidity
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "id": reading.id,
            "recorded_at": reading.recorded_at,
        })),
    ))
}

/// Latest N samples
pub async fn recent_readings(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let readings = state
        .reading_repository
        .recent(limit)
        .await
        .map_err(internal("failed to fetch recent readings"))?;

    Ok(Json(readings))
}

/// Most recent sample, optionally filtered by device
pub async fn latest_reading(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let reading = state
        .reading_repository
        .latest(query.device.as_deref())
        .await
        .map_err(internal("failed to fetch latest reading"))?;

    Ok(Json(reading))
}

/// Aggregate statistics over a trailing window
pub async fn reading_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let hours = query.hours.unwrap_or(24).clamp(1, 24 * 365);

    let stats = state
        .reading_repository
        .stats(hours)
        .await
        .map_err(internal("failed to compute statistics"))?;

    Ok(Json(stats))
}

/// Samples between two instants
pub async fn readings_in_range(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(start), Some(end)) = (query.start, query.end) else {
        return Err(ApiError::BadRequest(
            "start and end parameters are required".into(),
        ));
    };

    let readings = state
        .reading_repository
        .range(start, end)
        .await
        .map_err(internal("failed to fetch readings in range"))?;

    Ok(Json(readings))
}

/// Delete samples past the retention window
pub async fn cleanup_readings(
    State(state): State<AppState>,
    Query(query): Query<CleanupQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let days = query.days.unwrap_or(30).max(1);

    let deleted = state
        .reading_repository
        .delete_older_than(days)
        .await
        .map_err(internal("failed to clean up readings"))?;

    info!("removed {} readings older than {} days", deleted, days);

    Ok(Json(json!({
        "success": true,
        "deleted": deleted,
    })))
}

// ---------------------------------------------------------------------------
// Device registry (ownership-scoped, authorizer-gated)
// ---------------------------------------------------------------------------

/// List the authenticated user's devices
pub async fn list_devices(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, ApiError> {
    let devices = state
        .device_repository
        .list_for_user(ctx.claims.sub)
        .await
        .map_err(internal("failed to list devices"))?;

    Ok(Json(devices))
}

/// Fetch one of the authenticated user's devices
pub async fn get_device(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let device = state
        .device_repository
        .find_for_user(id, ctx.claims.sub)
        .await
        .map_err(internal("failed to fetch device"))?
        .ok_or_else(|| ApiError::NotFound("device not found".into()))?;

    Ok(Json(device))
}

/// Register a new device
pub async fn create_device(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<NewDevice>,
) -> Result<impl IntoResponse, ApiError> {
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest("device name is required".into()))?;

    if let Some(external_id) = payload.external_id.as_deref() {
        let taken = state
            .device_repository
            .external_id_exists(external_id)
            .await
            .map_err(internal("failed to check external identifier"))?;
        if taken {
            return Err(ApiError::Conflict(
                "a device with that identifier already exists".into(),
            ));
        }
    }

    let device = state
        .device_repository
        .create(ctx.claims.sub, name, &payload)
        .await
        .map_err(|e| {
            if auth::error::is_unique_violation(&e) {
                ApiError::Conflict("a device with that identifier already exists".into())
            } else {
                error!("failed to create device: {}", e);
                ApiError::Internal(e)
            }
        })?;

    info!("device {} registered for user {}", device.id, ctx.claims.sub);

    Ok((StatusCode::CREATED, Json(device)))
}

/// Apply a field-wise update to a device
pub async fn update_device(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(patch): Json<DevicePatch>,
) -> Result<impl IntoResponse, ApiError> {
    if patch.is_empty() {
        return Err(ApiError::BadRequest("no fields to update".into()));
    }

    let updated = state
        .device_repository
        .update(id, ctx.claims.sub, &patch)
        .await
        .map_err(internal("failed to update device"))?;

    if !updated {
        return Err(ApiError::NotFound("device not found".into()));
    }

    Ok(Json(json!({
        "success": true,
        "message": "device updated",
    })))
}

/// Soft-delete a device
pub async fn delete_device(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .device_repository
        .soft_delete(id, ctx.claims.sub)
        .await
        .map_err(internal("failed to delete device"))?;

    if !deleted {
        return Err(ApiError::NotFound("device not found".into()));
    }

    Ok(Json(json!({
        "success": true,
        "message": "device deleted",
    })))
}

/// Update a device's connection status
pub async fn update_device_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status: DeviceStatus = payload
        .status
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid status".into()))?;

    let updated = state
        .device_repository
        .set_status(id, ctx.claims.sub, status)
        .await
        .map_err(internal("failed to update device status"))?;

    if !updated {
        return Err(ApiError::NotFound("device not found".into()));
    }

    Ok(Json(json!({
        "success": true,
        "message": "status updated",
    })))
}
