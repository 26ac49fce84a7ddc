//! Authentication middleware for the API service
//!
//! Thin adapter over the auth crate's authorizer: one signature check and
//! one session lookup per request, then the identity rides the request
//! extensions into the handlers.

use auth::authorizer::{self, Decision};
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::error;

use crate::{error::ApiError, state::AppState};

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok());

    let decision = authorizer::authorize(&state.jwt_service, &state.session_repository, auth_header)
        .await
        .map_err(|e| {
            error!("session lookup failed during authorization: {}", e);
            ApiError::Internal(e)
        })?;

    match decision {
        Decision::Authenticated(ctx) => {
            req.extensions_mut().insert(ctx);
            Ok(next.run(req).await)
        }
        Decision::Unauthenticated(reason) => Err(ApiError::Unauthenticated(reason)),
    }
}
