//! Middleware gating the protected authentication routes

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::error;

use crate::{
    AppState,
    authorizer::{self, Decision},
    error::AuthError,
};

/// Run the authorizer guard sequence and attach the resulting identity to
/// the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok());

    let decision = authorizer::authorize(&state.jwt_service, &state.session_repository, auth_header)
        .await
        .map_err(|e| {
            error!("session lookup failed during authorization: {}", e);
            AuthError::Store(e)
        })?;

    match decision {
        Decision::Authenticated(ctx) => {
            req.extensions_mut().insert(ctx);
            Ok(next.run(req).await)
        }
        Decision::Unauthenticated(reason) => Err(AuthError::Unauthenticated(reason)),
    }
}
