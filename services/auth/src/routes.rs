//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use tracing::{error, info, warn};

use crate::{
    AppState,
    authorizer::AuthContext,
    debug::LoginAttempt,
    error::{AuthError, is_unique_violation},
    middleware::auth_middleware,
    models::{NewSession, NewUser, UserProfile, UserSummary},
    validation,
};

/// Request for user registration
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub display_name: Option<String>,
}

/// Request for user login; either username or email identifies the user
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Response for register and login
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserSummary,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login));

    if state.diagnostics.is_some() {
        router = router.route("/auth/_debug/last_login", get(last_login));
    }

    router.merge(protected).with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or(false);

    Json(json!({
        "status": "ok",
        "service": "auth-service",
        "database": (if database { "connected" } else { "disconnected" }),
    }))
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn nonblank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// User registration endpoint
pub async fn register(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let username = nonblank(payload.username.as_ref())
        .ok_or_else(|| AuthError::Validation("username, email and password are required".into()))?;
    let email = nonblank(payload.email.as_ref())
        .ok_or_else(|| AuthError::Validation("username, email and password are required".into()))?;
    let password = payload
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AuthError::Validation("username, email and password are required".into()))?;

    validation::validate_username(username).map_err(AuthError::Validation)?;
    validation::validate_email(email).map_err(AuthError::Validation)?;
    validation::validate_password(password).map_err(AuthError::Validation)?;

    let taken = state
        .user_repository
        .username_or_email_exists(username, email)
        .await
        .map_err(|e| {
            error!("failed to check for existing user: {}", e);
            AuthError::Store(e)
        })?;
    if taken {
        return Err(AuthError::Conflict("username or email already registered".into()));
    }

    let new_user = NewUser {
        username: username.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        display_name: payload.display_name.clone(),
    };

    // the unique constraint is the source of truth when two registrations
    // race past the existence check
    let user = state.user_repository.create(&new_user).await.map_err(|e| {
        if is_unique_violation(&e) {
            AuthError::Conflict("username or email already registered".into())
        } else {
            error!("failed to create user: {}", e);
            AuthError::Store(e)
        }
    })?;

    info!("registered user {} ({})", user.username, user.id);

    let issued = state.jwt_service.issue_token(&user, None).map_err(|e| {
        error!("failed to sign token: {}", e);
        AuthError::Store(e)
    })?;

    // best-effort: a session-insert failure is logged but does not fail
    // the registration
    let new_session = NewSession {
        user_id: user.id,
        token: issued.token.clone(),
        ip_address: Some(addr.ip().to_string()),
        user_agent: user_agent(&headers),
        expires_at: issued.expires_at,
    };
    if let Err(e) = state.session_repository.create(&new_session).await {
        warn!("could not persist session for new user {}: {}", user.id, e);
    }

    let response = AuthResponse {
        success: true,
        token: issued.token,
        user: UserSummary {
            id: user.id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            role: None,
        },
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let username = nonblank(payload.username.as_ref());
    let email = nonblank(payload.email.as_ref());

    if let Some(sink) = &state.diagnostics {
        sink.record(LoginAttempt {
            username: username.map(str::to_string),
            email: email.map(str::to_string),
            password_present: payload.password.as_deref().is_some_and(|p| !p.is_empty()),
            ip: Some(addr.ip().to_string()),
            user_agent: user_agent(&headers),
            at: chrono::Utc::now(),
        })
        .await;
    }

    let password = payload
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AuthError::Validation("username/email and password are required".into()))?;
    if username.is_none() && email.is_none() {
        return Err(AuthError::Validation(
            "username/email and password are required".into(),
        ));
    }

    // explicit lookup branch: an email field wins over username, never a
    // fallback chain between the two columns
    let user = match email {
        Some(email) => state.user_repository.find_by_email(email).await,
        None => {
            state
                .user_repository
                .find_by_username(username.unwrap_or_default())
                .await
        }
    }
    .map_err(|e| {
        error!("failed to look up user for login: {}", e);
        AuthError::Store(e)
    })?;

    let Some(user) = user else {
        return Err(AuthError::InvalidCredentials);
    };

    let password_ok = state
        .user_repository
        .verify_password(&user, password)
        .await
        .map_err(|e| {
            error!("failed to verify password for user {}: {}", user.id, e);
            AuthError::Store(e)
        })?;
    if !password_ok {
        warn!("password mismatch for user {}", user.id);
        return Err(AuthError::InvalidCredentials);
    }

    let issued = state
        .jwt_service
        .issue_token(&user, Some(user.role))
        .map_err(|e| {
            error!("failed to sign token: {}", e);
            AuthError::Store(e)
        })?;

    // best-effort bookkeeping: neither a session-insert failure nor a
    // last-access failure turns a correct login into an error
    let new_session = NewSession {
        user_id: user.id,
        token: issued.token.clone(),
        ip_address: Some(addr.ip().to_string()),
        user_agent: user_agent(&headers),
        expires_at: issued.expires_at,
    };
    if let Err(e) = state.session_repository.create(&new_session).await {
        warn!("could not persist session for user {}: {}", user.id, e);
    }
    if let Err(e) = state.user_repository.touch_last_access(user.id).await {
        warn!("could not update last access for user {}: {}", user.id, e);
    }

    info!("user {} logged in", user.id);

    let response = AuthResponse {
        success: true,
        token: issued.token,
        user: UserSummary {
            id: user.id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            role: Some(user.role),
        },
    };

    Ok(Json(response))
}

/// Logout endpoint; requires a fully authorized request
pub async fn logout(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, AuthError> {
    let revoked = state
        .session_repository
        .invalidate(&ctx.session.token)
        .await
        .map_err(|e| {
            error!("failed to invalidate session {}: {}", ctx.session.id, e);
            AuthError::Store(e)
        })?;

    if !revoked {
        return Err(AuthError::NotFound("session not found".into()));
    }

    info!("session {} closed for user {}", ctx.session.id, ctx.claims.sub);

    Ok(Json(json!({
        "success": true,
        "message": "session closed",
    })))
}

/// Current-user endpoint
pub async fn me(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, AuthError> {
    let user = state
        .user_repository
        .find_by_id(ctx.claims.sub)
        .await
        .map_err(|e| {
            error!("failed to load user {}: {}", ctx.claims.sub, e);
            AuthError::Store(e)
        })?
        .ok_or_else(|| AuthError::NotFound("user not found".into()))?;

    Ok(Json(json!({ "user": UserProfile::from(user) })))
}

/// Last recorded login attempt; mounted only when diagnostics are enabled
pub async fn last_login(State(state): State<AppState>) -> impl IntoResponse {
    let attempt = match &state.diagnostics {
        Some(sink) => sink.last_attempt().await,
        None => None,
    };

    Json(json!({ "last_login_attempt": attempt }))
}
