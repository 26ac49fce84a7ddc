//! End-to-end authentication flow against a live PostgreSQL database
//!
//! These tests require `DATABASE_URL` and are ignored by default; run
//! with `cargo test -- --ignored`. The schema is created idempotently so
//! the tests are self-contained on an empty database.

use auth::{
    authorizer::{self, Decision, RejectReason},
    error::is_unique_violation,
    jwt::{JwtConfig, JwtService},
    models::{NewSession, NewUser},
    repositories::{SessionRepository, UserRepository},
};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    display_name TEXT,
    role TEXT NOT NULL DEFAULT 'user',
    active BOOLEAN NOT NULL DEFAULT TRUE,
    registered_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    last_access TIMESTAMPTZ
);
CREATE TABLE IF NOT EXISTS sessions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL REFERENCES users(id),
    token TEXT NOT NULL UNIQUE,
    ip_address TEXT,
    user_agent TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    expires_at TIMESTAMPTZ NOT NULL,
    active BOOLEAN NOT NULL DEFAULT TRUE
);
"#;

async fn connect_and_prepare() -> PgPool {
    let config = common::database::DatabaseConfig::from_env().expect("DATABASE_URL must be set");
    let pool = common::database::init_pool(&config)
        .await
        .expect("failed to connect to database");

    for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .expect("failed to prepare schema");
    }

    pool
}

fn jwt_service() -> JwtService {
    JwtService::new(JwtConfig {
        secret: "integration_test_secret".to_string(),
        token_expiry: 3600,
    })
}

fn unique_user(tag: &str) -> NewUser {
    let suffix = Uuid::new_v4().simple().to_string();
    NewUser {
        username: format!("{tag}_{}", &suffix[..12]),
        email: format!("{tag}_{suffix}@example.com"),
        password: "Secret123!".to_string(),
        display_name: Some("Integration Test".to_string()),
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn register_login_logout_flow() {
    let pool = connect_and_prepare().await;
    let users = UserRepository::new(pool.clone());
    let sessions = SessionRepository::new(pool);
    let jwt = jwt_service();

    // register
    let new_user = unique_user("flow");
    let user = users.create(&new_user).await.unwrap();
    let register_token = jwt.issue_token(&user, None).unwrap();
    sessions
        .create(&NewSession {
            user_id: user.id,
            token: register_token.token.clone(),
            ip_address: None,
            user_agent: None,
            expires_at: register_token.expires_at,
        })
        .await
        .unwrap();

    // login with the same credentials
    let found = users
        .find_by_username(&new_user.username)
        .await
        .unwrap()
        .expect("registered user must be found");
    assert!(found.active);
    assert!(
        users
            .verify_password(&found, &new_user.password)
            .await
            .unwrap()
    );
    assert!(
        !users
            .verify_password(&found, "wrong password")
            .await
            .unwrap()
    );

    let login_token = jwt.issue_token(&found, Some(found.role)).unwrap();
    assert_ne!(login_token.token, register_token.token);
    sessions
        .create(&NewSession {
            user_id: found.id,
            token: login_token.token.clone(),
            ip_address: Some("127.0.0.1".to_string()),
            user_agent: Some("integration-test".to_string()),
            expires_at: login_token.expires_at,
        })
        .await
        .unwrap();

    // the authorizer accepts the fresh token and yields the same user id
    let header = format!("Bearer {}", login_token.token);
    match authorizer::authorize(&jwt, &sessions, Some(&header))
        .await
        .unwrap()
    {
        Decision::Authenticated(ctx) => {
            assert_eq!(ctx.claims.sub, user.id);
            assert!(ctx.session.active);
        }
        Decision::Unauthenticated(reason) => panic!("expected access, got {:?}", reason),
    }

    // logout invalidates the session while the token itself stays valid
    assert!(sessions.invalidate(&login_token.token).await.unwrap());
    match authorizer::authorize(&jwt, &sessions, Some(&header))
        .await
        .unwrap()
    {
        Decision::Unauthenticated(reason) => {
            assert_eq!(reason, RejectReason::SessionInvalidated)
        }
        Decision::Authenticated(_) => panic!("revoked session must not authorize"),
    }

    // the row still matches by token, so a repeated invalidate reports it
    assert!(sessions.invalidate(&login_token.token).await.unwrap());
    assert!(!sessions.invalidate("no-such-token").await.unwrap());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn duplicate_registration_conflicts_both_ways() {
    let pool = connect_and_prepare().await;
    let users = UserRepository::new(pool);

    let first = unique_user("dup");
    users.create(&first).await.unwrap();

    // same username, different email
    let mut same_username = unique_user("dup");
    same_username.username = first.username.clone();
    let err = users.create(&same_username).await.unwrap_err();
    assert!(is_unique_violation(&err));

    // same email, different username
    let mut same_email = unique_user("dup");
    same_email.email = first.email.clone();
    let err = users.create(&same_email).await.unwrap_err();
    assert!(is_unique_violation(&err));
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn token_without_session_is_rejected() {
    let pool = connect_and_prepare().await;
    let users = UserRepository::new(pool.clone());
    let sessions = SessionRepository::new(pool);
    let jwt = jwt_service();

    let user = users.create(&unique_user("nosession")).await.unwrap();
    let issued = jwt.issue_token(&user, None).unwrap();

    // cryptographically valid, but no session row was ever written
    let header = format!("Bearer {}", issued.token);
    match authorizer::authorize(&jwt, &sessions, Some(&header))
        .await
        .unwrap()
    {
        Decision::Unauthenticated(reason) => assert_eq!(reason, RejectReason::SessionNotFound),
        Decision::Authenticated(_) => panic!("token without session must not authorize"),
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn stale_session_row_is_rejected_while_still_active() {
    let pool = connect_and_prepare().await;
    let users = UserRepository::new(pool.clone());
    let sessions = SessionRepository::new(pool);
    let jwt = jwt_service();

    let user = users.create(&unique_user("stale")).await.unwrap();
    let issued = jwt.issue_token(&user, None).unwrap();

    // active session whose row expiry is already in the past; the token
    // itself is still within its embedded lifetime
    sessions
        .create(&NewSession {
            user_id: user.id,
            token: issued.token.clone(),
            ip_address: None,
            user_agent: None,
            expires_at: Utc::now() - Duration::minutes(5),
        })
        .await
        .unwrap();

    let header = format!("Bearer {}", issued.token);
    match authorizer::authorize(&jwt, &sessions, Some(&header))
        .await
        .unwrap()
    {
        Decision::Unauthenticated(reason) => assert_eq!(reason, RejectReason::SessionExpired),
        Decision::Authenticated(_) => panic!("stale session must not authorize"),
    }
}
