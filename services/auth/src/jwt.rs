//! JWT issuance and validation
//!
//! Tokens are signed with a shared HS256 secret and carry the identity
//! claims downstream handlers rely on. Token expiry is embedded in the
//! claims; the matching session row carries the same deadline and is
//! checked independently by the authorizer.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::models::{Role, User};

/// Development fallback secret, used when `JWT_SECRET` is unset. Insecure;
/// deployments must override it.
pub const DEV_SECRET: &str = "dev_jwt_secret_change_in_prod";

/// Default token lifetime: 8 hours
const DEFAULT_TOKEN_EXPIRY: u64 = 28_800;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared secret for signing and verifying tokens
    pub secret: String,
    /// Token lifetime in seconds
    pub token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: shared signing secret (falls back to [`DEV_SECRET`])
    /// - `JWT_TOKEN_EXPIRY`: token lifetime in seconds (default: 28800)
    pub fn from_env() -> Self {
        let secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("JWT_SECRET not set, falling back to the development secret");
                DEV_SECRET.to_string()
            }
        };

        let token_expiry = std::env::var("JWT_TOKEN_EXPIRY")
            .unwrap_or_else(|_| DEFAULT_TOKEN_EXPIRY.to_string())
            .parse()
            .unwrap_or(DEFAULT_TOKEN_EXPIRY);

        JwtConfig {
            secret,
            token_expiry,
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Username at issuance time
    pub username: String,
    /// Email at issuance time
    pub email: String,
    /// User role; absent on tokens minted during registration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// A freshly signed token together with its expiry instant, which the
/// session row records as well.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    /// Sign a token for a user
    ///
    /// `role` is None for registration tokens and Some for login tokens.
    pub fn issue_token(&self, user: &User, role: Option<Role>) -> Result<IssuedToken> {
        let now = Utc::now();
        let iat = now.timestamp() as u64;

        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role,
            iat,
            exp: iat + self.config.token_expiry,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        let expires_at = now + Duration::seconds(self.config.token_expiry as i64);

        Ok(IssuedToken { token, expires_at })
    }

    /// Validate a token's signature and embedded expiry, returning the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Get the configured token lifetime in seconds
    pub fn token_expiry(&self) -> u64 {
        self.config.token_expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn service() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "test_secret".to_string(),
            token_expiry: 3600,
        })
    }

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "unused".to_string(),
            display_name: None,
            role: Role::User,
            active: true,
            registered_at: Utc::now(),
            last_access: None,
        }
    }

    #[test]
    fn issued_token_round_trips_claims() {
        let svc = service();
        let user = sample_user();

        let issued = svc.issue_token(&user, Some(Role::User)).unwrap();
        let claims = svc.validate_token(&issued.token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.role, Some(Role::User));
        assert_eq!(claims.exp, claims.iat + 3600);
    }

    #[test]
    fn registration_token_carries_no_role() {
        let svc = service();
        let issued = svc.issue_token(&sample_user(), None).unwrap();

        let claims = svc.validate_token(&issued.token).unwrap();
        assert_eq!(claims.role, None);

        // the role key must be absent from the payload, not null
        let payload = issued.token.split('.').nth(1).unwrap();
        use base64::Engine as _;
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload)
            .unwrap();
        assert!(!String::from_utf8(decoded).unwrap().contains("role"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = service();
        let user = sample_user();

        // hand-craft claims whose expiry is well past the validation leeway
        let iat = (Utc::now().timestamp() - 7200) as u64;
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: None,
            iat,
            exp: iat + 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test_secret"),
        )
        .unwrap();

        assert!(svc.validate_token(&token).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issued = service().issue_token(&sample_user(), None).unwrap();

        let other = JwtService::new(JwtConfig {
            secret: "another_secret".to_string(),
            token_expiry: 3600,
        });
        assert!(other.validate_token(&issued.token).is_err());
    }

    #[test]
    #[serial]
    fn config_falls_back_to_dev_secret() {
        unsafe {
            std::env::remove_var("JWT_SECRET");
            std::env::remove_var("JWT_TOKEN_EXPIRY");
        }

        let config = JwtConfig::from_env();
        assert_eq!(config.secret, DEV_SECRET);
        assert_eq!(config.token_expiry, 28_800);
    }

    #[test]
    #[serial]
    fn config_reads_env_overrides() {
        unsafe {
            std::env::set_var("JWT_SECRET", "prod_secret");
            std::env::set_var("JWT_TOKEN_EXPIRY", "60");
        }

        let config = JwtConfig::from_env();
        assert_eq!(config.secret, "prod_secret");
        assert_eq!(config.token_expiry, 60);

        unsafe {
            std::env::remove_var("JWT_SECRET");
            std::env::remove_var("JWT_TOKEN_EXPIRY");
        }
    }
}
