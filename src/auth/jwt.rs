use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::repo_types::{Role, User};
use crate::config::JwtConfig;
use crate::state::AppState;

/// Verification failures are distinguished so callers can return precise
/// client guidance.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

/// Signing payload carried by both access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// One signing context: its own key pair and lifetime. Access and refresh
/// are two independent contexts rather than one keyed by a string, so a
/// token can never be accepted by the wrong verifier.
#[derive(Clone)]
struct SigningContext {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningContext {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    fn sign(&self, user: &User) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.unix_timestamp(),
            exp: (now + self.ttl).unix_timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        Ok(token)
    }

    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[derive(Clone)]
pub struct JwtKeys {
    access: SigningContext,
    refresh: SigningContext,
}

impl JwtKeys {
    pub fn from_config(config: &JwtConfig) -> Self {
        Self {
            access: SigningContext::new(
                &config.access_secret,
                Duration::minutes(config.access_ttl_minutes),
            ),
            refresh: SigningContext::new(
                &config.refresh_secret,
                Duration::days(config.refresh_ttl_days),
            ),
        }
    }

    pub fn sign_access(&self, user: &User) -> anyhow::Result<String> {
        let token = self.access.sign(user)?;
        debug!(user_id = %user.id, "access token signed");
        Ok(token)
    }

    pub fn sign_refresh(&self, user: &User) -> anyhow::Result<String> {
        let token = self.refresh.sign(user)?;
        debug!(user_id = %user.id, "refresh token signed");
        Ok(token)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.access.verify(token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.refresh.verify(token)
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.jwt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn make_user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            phone_number: None,
            password_hash: None,
            first_name: None,
            last_name: None,
            role,
            is_verified: true,
            verification_token: None,
            reset_code: None,
            reset_code_expires: None,
            oauth_provider: None,
            oauth_provider_id: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    fn make_keys() -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            access_secret: "test-access-secret".into(),
            refresh_secret: "test-refresh-secret".into(),
            access_ttl_minutes: 5,
            refresh_ttl_days: 7,
        })
    }

    #[test]
    fn sign_and_verify_access_token() {
        let keys = make_keys();
        let user = make_user(Role::Premium);
        let token = keys.sign_access(&user).expect("sign access");
        let claims = keys.verify_access(&token).expect("verify access");
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.role, Role::Premium);
    }

    #[test]
    fn sign_and_verify_refresh_token() {
        let keys = make_keys();
        let user = make_user(Role::User);
        let token = keys.sign_refresh(&user).expect("sign refresh");
        let claims = keys.verify_refresh(&token).expect("verify refresh");
        assert_eq!(claims.sub, user.id);
    }

    #[test]
    fn access_token_is_rejected_by_refresh_context() {
        let keys = make_keys();
        let token = keys.sign_access(&make_user(Role::User)).expect("sign access");
        assert_eq!(keys.verify_refresh(&token).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn refresh_token_is_rejected_by_access_context() {
        let keys = make_keys();
        let token = keys.sign_refresh(&make_user(Role::User)).expect("sign refresh");
        assert_eq!(keys.verify_access(&token).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        // jsonwebtoken applies 60s of leeway, so push expiry well past it.
        let keys = JwtKeys::from_config(&JwtConfig {
            access_secret: "test-access-secret".into(),
            refresh_secret: "test-refresh-secret".into(),
            access_ttl_minutes: -5,
            refresh_ttl_days: 7,
        });
        let token = keys.sign_access(&make_user(Role::User)).expect("sign access");
        assert_eq!(keys.verify_access(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn garbage_token_is_invalid() {
        let keys = make_keys();
        assert_eq!(
            keys.verify_access("not-a-jwt").unwrap_err(),
            TokenError::Invalid
        );
    }
}
