use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{Role, User};

/// Request body for registration. `provider` present means the OAuth path.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub provider: Option<String>,
    pub provider_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyTokenRequest {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyAccountRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct InitiateResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct InitiateResetSmsRequest {
    pub phone_number: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub reset_code: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// An empty string clears the stored phone number.
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Public part of the user returned to clients.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub auth_provider: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone_number: user.phone_number.clone(),
            role: user.role,
            is_verified: user.is_verified,
            auth_provider: user.auth_provider().to_string(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Response for register, login and refresh-user-data.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: PublicUser,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct GenericMessage {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub message: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct TokenIdentity {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct VerifyTokenResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<TokenIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_reports_local_provider_when_no_oauth() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            phone_number: None,
            password_hash: Some("hash".into()),
            first_name: Some("Ada".into()),
            last_name: None,
            role: Role::User,
            is_verified: false,
            verification_token: None,
            reset_code: None,
            reset_code_expires: None,
            oauth_provider: None,
            oauth_provider_id: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let public = PublicUser::from(&user);
        assert_eq!(public.auth_provider, "local");

        let json = serde_json::to_string(&public).unwrap();
        assert!(json.contains(r#""role":"user""#));
        assert!(!json.contains("hash"));
    }

    #[test]
    fn verify_token_response_omits_empty_fields() {
        let res = VerifyTokenResponse {
            valid: false,
            user: None,
            message: Some("invalid or expired token".into()),
        };
        let json = serde_json::to_string(&res).unwrap();
        assert!(!json.contains("user"));
        assert!(json.contains(r#""valid":false"#));
    }
}
