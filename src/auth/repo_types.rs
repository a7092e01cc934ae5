use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Account role. Stored as text; invalid values are rejected at row decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Premium,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Premium => "premium",
            Role::Admin => "admin",
        }
    }

    /// Premium content is visible to paying users and admins.
    pub fn has_premium_access(self) -> bool {
        matches!(self, Role::Premium | Role::Admin)
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(Role::User),
            "premium" => Ok(Role::Premium),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// User record in the database. Secret material is never serialized.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub phone_number: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_code: Option<String>,
    #[serde(skip_serializing)]
    pub reset_code_expires: Option<OffsetDateTime>,
    pub oauth_provider: Option<String>,
    pub oauth_provider_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn auth_provider(&self) -> &str {
        self.oauth_provider.as_deref().unwrap_or("local")
    }
}

/// Parameters for inserting a new user. Exactly one authentication path is
/// active at creation: OAuth accounts carry no password hash and no
/// verification token and are pre-verified; local accounts are the inverse.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: Option<String>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub verification_token: Option<String>,
    pub is_verified: bool,
    pub oauth_provider: Option<&'a str>,
    pub oauth_provider_id: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_text() {
        for role in [Role::User, Role::Premium, Role::Admin] {
            let parsed = Role::try_from(role.as_str().to_string()).unwrap();
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(Role::try_from("superuser".to_string()).is_err());
    }

    #[test]
    fn premium_access_is_limited_to_premium_and_admin() {
        assert!(!Role::User.has_premium_access());
        assert!(Role::Premium.has_premium_access());
        assert!(Role::Admin.has_premium_access());
    }

    #[test]
    fn secret_fields_are_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            phone_number: None,
            password_hash: Some("hash".into()),
            first_name: None,
            last_name: None,
            role: Role::User,
            is_verified: false,
            verification_token: Some("token".into()),
            reset_code: Some("123456".into()),
            reset_code_expires: None,
            oauth_provider: None,
            oauth_provider_id: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("hash"));
        assert!(!json.contains("token"));
        assert!(!json.contains("123456"));
    }
}
