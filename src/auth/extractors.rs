use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::auth::jwt::{Claims, JwtKeys, TokenError};
use crate::auth::repo_types::Role;
use crate::error::AppError;

/// Extract a token from the request: bearer header, then cookie, then
/// query parameter, in that precedence order.
pub(crate) fn token_from_parts(parts: &Parts) -> Option<String> {
    if let Some(auth) = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
        {
            return Some(token.trim().to_string());
        }
    }

    if let Some(cookies) = parts
        .headers
        .get(axum::http::header::COOKIE)
        .and_then(|v| v.to_str().ok())
    {
        for pair in cookies.split(';') {
            if let Some(value) = pair.trim().strip_prefix("token=") {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }

    if let Some(query) = parts.uri.query() {
        for pair in query.split('&') {
            if let Some(value) = pair.strip_prefix("token=") {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }

    None
}

fn verify(keys: &JwtKeys, token: &str) -> Result<Claims, AppError> {
    keys.verify_access(token).map_err(|e| match e {
        TokenError::Expired => {
            warn!("expired access token");
            AppError::Unauthorized("session expired, please log in again".into())
        }
        TokenError::Invalid => {
            warn!("invalid access token");
            AppError::Unauthorized("invalid authentication token".into())
        }
    })
}

/// Authenticated caller.
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts)
            .ok_or_else(|| AppError::Unauthorized("authentication required".into()))?;
        let keys = JwtKeys::from_ref(state);
        Ok(AuthUser(verify(&keys, &token)?))
    }
}

/// Authenticated caller with the admin role.
#[derive(Debug)]
pub struct AdminUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        if claims.role != Role::Admin {
            warn!(user_id = %claims.sub, role = claims.role.as_str(), "admin access denied");
            return Err(AppError::Forbidden("insufficient permissions".into()));
        }
        Ok(AdminUser(claims))
    }
}

/// Optional caller for the public read surface: a missing or invalid token
/// yields an anonymous caller rather than a rejection.
pub struct MaybeUser(pub Option<Claims>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let claims =
            token_from_parts(parts).and_then(|token| keys.verify_access(&token).ok());
        Ok(MaybeUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_for(uri: &str, headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn bearer_header_wins_over_cookie_and_query() {
        let parts = parts_for(
            "/profile?token=from-query",
            &[
                ("authorization", "Bearer from-header"),
                ("cookie", "token=from-cookie"),
            ],
        );
        assert_eq!(token_from_parts(&parts).as_deref(), Some("from-header"));
    }

    #[test]
    fn cookie_wins_over_query() {
        let parts = parts_for(
            "/profile?token=from-query",
            &[("cookie", "session=abc; token=from-cookie")],
        );
        assert_eq!(token_from_parts(&parts).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn query_is_the_last_resort() {
        let parts = parts_for("/profile?other=1&token=from-query", &[]);
        assert_eq!(token_from_parts(&parts).as_deref(), Some("from-query"));
    }

    #[test]
    fn no_token_yields_none() {
        let parts = parts_for("/profile", &[("cookie", "session=abc")]);
        assert_eq!(token_from_parts(&parts), None);
    }

    fn make_user(role: Role) -> crate::auth::repo_types::User {
        use time::OffsetDateTime;
        crate::auth::repo_types::User {
            id: uuid::Uuid::new_v4(),
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

    #[tokio::test]
    async fn auth_user_accepts_a_signed_access_token() {
        let state = crate::state::AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let user = make_user(Role::User);
        let token = keys.sign_access(&user).expect("sign access");

        let header = format!("Bearer {token}");
        let mut parts = parts_for("/profile", &[("authorization", header.as_str())]);
        let AuthUser(claims) = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .expect("extractor should accept the token");
        assert_eq!(claims.sub, user.id);
    }

    #[tokio::test]
    async fn admin_user_rejects_non_admin_callers() {
        let state = crate::state::AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign_access(&make_user(Role::Premium)).expect("sign access");

        let header = format!("Bearer {token}");
        let mut parts = parts_for("/admin/stats", &[("authorization", header.as_str())]);
        let err = AdminUser::from_request_parts(&mut parts, &state)
            .await
            .expect_err("premium caller is not an admin");
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn maybe_user_is_anonymous_on_garbage_tokens() {
        let state = crate::state::AppState::fake();
        let mut parts = parts_for("/trips/abc", &[("authorization", "Bearer not-a-jwt")]);
        let MaybeUser(claims) = MaybeUser::from_request_parts(&mut parts, &state)
            .await
            .expect("maybe-user never rejects");
        assert!(claims.is_none());
    }
}
