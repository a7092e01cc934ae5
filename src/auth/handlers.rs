use axum::{
    extract::{FromRef, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use rand::{Rng, RngCore};
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AccountResponse, AuthResponse, ChangePasswordRequest, GenericMessage,
            InitiateResetRequest, InitiateResetSmsRequest, LoginRequest, ProfileResponse,
            PublicUser, RefreshRequest, RegisterRequest, ResetPasswordRequest, TokenIdentity,
            TokenPair, UpdateProfileRequest, VerifyAccountRequest, VerifyTokenRequest,
            VerifyTokenResponse,
        },
        extractors::AuthUser,
        jwt::{JwtKeys, TokenError},
        notify, password,
        repo_types::{NewUser, User},
    },
    error::AppError,
    state::AppState,
};

/// Verification tokens are only honored within 24 hours of account creation.
const VERIFICATION_TOKEN_TTL: Duration = Duration::hours(24);

/// Reset codes expire one hour after issuance.
const RESET_CODE_TTL: Duration = Duration::hours(1);

/// No new reset code is issued while a previous one is unexpired or has been
/// expired for less than this grace window.
const RESET_REISSUE_GRACE: Duration = Duration::minutes(2);

/// Bounds for the SMS-reset datastore operations.
const SMS_LOOKUP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(8);
const SMS_WRITE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// The reset initiators answer with these exact bodies whether or not the
/// target identifier exists, so callers cannot enumerate accounts.
const RESET_EMAIL_GENERIC: &str =
    "if this email is associated with an account, reset instructions have been sent";
const RESET_SMS_GENERIC: &str =
    "if this phone number is associated with an account, a code has been sent by sms";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/verify-token", post(verify_token))
        .route("/auth/refresh-token", post(refresh_token))
        .route("/auth/verify-account", post(verify_account))
        .route("/auth/initiate-password-reset", post(initiate_password_reset))
        .route(
            "/auth/initiate-password-reset-sms",
            post(initiate_password_reset_sms),
        )
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/change-password", put(change_password))
        .route("/auth/profile", get(get_profile).put(update_profile))
        .route("/auth/account", delete(delete_account))
        .route("/auth/refresh-user-data", post(refresh_user_data))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn generate_verification_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn generate_reset_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

fn verification_token_expired(created_at: OffsetDateTime, now: OffsetDateTime) -> bool {
    now > created_at + VERIFICATION_TOKEN_TTL
}

fn within_reissue_grace(
    reset_code: Option<&str>,
    expires: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> bool {
    matches!((reset_code, expires), (Some(_), Some(exp)) if exp > now - RESET_REISSUE_GRACE)
}

/// Tri-state phone update: absent means keep, empty string means clear.
fn phone_update(raw: Option<&str>) -> Option<Option<&str>> {
    match raw {
        None => None,
        Some("") => Some(None),
        Some(p) => Some(Some(p)),
    }
}

fn issue_pair(keys: &JwtKeys, user: &User) -> Result<TokenPair, AppError> {
    Ok(TokenPair {
        access_token: keys.sign_access(user)?,
        refresh_token: keys.sign_refresh(user)?,
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    payload.email = payload.email.trim().to_string();

    if !is_valid_email(&payload.email) {
        return Err(AppError::Validation("invalid email address".into()));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "registration with existing email");
        return Err(AppError::Conflict("this email is already in use".into()));
    }

    let is_oauth = payload.provider.is_some();
    let (password_hash, verification_token, is_verified) = if is_oauth {
        info!(email = %payload.email, provider = payload.provider.as_deref().unwrap_or(""), "oauth registration");
        (None, None, true)
    } else {
        let password = payload.password.as_deref().unwrap_or("");
        if password.len() < 8 {
            return Err(AppError::Validation(
                "password must be at least 8 characters".into(),
            ));
        }
        (
            Some(password::hash_password(password)?),
            Some(generate_verification_token()),
            false,
        )
    };

    let user = User::create(
        &state.db,
        NewUser {
            email: &payload.email,
            password_hash,
            first_name: payload.first_name.as_deref(),
            last_name: payload.last_name.as_deref(),
            verification_token: verification_token.clone(),
            is_verified,
            oauth_provider: payload.provider.as_deref(),
            oauth_provider_id: payload.provider_id.as_deref(),
        },
    )
    .await?;

    let keys = JwtKeys::from_ref(&state);
    let tokens = issue_pair(&keys, &user)?;

    // The response never waits on notification dispatch.
    if let Some(token) = verification_token {
        notify::spawn_confirmation_email(state.clone(), user.id, user.email.clone(), token);
    }

    info!(user_id = %user.id, email = %user.email, oauth = is_oauth, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: if is_oauth {
                "account created".into()
            } else {
                "account created, a confirmation email is on its way".into()
            },
            user: PublicUser::from(&user),
            tokens,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.email = payload.email.trim().to_string();

    let user = User::find_by_email(&state.db, &payload.email).await?;

    // Verify against a dummy hash when there is nothing to compare with, so
    // the failure path takes the same amount of work either way.
    let ok = match user.as_ref().and_then(|u| u.password_hash.as_deref()) {
        Some(hash) => password::verify_password(&payload.password, hash)?,
        None => {
            let _ = password::verify_password(&payload.password, &password::DUMMY_HASH);
            false
        }
    };

    let Some(user) = user.filter(|_| ok) else {
        warn!(email = %payload.email, "login with invalid credentials");
        return Err(AppError::Unauthorized("invalid email or password".into()));
    };

    if !user.is_verified {
        return Err(AppError::Forbidden(
            "please confirm your email address before logging in".into(),
        ));
    }

    let keys = JwtKeys::from_ref(&state);
    let tokens = issue_pair(&keys, &user)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        message: "login successful".into(),
        user: PublicUser::from(&user),
        tokens,
    }))
}

/// Stateless logout: tokens are not revoked server-side, only the session
/// cookie is cleared when one was sent.
#[instrument(skip_all)]
pub async fn logout(headers: HeaderMap) -> (HeaderMap, Json<GenericMessage>) {
    let mut response_headers = HeaderMap::new();

    let has_cookie = headers
        .get(axum::http::header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|c| c.split(';').any(|p| p.trim().starts_with("token=")))
        .unwrap_or(false);

    if has_cookie {
        response_headers.insert(
            axum::http::header::SET_COOKIE,
            "token=; Max-Age=0; Path=/; HttpOnly".parse().unwrap(),
        );
    }

    (
        response_headers,
        Json(GenericMessage {
            message: "logged out".into(),
        }),
    )
}

#[instrument(skip_all)]
pub async fn verify_token(
    State(state): State<AppState>,
    Query(query): Query<VerifyTokenRequest>,
    headers: HeaderMap,
    body: Option<Json<VerifyTokenRequest>>,
) -> Result<(StatusCode, Json<VerifyTokenResponse>), AppError> {
    let token = body
        .and_then(|Json(b)| b.token)
        .or(query.token)
        .or_else(|| {
            headers
                .get("x-access-token")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .ok_or_else(|| AppError::Validation("token is required".into()))?;

    let keys = JwtKeys::from_ref(&state);
    match keys.verify_access(&token) {
        Ok(claims) => Ok((
            StatusCode::OK,
            Json(VerifyTokenResponse {
                valid: true,
                user: Some(TokenIdentity {
                    id: claims.sub,
                    email: claims.email,
                    role: claims.role,
                }),
                message: None,
            }),
        )),
        Err(_) => Ok((
            StatusCode::UNAUTHORIZED,
            Json(VerifyTokenResponse {
                valid: false,
                user: None,
                message: Some("invalid or expired token".into()),
            }),
        )),
    }
}

#[instrument(skip(state, payload))]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| match e {
            TokenError::Expired => AppError::Unauthorized("refresh token expired".into()),
            TokenError::Invalid => AppError::Unauthorized("invalid refresh token".into()),
        })?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("user not found".into()))?;

    // Rotation: a brand-new pair minted from current persisted state.
    Ok(Json(issue_pair(&keys, &user)?))
}

#[instrument(skip(state, payload))]
pub async fn verify_account(
    State(state): State<AppState>,
    Json(payload): Json<VerifyAccountRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    let user = User::find_by_verification_token(&state.db, &payload.token)
        .await?
        .ok_or_else(|| AppError::InvalidOrExpiredToken("invalid verification token".into()))?;

    let now = OffsetDateTime::now_utc();
    if verification_token_expired(user.created_at, now) {
        return Err(AppError::InvalidOrExpiredToken(
            "verification token expired".into(),
        ));
    }

    if user.is_verified {
        // Idempotent: a repeat call succeeds without touching the record.
        warn!(user_id = %user.id, email = %user.email, "verification of an already verified account");
        return Ok(Json(AccountResponse {
            message: "account already verified".into(),
            user: PublicUser::from(&user),
        }));
    }

    state.notifier.cancel_pending_emails(&user.email);
    User::mark_verified(&state.db, user.id).await?;

    info!(user_id = %user.id, email = %user.email, "account verified");
    let mut user = user;
    user.is_verified = true;
    user.verification_token = None;
    Ok(Json(AccountResponse {
        message: "account verified".into(),
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn initiate_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<InitiateResetRequest>,
) -> Result<Json<GenericMessage>, AppError> {
    let email = payload.email.trim().to_string();
    if email.is_empty() {
        return Err(AppError::Validation("email is required".into()));
    }

    info!(email = %email, "password reset requested");

    if let Some(user) = User::find_by_email(&state.db, &email).await? {
        let now = OffsetDateTime::now_utc();
        if within_reissue_grace(user.reset_code.as_deref(), user.reset_code_expires, now) {
            warn!(email = %email, "reset code issued recently, not regenerating");
        } else {
            let code = generate_reset_code();
            User::set_reset_code(&state.db, user.id, &code, now + RESET_CODE_TTL).await?;
            info!(email = %email, "reset code generated");
            notify::spawn_reset_email(state.clone(), email.clone(), code);
        }
    } else {
        warn!(email = %email, "password reset requested for unknown email");
    }

    Ok(Json(GenericMessage {
        message: RESET_EMAIL_GENERIC.into(),
    }))
}

/// Datastore failures and timeouts on this path are indistinguishable from
/// "no such user" in the response; only the logs tell them apart.
#[instrument(skip(state, payload))]
pub async fn initiate_password_reset_sms(
    State(state): State<AppState>,
    Json(payload): Json<InitiateResetSmsRequest>,
) -> Result<Json<GenericMessage>, AppError> {
    let phone = payload.phone_number.trim().to_string();
    if phone.is_empty() {
        return Err(AppError::Validation("phone number is required".into()));
    }

    let generic = || {
        Json(GenericMessage {
            message: RESET_SMS_GENERIC.into(),
        })
    };

    info!(phone = %notify::truncate_phone(&phone), "sms password reset requested");

    let user = match timeout(SMS_LOOKUP_TIMEOUT, User::find_by_phone(&state.db, &phone)).await {
        Ok(Ok(found)) => found,
        Ok(Err(e)) => {
            error!(error = %e, "sms reset user lookup failed");
            return Ok(generic());
        }
        Err(_) => {
            error!("sms reset user lookup timed out");
            return Ok(generic());
        }
    };

    let Some(user) = user else {
        info!(phone = %notify::truncate_phone(&phone), "no account for phone number");
        return Ok(generic());
    };

    let now = OffsetDateTime::now_utc();
    if within_reissue_grace(user.reset_code.as_deref(), user.reset_code_expires, now) {
        warn!(user_id = %user.id, "reset code issued recently, not regenerating");
        return Ok(generic());
    }

    let code = generate_reset_code();
    match timeout(
        SMS_WRITE_TIMEOUT,
        User::set_reset_code(&state.db, user.id, &code, now + RESET_CODE_TTL),
    )
    .await
    {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(user_id = %user.id, error = %e, "saving reset code failed");
            return Ok(generic());
        }
        Err(_) => {
            error!(user_id = %user.id, "saving reset code timed out");
            return Ok(generic());
        }
    }

    info!(user_id = %user.id, "reset code generated for sms");
    notify::spawn_reset_sms(state.clone(), phone, code);

    Ok(generic())
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<GenericMessage>, AppError> {
    if payload.new_password.is_empty() {
        return Err(AppError::Validation("new password is required".into()));
    }

    let new_hash = password::hash_password(&payload.new_password)?;

    // Single conditional write: only succeeds while email, code and expiry
    // all still match, which also settles races with concurrent changes.
    let updated = User::reset_password_with_code(
        &state.db,
        &payload.email,
        &payload.reset_code,
        &new_hash,
    )
    .await?;

    if !updated {
        return Err(AppError::InvalidOrExpiredCode);
    }

    state.notifier.cancel_pending_emails(&payload.email);
    info!(email = %payload.email, "password reset via code");
    Ok(Json(GenericMessage {
        message: "password reset successfully".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<GenericMessage>, AppError> {
    if payload.new_password.is_empty() {
        return Err(AppError::Validation("new password is required".into()));
    }

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))?;

    let Some(current_hash) = user.password_hash.as_deref() else {
        return Err(AppError::Unauthorized("current password is incorrect".into()));
    };

    if !password::verify_password(&payload.current_password, current_hash)? {
        return Err(AppError::Unauthorized("current password is incorrect".into()));
    }

    // Compared through the hash, never against stored plaintext.
    if password::verify_password(&payload.new_password, current_hash)? {
        return Err(AppError::SamePassword);
    }

    state.notifier.cancel_pending_emails(&user.email);

    let new_hash = password::hash_password(&payload.new_password)?;
    User::update_password(&state.db, user.id, &new_hash).await?;

    info!(user_id = %user.id, "password changed, outstanding reset codes invalidated");
    Ok(Json(GenericMessage {
        message: "password changed successfully".into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("user profile not found".into()))?;

    Ok(Json(ProfileResponse {
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("user profile not found".into()))?;

    let phone = phone_update(payload.phone_number.as_deref());

    // Phone numbers must be unique across other accounts.
    if let Some(Some(new_phone)) = phone {
        if user.phone_number.as_deref() != Some(new_phone) {
            if let Some(other) = User::find_by_phone(&state.db, new_phone).await? {
                if other.id != user.id {
                    return Err(AppError::Conflict(
                        "this phone number is already used by another account".into(),
                    ));
                }
            }
        }
    }

    let updated = User::update_profile(
        &state.db,
        user.id,
        payload.first_name.as_deref(),
        payload.last_name.as_deref(),
        phone.is_some(),
        phone.flatten(),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("user profile not found".into()))?;

    Ok(Json(AccountResponse {
        message: "profile updated".into(),
        user: PublicUser::from(&updated),
    }))
}

#[instrument(skip(state))]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<GenericMessage>, AppError> {
    let deleted = User::delete_cascade(&state.db, claims.sub).await?;
    if !deleted {
        return Err(AppError::NotFound("user not found".into()));
    }

    info!(user_id = %claims.sub, "account and dependent records deleted");
    Ok(Json(GenericMessage {
        message: "account deleted successfully".into(),
    }))
}

/// Re-issue tokens from current persisted state, picking up out-of-band
/// role changes such as payment upgrades.
#[instrument(skip(state))]
pub async fn refresh_user_data(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<AuthResponse>, AppError> {
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".into()))?;

    let keys = JwtKeys::from_ref(&state);
    let tokens = issue_pair(&keys, &user)?;

    info!(user_id = %user.id, role = user.role.as_str(), "user data refreshed");
    Ok(Json(AuthResponse {
        message: "user data refreshed".into(),
        user: PublicUser::from(&user),
        tokens,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation_accepts_plain_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("user.name+tag@example.co.uk"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@x"));
    }

    #[test]
    fn verification_tokens_are_64_hex_chars() {
        let token = generate_verification_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_verification_token());
    }

    #[test]
    fn reset_codes_are_six_decimal_digits() {
        for _ in 0..100 {
            let code = generate_reset_code();
            assert_eq!(code.len(), 6);
            let value: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&value));
        }
    }

    #[test]
    fn verification_expiry_is_24_hours_after_creation() {
        let created = OffsetDateTime::now_utc();
        assert!(!verification_token_expired(created, created + Duration::hours(23)));
        assert!(verification_token_expired(
            created,
            created + Duration::hours(24) + Duration::seconds(1)
        ));
    }

    #[test]
    fn reissue_grace_covers_unexpired_and_freshly_expired_codes() {
        let now = OffsetDateTime::now_utc();

        // Unexpired code: throttled.
        assert!(within_reissue_grace(
            Some("123456"),
            Some(now + Duration::minutes(30)),
            now
        ));
        // Expired less than the grace window ago: still throttled.
        assert!(within_reissue_grace(
            Some("123456"),
            Some(now - Duration::minutes(1)),
            now
        ));
        // Expired past the grace window: a new code may be issued.
        assert!(!within_reissue_grace(
            Some("123456"),
            Some(now - Duration::minutes(3)),
            now
        ));
        // No code on record: nothing to throttle.
        assert!(!within_reissue_grace(None, None, now));
        assert!(!within_reissue_grace(
            None,
            Some(now + Duration::minutes(30)),
            now
        ));
    }

    #[test]
    fn phone_update_distinguishes_keep_clear_and_set() {
        assert_eq!(phone_update(None), None);
        assert_eq!(phone_update(Some("")), Some(None));
        assert_eq!(phone_update(Some("+33612345678")), Some(Some("+33612345678")));
    }

    #[test]
    fn reset_initiators_share_one_generic_body_each() {
        // The same constant backs every branch, so existence of an account
        // cannot change the response text.
        assert!(RESET_EMAIL_GENERIC.contains("if this email"));
        assert!(RESET_SMS_GENERIC.contains("if this phone number"));
    }
}
