//! Detached notification dispatch. Every task here is spawned after the
//! request's response is decided, re-validates its preconditions against
//! current persisted state immediately before sending, and silently no-ops
//! when they no longer hold. Failures are logged, never escalated: the
//! stored token or code is already persisted and a resend can be requested.

use std::time::Duration;

use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::notifier::{EmailKind, SmsOutcome};
use crate::state::AppState;

const RESET_EMAIL_RETRY_PAUSE: Duration = Duration::from_secs(3);

fn token_prefix(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}...")
}

pub(crate) fn truncate_phone(phone: &str) -> String {
    let prefix: String = phone.chars().take(3).collect();
    format!("{prefix}***")
}

pub fn spawn_confirmation_email(state: AppState, user_id: Uuid, email: String, token: String) {
    tokio::spawn(async move {
        let current = match User::find_by_id(&state.db, user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                info!(%email, "user deleted before confirmation email, send cancelled");
                return;
            }
            Err(e) => {
                error!(%email, error = %e, "confirmation email pre-send lookup failed");
                return;
            }
        };

        // The account may have been verified while this task was queued.
        if current.is_verified {
            info!(%email, "user already verified, confirmation email cancelled");
            return;
        }
        if current.verification_token.as_deref() != Some(token.as_str()) {
            info!(%email, "verification token changed, confirmation email cancelled");
            return;
        }

        match state
            .notifier
            .send_email(EmailKind::Confirm, &email, &token)
            .await
        {
            Ok(()) => {
                info!(%email, token = %token_prefix(&token), "confirmation email sent")
            }
            Err(e) => error!(%email, error = %e, "confirmation email dispatch failed"),
        }
    });
}

/// Reset emails get exactly one bounded retry, with re-validation between
/// attempts so a code consumed in the meantime is never re-sent.
pub fn spawn_reset_email(state: AppState, email: String, code: String) {
    tokio::spawn(async move {
        for attempt in 0..2 {
            match User::find_by_reset_code(&state.db, &email, &code).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    info!(%email, "reset code used or expired, reset email cancelled");
                    return;
                }
                Err(e) => {
                    error!(%email, error = %e, "reset email pre-send lookup failed");
                    return;
                }
            }

            match state
                .notifier
                .send_email(EmailKind::Reset, &email, &code)
                .await
            {
                Ok(()) => {
                    info!(%email, "password reset email sent");
                    return;
                }
                Err(e) if attempt == 0 => {
                    warn!(%email, error = %e, "reset email dispatch failed, retrying once");
                    tokio::time::sleep(RESET_EMAIL_RETRY_PAUSE).await;
                }
                Err(e) => {
                    error!(%email, error = %e, "reset email dispatch failed after retry");
                    return;
                }
            }
        }
    });
}

pub fn spawn_reset_sms(state: AppState, phone: String, code: String) {
    tokio::spawn(async move {
        let still_current = match User::find_by_phone(&state.db, &phone).await {
            Ok(Some(user)) => {
                user.reset_code.as_deref() == Some(code.as_str())
                    && user
                        .reset_code_expires
                        .is_some_and(|t| t > OffsetDateTime::now_utc())
            }
            Ok(None) => false,
            Err(e) => {
                error!(phone = %truncate_phone(&phone), error = %e, "sms pre-send lookup failed");
                return;
            }
        };
        if !still_current {
            info!(phone = %truncate_phone(&phone), "reset code no longer current, sms cancelled");
            return;
        }

        match state.notifier.send_sms(&code).await {
            Ok(SmsOutcome::Delivered) => {
                info!(phone = %truncate_phone(&phone), "password reset sms sent")
            }
            Ok(SmsOutcome::PossiblyDelivered) => {
                warn!(phone = %truncate_phone(&phone), "sms gateway errored, sms possibly delivered")
            }
            Err(e) => {
                error!(phone = %truncate_phone(&phone), error = %e, "password reset sms failed");
                // The stored code stays valid; the user can retry.
                info!(phone = %truncate_phone(&phone), "reset code remains usable despite sms failure");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_prefix_never_exposes_the_full_token() {
        let prefixed = token_prefix("abcdef0123456789abcdef0123456789");
        assert_eq!(prefixed, "abcdef01...");
    }

    #[test]
    fn phone_is_truncated_for_logs() {
        assert_eq!(truncate_phone("+33612345678"), "+33***");
        assert_eq!(truncate_phone("06"), "06***");
    }
}
