use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::NotificationConfig;

/// Message kinds understood by the external notification service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Confirm,
    Reset,
}

impl EmailKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EmailKind::Confirm => "confirm",
            EmailKind::Reset => "reset",
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("sms gateway credentials are not configured")]
    SmsNotConfigured,

    #[error("notification service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notification service returned status {0}")]
    Rejected(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsOutcome {
    Delivered,
    /// The gateway answered with a 500-class status, which it is known to do
    /// even when the SMS went out.
    PossiblyDelivered,
}

#[derive(Serialize)]
struct EmailPayload<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    email: &'a str,
    #[serde(rename = "tokenOrCode")]
    token_or_code: &'a str,
}

#[derive(Serialize)]
struct SmsPayload<'a> {
    username: &'a str,
    #[serde(rename = "apiKey")]
    api_key: &'a str,
    code: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
}

/// Best-effort dispatch to the external delivery service. Failures are
/// reported to the caller, which treats them as non-fatal: the stored
/// token or code has already been persisted, so the user can always
/// request a resend.
#[async_trait]
pub trait NotificationClient: Send + Sync {
    async fn send_email(
        &self,
        kind: EmailKind,
        email: &str,
        token_or_code: &str,
    ) -> Result<(), NotifyError>;

    async fn send_sms(&self, code: &str) -> Result<SmsOutcome, NotifyError>;

    /// Advisory only. Notifications already in flight cannot be retracted;
    /// this exists as a log signal for operators.
    fn cancel_pending_emails(&self, email: &str);
}

pub struct NotificationGateway {
    http: reqwest::Client,
    base_url: String,
    sms_username: Option<String>,
    sms_api_key: Option<String>,
}

impl NotificationGateway {
    pub fn new(config: &NotificationConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            sms_username: config.sms_username.clone(),
            sms_api_key: config.sms_api_key.clone(),
        })
    }
}

#[async_trait]
impl NotificationClient for NotificationGateway {
    async fn send_email(
        &self,
        kind: EmailKind,
        email: &str,
        token_or_code: &str,
    ) -> Result<(), NotifyError> {
        let res = self
            .http
            .post(format!("{}/api/notifications/email", self.base_url))
            .json(&EmailPayload {
                kind: kind.as_str(),
                email,
                token_or_code,
            })
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(NotifyError::Rejected(res.status().as_u16()));
        }
        debug!(%email, kind = kind.as_str(), "notification email dispatched");
        Ok(())
    }

    async fn send_sms(&self, code: &str) -> Result<SmsOutcome, NotifyError> {
        let (username, api_key) = match (&self.sms_username, &self.sms_api_key) {
            (Some(u), Some(k)) => (u.as_str(), k.as_str()),
            _ => return Err(NotifyError::SmsNotConfigured),
        };

        let res = self
            .http
            .post(format!("{}/api/notifications/sms", self.base_url))
            .json(&SmsPayload {
                username,
                api_key,
                code,
                kind: "reset",
            })
            .send()
            .await?;

        if res.status().is_server_error() {
            warn!(status = res.status().as_u16(), "sms gateway errored, treating as possibly delivered");
            return Ok(SmsOutcome::PossiblyDelivered);
        }
        if !res.status().is_success() {
            return Err(NotifyError::Rejected(res.status().as_u16()));
        }
        Ok(SmsOutcome::Delivered)
    }

    fn cancel_pending_emails(&self, email: &str) {
        info!(%email, "cancellation requested for pending notification emails");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotificationConfig;

    fn gateway_without_sms() -> NotificationGateway {
        NotificationGateway::new(&NotificationConfig {
            base_url: "http://localhost:5005".into(),
            sms_username: None,
            sms_api_key: None,
        })
        .expect("gateway should construct")
    }

    #[test]
    fn email_payload_uses_gateway_field_names() {
        let json = serde_json::to_string(&EmailPayload {
            kind: EmailKind::Reset.as_str(),
            email: "a@x.com",
            token_or_code: "123456",
        })
        .unwrap();
        assert!(json.contains(r#""type":"reset""#));
        assert!(json.contains(r#""tokenOrCode":"123456""#));
    }

    #[test]
    fn sms_payload_uses_gateway_field_names() {
        let json = serde_json::to_string(&SmsPayload {
            username: "u",
            api_key: "k",
            code: "123456",
            kind: "reset",
        })
        .unwrap();
        assert!(json.contains(r#""apiKey":"k""#));
        assert!(json.contains(r#""type":"reset""#));
    }

    #[tokio::test]
    async fn sms_without_credentials_fails_at_dispatch_time() {
        let gateway = gateway_without_sms();
        let err = gateway.send_sms("123456").await.unwrap_err();
        assert!(matches!(err, NotifyError::SmsNotConfigured));
    }
}
