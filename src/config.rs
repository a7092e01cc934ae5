use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    pub base_url: String,
    /// SMS gateway credentials. Missing values are a dispatch-time failure,
    /// not a startup failure.
    pub sms_username: Option<String>,
    pub sms_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u64,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub notifications: NotificationConfig,
    pub rate_limit: RateLimitConfig,
    pub cors_origin: String,
    pub host: String,
    pub port: u16,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Build the process-wide configuration from the environment, failing
    /// fast before any traffic is served.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;

        let jwt = JwtConfig {
            access_secret: std::env::var("JWT_ACCESS_SECRET")
                .context("JWT_ACCESS_SECRET is required")?,
            refresh_secret: std::env::var("JWT_REFRESH_SECRET")
                .context("JWT_REFRESH_SECRET is required")?,
            access_ttl_minutes: env_or("JWT_ACCESS_TTL_MINUTES", 60),
            refresh_ttl_days: env_or("JWT_REFRESH_TTL_DAYS", 7),
        };

        // Two independent signing contexts only make sense with two secrets.
        if jwt.access_secret == jwt.refresh_secret {
            bail!("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ");
        }

        let notifications = NotificationConfig {
            base_url: std::env::var("NOTIFICATION_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:5005".into()),
            sms_username: std::env::var("SMS_GATEWAY_USERNAME").ok(),
            sms_api_key: std::env::var("SMS_GATEWAY_API_KEY").ok(),
        };

        let rate_limit = RateLimitConfig {
            max_requests: env_or("RATE_LIMIT_MAX_REQUESTS", 500),
            window_secs: env_or("RATE_LIMIT_WINDOW_SECS", 15 * 60),
        };

        Ok(Self {
            database_url,
            jwt,
            notifications,
            rate_limit,
            cors_origin: std::env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_on_missing_or_garbage() {
        std::env::remove_var("WAYFARER_TEST_MISSING");
        assert_eq!(env_or("WAYFARER_TEST_MISSING", 42i64), 42);

        std::env::set_var("WAYFARER_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_or("WAYFARER_TEST_GARBAGE", 7u16), 7);

        std::env::set_var("WAYFARER_TEST_VALID", "9090");
        assert_eq!(env_or("WAYFARER_TEST_VALID", 8080u16), 9090);
    }
}
