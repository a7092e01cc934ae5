use std::time::{Duration, Instant};

use axum::{extract::Request, extract::State, middleware::Next, response::Response};

use crate::{error::AppError, state::AppState};

/// Fixed-window request counter per client.
#[derive(Debug, Clone)]
pub struct RateLimitEntry {
    requests: u64,
    window_start: Instant,
}

/// Fixed-window rate limiter keyed by client IP. Settings come from
/// process configuration; exceeding the window yields `RateLimited`.
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client_ip = request
        .headers()
        .get("x-real-ip")
        .or_else(|| request.headers().get("x-forwarded-for"))
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let max_requests = state.config.rate_limit.max_requests;
    let window = Duration::from_secs(state.config.rate_limit.window_secs);

    let mut entry = state
        .rate_limits
        .entry(client_ip)
        .or_insert_with(|| RateLimitEntry {
            requests: 0,
            window_start: Instant::now(),
        });

    if entry.window_start.elapsed() > window {
        entry.requests = 0;
        entry.window_start = Instant::now();
    }

    entry.requests += 1;
    if entry.requests > max_requests {
        return Err(AppError::RateLimited);
    }
    drop(entry);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_resets_after_expiry() {
        let mut entry = RateLimitEntry {
            requests: 10,
            window_start: Instant::now() - Duration::from_secs(120),
        };
        let window = Duration::from_secs(60);
        if entry.window_start.elapsed() > window {
            entry.requests = 0;
            entry.window_start = Instant::now();
        }
        assert_eq!(entry.requests, 0);
    }
}
