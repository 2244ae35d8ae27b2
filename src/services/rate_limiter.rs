//! Fixed-window request limiter with temporary blocking.
//!
//! Each client gets a lazily-resetting window of `rate_limit_window_ms`.
//! Exceeding `rate_limit_max_requests` inside one window blocks the
//! client for a fixed five minutes. State lives in process memory and a
//! background sweep drops idle entries.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header::HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::constants::{MAX_WEBHOOK_BODY_BYTES, RATE_LIMIT_BLOCK_DURATION_MS};
use crate::error::AppError;

#[derive(Debug)]
struct ClientWindow {
    count: u32,
    window_start: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

#[derive(Debug)]
struct BlockEntry {
    blocked_until: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LimiterState {
    clients: HashMap<String, ClientWindow>,
    blocked: HashMap<String, BlockEntry>,
}

/// Outcome of a single admission check.
#[derive(Debug, PartialEq)]
pub enum RateLimitDecision {
    Allowed {
        limit: u32,
        remaining: u32,
        /// End of the current window, for the X-RateLimit-Reset header.
        reset: DateTime<Utc>,
    },
    Rejected {
        error: &'static str,
        message: String,
        retry_after_secs: i64,
    },
}

pub struct RateLimiter {
    window_ms: i64,
    max_requests: u32,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(window_ms: i64, max_requests: u32) -> Self {
        Self {
            window_ms,
            max_requests,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// Admits or rejects one request from `client_id` at time `now`.
    pub fn check(&self, client_id: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(block) = state.blocked.get(client_id) {
            if now < block.blocked_until {
                let retry_after_secs = (block.blocked_until - now).num_seconds().max(1);
                return RateLimitDecision::Rejected {
                    error: "Too many requests",
                    message: format!(
                        "You are temporarily blocked. Try again in {retry_after_secs} seconds."
                    ),
                    retry_after_secs,
                };
            }
            // Block expired: lift it and start a fresh window below.
            state.blocked.remove(client_id);
            state.clients.remove(client_id);
        }

        let window_ms = self.window_ms;
        let entry = state
            .clients
            .entry(client_id.to_string())
            .or_insert_with(|| ClientWindow {
                count: 0,
                window_start: now,
                last_seen: now,
            });

        // Strictly greater: a request landing exactly at the boundary
        // still belongs to the current window.
        if (now - entry.window_start).num_milliseconds() > window_ms {
            entry.count = 0;
            entry.window_start = now;
        }
        entry.count += 1;
        entry.last_seen = now;

        let count = entry.count;
        let window_start = entry.window_start;

        if count > self.max_requests {
            let blocked_until = now + chrono::Duration::milliseconds(RATE_LIMIT_BLOCK_DURATION_MS);
            state.blocked.insert(
                client_id.to_string(),
                BlockEntry { blocked_until },
            );
            let block_secs = RATE_LIMIT_BLOCK_DURATION_MS / 1000;
            warn!(client_id, count, "rate limit exceeded, blocking client");
            return RateLimitDecision::Rejected {
                error: "Rate limit exceeded",
                message: format!(
                    "Too many requests. You are now blocked for {block_secs} seconds."
                ),
                retry_after_secs: block_secs,
            };
        }

        if count % 10 == 0 {
            info!(
                client_id,
                count,
                limit = self.max_requests,
                "rate limit status"
            );
        }

        RateLimitDecision::Allowed {
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(count),
            reset: window_start + chrono::Duration::milliseconds(window_ms),
        }
    }

    /// Drops clients idle for more than two windows and expired blocks.
    pub fn sweep(&self, now: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let idle_cutoff = chrono::Duration::milliseconds(self.window_ms * 2);

        let before = state.clients.len() + state.blocked.len();
        state
            .clients
            .retain(|_, entry| now - entry.last_seen < idle_cutoff);
        state.blocked.retain(|_, block| now < block.blocked_until);
        let after = state.clients.len() + state.blocked.len();

        if before != after {
            debug!(removed = before - after, "rate limiter sweep");
        }
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.clients.len() + state.blocked.len()
    }
}

/// Middleware applied to every route. Identifies the client by the
/// WhatsApp sender when the body carries one, otherwise by peer IP.
pub async fn rate_limit_middleware(
    State(state): State<crate::api::AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (parts, body) = request.into_parts();

    let bytes = axum::body::to_bytes(body, MAX_WEBHOOK_BODY_BYTES)
        .await
        .map_err(|_| AppError::BadRequest("Request body too large".to_string()))?;

    let client_id = client_id_from(&parts, &bytes);

    match state.rate_limiter.check(&client_id, Utc::now()) {
        RateLimitDecision::Rejected {
            error,
            message,
            retry_after_secs,
        } => Err(AppError::RateLimited {
            title: error,
            message,
            retry_after: retry_after_secs,
        }),
        RateLimitDecision::Allowed {
            limit,
            remaining,
            reset,
        } => {
            let request = Request::from_parts(parts, Body::from(bytes));
            let mut response = next.run(request).await;
            stamp_quota_headers(&mut response, limit, remaining, reset);
            Ok(response)
        }
    }
}

fn client_id_from(parts: &axum::http::request::Parts, body: &[u8]) -> String {
    if let Some(from) = form_field(body, "From") {
        return from.trim_start_matches("whatsapp:").to_string();
    }
    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    "unknown".to_string()
}

fn form_field(body: &[u8], name: &str) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn stamp_quota_headers(
    response: &mut Response,
    limit: u32,
    remaining: u32,
    reset: DateTime<Utc>,
) {
    let headers = response.headers_mut();
    let pairs = [
        ("x-ratelimit-limit", limit.to_string()),
        ("x-ratelimit-remaining", remaining.to_string()),
        ("x-ratelimit-reset", reset.to_rfc3339()),
    ];
    for (name, value) in pairs {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            headers.insert(name, value);
        }
    }
}
