// src/api/mod.rs

pub mod health;
pub mod webhook;

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::Result;
use crate::integrations::{NoditClient, TwilioClient};
use crate::services::{IntentService, RateLimiter};

// AppState definition
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub rate_limiter: Arc<RateLimiter>,
    pub intents: Arc<IntentService>,
    pub nodit: Arc<NoditClient>,
    pub twilio: Arc<TwilioClient>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_window_ms,
            config.rate_limit_max_requests,
        ));
        let intents = Arc::new(IntentService::new(&config)?);
        let nodit = Arc::new(NoditClient::new(
            &config.nodit_base_url,
            &config.nodit_api_key,
        )?);
        let twilio = Arc::new(TwilioClient::new(
            &config.twilio_api_url,
            &config.twilio_account_sid,
            &config.twilio_auth_token,
            &config.twilio_phone_number,
        )?);

        Ok(Self {
            config,
            rate_limiter,
            intents,
            nodit,
            twilio,
            started_at: Instant::now(),
        })
    }
}
