// All service modules
pub mod intent_service;
pub mod rate_limiter;

// Re-export for convenience
pub use intent_service::IntentService;
pub use rate_limiter::RateLimiter;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::constants::RATE_LIMIT_CLEANUP_INTERVAL_SECS;

/// Start all background services
pub async fn start_background_services(rate_limiter: Arc<RateLimiter>) {
    tracing::info!("Starting background services...");

    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(RATE_LIMIT_CLEANUP_INTERVAL_SECS));
        // First tick fires immediately; skip it so startup stays quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            rate_limiter.sweep(Utc::now());
        }
    });

    tracing::info!("All background services started");
}
