/// Application constants

// Rate limiting defaults (overridable via RATE_LIMIT_* env vars)
pub const RATE_LIMIT_WINDOW_MS: i64 = 900_000; // 15 minutes
pub const RATE_LIMIT_MAX_REQUESTS: u32 = 100;
pub const RATE_LIMIT_BLOCK_DURATION_MS: i64 = 300_000; // 5 minutes
pub const RATE_LIMIT_CLEANUP_INTERVAL_SECS: u64 = 300;

// Largest form body the rate limiter will buffer when looking for the
// sender phone number. Twilio webhook payloads stay far below this.
pub const MAX_WEBHOOK_BODY_BYTES: usize = 64 * 1024;

// External API defaults
pub const NODIT_DEFAULT_BASE_URL: &str = "https://web3.nodit.io";
pub const TWILIO_DEFAULT_API_URL: &str = "https://api.twilio.com";
pub const OPENAI_DEFAULT_API_URL: &str = "https://api.openai.com";
pub const OPENAI_MODEL: &str = "gpt-3.5-turbo";

// Outbound HTTP timeouts. The upstream APIs do not advertise one we
// can rely on, so every client sets these explicitly.
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 4;
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 10;

// Message constraints
pub const MAX_INBOUND_MESSAGE_CHARS: usize = 4000;
pub const MAX_AI_REPLY_CHARS: usize = 1000;

// Service identity
pub const SERVICE_NAME: &str = "WallyBot";
pub const SERVICE_DESCRIPTION: &str = "WhatsApp Web3 Assistant";
