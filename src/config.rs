use crate::constants::{
    NODIT_DEFAULT_BASE_URL, OPENAI_DEFAULT_API_URL, RATE_LIMIT_MAX_REQUESTS,
    RATE_LIMIT_WINDOW_MS, TWILIO_DEFAULT_API_URL,
};
use crate::validators::{self, NumberOptions};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Rate limiting
    pub rate_limit_window_ms: i64,
    pub rate_limit_max_requests: u32,

    // Twilio (messaging provider)
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
    pub twilio_api_url: String,

    // Nodit (blockchain data provider)
    pub nodit_base_url: String,
    pub nodit_api_key: String,

    // OpenAI (optional intent parsing / reply generation)
    pub openai_api_key: Option<String>,
    pub openai_api_url: String,

    // Canonical webhook URL used for signature reconstruction when the
    // service sits behind a proxy.
    pub webhook_url: Option<String>,

    // Optional shared secret for API-key auth
    pub api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            rate_limit_window_ms: env::var("RATE_LIMIT_WINDOW_MS")
                .unwrap_or_else(|_| RATE_LIMIT_WINDOW_MS.to_string())
                .parse()?,
            rate_limit_max_requests: env::var("RATE_LIMIT_MAX_REQUESTS")
                .unwrap_or_else(|_| RATE_LIMIT_MAX_REQUESTS.to_string())
                .parse()?,

            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID")?,
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN")?,
            twilio_phone_number: env::var("TWILIO_PHONE_NUMBER")?,
            twilio_api_url: env::var("TWILIO_API_URL")
                .unwrap_or_else(|_| TWILIO_DEFAULT_API_URL.to_string()),

            nodit_base_url: env::var("NODIT_BASE_URL")
                .unwrap_or_else(|_| NODIT_DEFAULT_BASE_URL.to_string()),
            nodit_api_key: env::var("NODIT_API_KEY")?,

            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_api_url: env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| OPENAI_DEFAULT_API_URL.to_string()),

            webhook_url: env::var("WEBHOOK_URL").ok(),

            api_key: env::var("API_KEY").ok(),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let port_check = validators::validate_number(
            f64::from(self.port),
            &NumberOptions {
                min: Some(1.0),
                max: Some(65535.0),
                allow_decimals: false,
                name: "PORT",
            },
        );
        if let Some(err) = port_check.error {
            anyhow::bail!("Invalid PORT: {err}");
        }

        if self.twilio_account_sid.trim().is_empty() || self.twilio_auth_token.trim().is_empty() {
            anyhow::bail!("Twilio credentials are missing");
        }
        let phone_check = validators::validate_phone_number(&self.twilio_phone_number);
        if let Some(err) = phone_check.error {
            anyhow::bail!("Invalid TWILIO_PHONE_NUMBER: {err}");
        }
        if self.nodit_api_key.trim().is_empty() {
            anyhow::bail!("NODIT_API_KEY is empty");
        }

        if self.rate_limit_window_ms <= 0 {
            anyhow::bail!("RATE_LIMIT_WINDOW_MS must be > 0");
        }
        if self.rate_limit_max_requests == 0 {
            tracing::warn!("RATE_LIMIT_MAX_REQUESTS is 0; every request will be rejected");
        }

        if self.openai_api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set; using heuristic intent parsing only");
        }
        if self.webhook_url.is_none() {
            tracing::warn!(
                "WEBHOOK_URL not set; signature URLs are reconstructed from the Host header"
            );
        }
        if let Some(key) = &self.api_key {
            let check = validators::validate_api_key(key);
            if let Some(err) = check.error {
                anyhow::bail!("Invalid API_KEY: {err}");
            }
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "test".to_string(),
            rate_limit_window_ms: 900_000,
            rate_limit_max_requests: 100,
            twilio_account_sid: "ACtest".to_string(),
            twilio_auth_token: "token".to_string(),
            twilio_phone_number: "+14155238886".to_string(),
            twilio_api_url: TWILIO_DEFAULT_API_URL.to_string(),
            nodit_base_url: NODIT_DEFAULT_BASE_URL.to_string(),
            nodit_api_key: "nodit_key".to_string(),
            openai_api_key: None,
            openai_api_url: OPENAI_DEFAULT_API_URL.to_string(),
            webhook_url: None,
            api_key: None,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn bad_phone_number_fails() {
        let mut config = test_config();
        config.twilio_phone_number = "not-a-number".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_nodit_key_fails() {
        let mut config = test_config();
        config.nodit_api_key = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn is_production_reflects_environment() {
        let mut config = test_config();
        assert!(!config.is_production());
        config.environment = "production".to_string();
        assert!(config.is_production());
    }
}
