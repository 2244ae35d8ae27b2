//! Twilio WhatsApp messaging: outbound sends and inbound webhook
//! signature validation.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha1::Sha1;
use tracing::{debug, info};

use crate::constants::{HTTP_CONNECT_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS};
use crate::error::{AppError, Result};

type HmacSha1 = Hmac<Sha1>;

#[derive(Clone)]
pub struct TwilioClient {
    api_url: String,
    account_sid: String,
    auth_token: String,
    phone_number: String,
    client: Client,
}

#[derive(Deserialize)]
struct MessageResponse {
    sid: String,
}

impl TwilioClient {
    pub fn new(
        api_url: &str,
        account_sid: &str,
        auth_token: &str,
        phone_number: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            phone_number: phone_number.to_string(),
            client,
        })
    }

    /// Sends a WhatsApp message. `to` is an E.164 number with or
    /// without the `whatsapp:` prefix. Returns the message SID.
    pub async fn send_message(&self, to: &str, body: &str) -> Result<String> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_url, self.account_sid
        );
        let from = whatsapp_address(&self.phone_number);
        let to = whatsapp_address(to);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("From", from.as_str()), ("To", to.as_str()), ("Body", body)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "twilio send failed with {status}: {detail}"
            )));
        }

        let message: MessageResponse = response.json().await?;
        info!(sid = %message.sid, %to, "whatsapp message sent");
        Ok(message.sid)
    }

    /// WhatsApp has no public typing-indicator API; this is a hook so
    /// the controller reads like the conversation flow it models.
    pub async fn send_typing_indicator(&self, to: &str) {
        debug!(%to, "typing indicator requested");
    }

    /// Validates the `x-twilio-signature` header: Base64 of
    /// HMAC-SHA1(auth token, url + params sorted by key, each appended
    /// as key then value).
    pub fn validate_signature(
        &self,
        url: &str,
        params: &[(String, String)],
        signature: &str,
    ) -> bool {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut payload = url.to_string();
        for (key, value) in sorted {
            payload.push_str(key);
            payload.push_str(value);
        }

        let mut mac = match HmacSha1::new_from_slice(self.auth_token.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(payload.as_bytes());
        let expected = BASE64.encode(mac.finalize().into_bytes());

        constant_time_eq(expected.as_bytes(), signature.as_bytes())
    }
}

fn whatsapp_address(number: &str) -> String {
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{number}")
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TwilioClient {
        TwilioClient::new(
            "https://api.twilio.com",
            "ACxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
            "12345678901234567890123456789012",
            "+14155238886",
        )
        .unwrap()
    }

    fn sign(auth_token: &str, url: &str, params: &[(String, String)]) -> String {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        let mut payload = url.to_string();
        for (key, value) in sorted {
            payload.push_str(key);
            payload.push_str(value);
        }
        let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes()).unwrap();
        mac.update(payload.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }

    fn sample_params() -> Vec<(String, String)> {
        vec![
            ("To".to_string(), "whatsapp:+14155238886".to_string()),
            ("From".to_string(), "whatsapp:+15551234567".to_string()),
            ("Body".to_string(), "check balance".to_string()),
            ("MessageSid".to_string(), "SM123".to_string()),
        ]
    }

    #[test]
    fn accepts_a_correctly_signed_request() {
        let client = client();
        let url = "https://bot.example.com/webhook";
        let params = sample_params();
        let signature = sign(&client.auth_token, url, &params);
        assert!(client.validate_signature(url, &params, &signature));
    }

    #[test]
    fn rejects_tampered_parameters() {
        let client = client();
        let url = "https://bot.example.com/webhook";
        let mut params = sample_params();
        let signature = sign(&client.auth_token, url, &params);
        params[2].1 = "drain my wallet".to_string();
        assert!(!client.validate_signature(url, &params, &signature));
    }

    #[test]
    fn rejects_a_different_url() {
        let client = client();
        let params = sample_params();
        let signature = sign(&client.auth_token, "https://bot.example.com/webhook", &params);
        assert!(!client.validate_signature(
            "https://evil.example.com/webhook",
            &params,
            &signature
        ));
    }

    #[test]
    fn signature_is_order_insensitive_over_params() {
        let client = client();
        let url = "https://bot.example.com/webhook";
        let params = sample_params();
        let mut shuffled = params.clone();
        shuffled.reverse();
        let signature = sign(&client.auth_token, url, &params);
        assert!(client.validate_signature(url, &shuffled, &signature));
    }

    #[test]
    fn whatsapp_prefix_is_not_duplicated() {
        assert_eq!(whatsapp_address("+15551234567"), "whatsapp:+15551234567");
        assert_eq!(
            whatsapp_address("whatsapp:+15551234567"),
            "whatsapp:+15551234567"
        );
    }
}
