//! Intent classification and reply rendering.
//!
//! Two strategies exist for each side: an LLM-backed one used when an
//! OpenAI key is configured, and a deterministic one that always works.
//! Any LLM failure falls back to the deterministic path, so both
//! `parse_user_intent` and `render_response` are total.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::constants::{
    HTTP_CONNECT_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS, MAX_AI_REPLY_CHARS, OPENAI_MODEL,
};
use crate::error::{AppError, Result};
use crate::formatter;
use crate::models::{Intent, ParsedIntent, QueryResult};
use crate::parser;

const FALLBACK_CONFIDENCE: f64 = 0.8;

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, message: &str) -> Result<ParsedIntent>;
}

#[async_trait]
pub trait ResponseRenderer: Send + Sync {
    async fn render(&self, result: &QueryResult) -> Result<String>;
}

/// Keyword and regex based classifier. Never fails.
#[derive(Default)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    pub fn parse(&self, message: &str) -> ParsedIntent {
        let parsed = parser::parse_message(message);
        let report = parser::validate_parsed_data(&parsed);
        for issue in report.errors.iter().chain(report.warnings.iter()) {
            debug!(%issue, "message validation note");
        }

        let lowered = parsed.cleaned.to_lowercase();
        let address = parsed.addresses.into_iter().next();
        let hash = parsed.transaction_hashes.into_iter().next();
        let token_id = parsed.token_ids.into_iter().next();
        let symbol = parsed.token_symbols.into_iter().next();

        let mut parameters = HashMap::new();
        parameters.insert("chain".to_string(), parsed.blockchain);

        let intent = if lowered.contains("balance") && address.is_some() {
            parameters.insert("address".to_string(), address.unwrap_or_default());
            Intent::WalletBalance
        } else if lowered.contains("nft") && address.is_some() && token_id.is_some() {
            parameters.insert("contractAddress".to_string(), address.unwrap_or_default());
            parameters.insert("tokenId".to_string(), token_id.unwrap_or_default());
            Intent::NftDetails
        } else if lowered.contains("token") || lowered.contains("price") {
            if let Some(token) = address.or(symbol) {
                parameters.insert("token".to_string(), token);
            }
            Intent::TokenInfo
        } else if (lowered.contains("transaction") || lowered.contains("tx")) && hash.is_some() {
            parameters.insert("hash".to_string(), hash.unwrap_or_default());
            Intent::TransactionDetails
        } else {
            Intent::Help
        };

        ParsedIntent {
            intent,
            parameters,
            confidence: FALLBACK_CONFIDENCE,
        }
    }
}

#[async_trait]
impl IntentClassifier for HeuristicClassifier {
    async fn classify(&self, message: &str) -> Result<ParsedIntent> {
        Ok(self.parse(message))
    }
}

/// Template renderer over the formatter module. Never fails.
#[derive(Default)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    pub fn render_result(&self, result: &QueryResult) -> String {
        match result {
            QueryResult::WalletBalance {
                data,
                address,
                chain,
            } => formatter::format_wallet_balance(data, address, chain),
            QueryResult::TokenInfo { data, chain } => formatter::format_token_info(data, chain),
            QueryResult::NftDetails { data, chain } => formatter::format_nft_details(data, chain),
            QueryResult::TokenPrice { data, token, chain } => {
                formatter::format_price_query(data, token, chain)
            }
            QueryResult::Transaction { data, chain } => {
                formatter::format_transaction_details(data, chain)
            }
        }
    }
}

#[async_trait]
impl ResponseRenderer for TemplateRenderer {
    async fn render(&self, result: &QueryResult) -> Result<String> {
        Ok(self.render_result(result))
    }
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: &'static str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Thin chat-completions client shared by the LLM classifier and
/// renderer.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(api_url: &str, api_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f64,
        max_tokens: u32,
        json_mode: bool,
    ) -> Result<String> {
        let request = ChatRequest {
            model: OPENAI_MODEL,
            messages,
            temperature,
            max_tokens,
            response_format: json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::ExternalApi("chat completion had no choices".to_string()))
    }
}

const PARSE_SYSTEM_PROMPT: &str = "You are an intent parser for a Web3 WhatsApp assistant. \
Classify the user's message as one of: wallet_balance, token_info, nft_details, price_query, \
transaction_details, help. Respond with JSON only, shaped as \
{\"intent\": \"...\", \"parameters\": {...}, \"confidence\": 0.0}. Parameters may include \
address, token, contractAddress, tokenId, hash, and chain (ethereum or polygon).";

const RENDER_SYSTEM_PROMPT: &str = "You are WallyBot, a friendly WhatsApp Web3 assistant. \
Write a short WhatsApp reply (under 1000 characters) using emojis and *bold* markers. \
Use only the data provided and never invent values.";

#[derive(Deserialize)]
struct LlmIntentPayload {
    intent: String,
    #[serde(default)]
    parameters: HashMap<String, serde_json::Value>,
    #[serde(default)]
    confidence: Option<f64>,
}

pub struct LlmClassifier {
    client: OpenAiClient,
}

impl LlmClassifier {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IntentClassifier for LlmClassifier {
    async fn classify(&self, message: &str) -> Result<ParsedIntent> {
        let content = self
            .client
            .chat(
                vec![
                    ChatMessage {
                        role: "system",
                        content: PARSE_SYSTEM_PROMPT.to_string(),
                    },
                    ChatMessage {
                        role: "user",
                        content: message.to_string(),
                    },
                ],
                0.1,
                200,
                true,
            )
            .await?;

        let payload: LlmIntentPayload = serde_json::from_str(&content)
            .map_err(|e| AppError::ExternalApi(format!("unparseable intent JSON: {e}")))?;

        let intent = Intent::parse(&payload.intent);
        if intent == Intent::Help && payload.intent != "help" {
            return Err(AppError::ExternalApi(format!(
                "unrecognized intent '{}'",
                payload.intent
            )));
        }

        let parameters = payload
            .parameters
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect();

        Ok(ParsedIntent {
            intent,
            parameters,
            confidence: payload.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
        })
    }
}

pub struct LlmRenderer {
    client: OpenAiClient,
}

impl LlmRenderer {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResponseRenderer for LlmRenderer {
    async fn render(&self, result: &QueryResult) -> Result<String> {
        let user_prompt = format!(
            "The user asked about {}. Reply using this data:\n{}",
            result.intent().as_str(),
            result.data_json()
        );
        let reply = self
            .client
            .chat(
                vec![
                    ChatMessage {
                        role: "system",
                        content: RENDER_SYSTEM_PROMPT.to_string(),
                    },
                    ChatMessage {
                        role: "user",
                        content: user_prompt,
                    },
                ],
                0.7,
                300,
                false,
            )
            .await?;

        let reply = reply.trim();
        if reply.is_empty() {
            return Err(AppError::ExternalApi("empty chat reply".to_string()));
        }
        Ok(reply.chars().take(MAX_AI_REPLY_CHARS).collect())
    }
}

/// Facade the webhook controller talks to. Prefers the LLM strategies
/// when configured, always lands on the deterministic ones.
pub struct IntentService {
    heuristic: HeuristicClassifier,
    template: TemplateRenderer,
    llm_classifier: Option<LlmClassifier>,
    llm_renderer: Option<LlmRenderer>,
}

impl IntentService {
    pub fn new(config: &Config) -> Result<Self> {
        let (llm_classifier, llm_renderer) = match &config.openai_api_key {
            Some(key) => {
                let client = OpenAiClient::new(&config.openai_api_url, key)?;
                (
                    Some(LlmClassifier::new(client.clone())),
                    Some(LlmRenderer::new(client)),
                )
            }
            None => (None, None),
        };
        Ok(Self {
            heuristic: HeuristicClassifier,
            template: TemplateRenderer,
            llm_classifier,
            llm_renderer,
        })
    }

    pub async fn parse_user_intent(&self, message: &str) -> ParsedIntent {
        if let Some(classifier) = &self.llm_classifier {
            match classifier.classify(message).await {
                Ok(parsed) => {
                    debug!(intent = parsed.intent.as_str(), "LLM classified intent");
                    return parsed;
                }
                Err(e) => warn!(error = %e, "LLM intent parsing failed, using fallback"),
            }
        }
        self.heuristic.parse(message)
    }

    pub async fn render_response(&self, result: &QueryResult) -> String {
        if let Some(renderer) = &self.llm_renderer {
            match renderer.render(result).await {
                Ok(reply) => return reply,
                Err(e) => warn!(error = %e, "LLM reply generation failed, using template"),
            }
        }
        self.template.render_result(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenPrice;

    const ADDRESS: &str = "0x742d35cc4bf86c6d8ba9352532fd1e42a5d9e69b";

    #[test]
    fn balance_with_address_maps_to_wallet_balance() {
        let parsed =
            HeuristicClassifier.parse(&format!("check balance for {ADDRESS} on polygon"));
        assert_eq!(parsed.intent, Intent::WalletBalance);
        assert_eq!(parsed.param("address"), Some(ADDRESS));
        assert_eq!(parsed.param("chain"), Some("polygon"));
        assert_eq!(parsed.confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn nft_needs_both_contract_and_token_id() {
        let parsed = HeuristicClassifier.parse(&format!("show nft {ADDRESS} #1234"));
        assert_eq!(parsed.intent, Intent::NftDetails);
        assert_eq!(parsed.param("contractAddress"), Some(ADDRESS));
        assert_eq!(parsed.param("tokenId"), Some("1234"));

        let missing_id = HeuristicClassifier.parse(&format!("show nft {ADDRESS}"));
        assert_eq!(missing_id.intent, Intent::Help);
    }

    #[test]
    fn price_words_map_to_token_info_with_symbol() {
        let parsed = HeuristicClassifier.parse("what is the price of USDC?");
        assert_eq!(parsed.intent, Intent::TokenInfo);
        assert_eq!(parsed.param("token"), Some("USDC"));
    }

    #[test]
    fn token_branch_prefers_address_over_symbol() {
        let parsed = HeuristicClassifier.parse(&format!("token info for {ADDRESS} vs WETH"));
        assert_eq!(parsed.intent, Intent::TokenInfo);
        assert_eq!(parsed.param("token"), Some(ADDRESS));
    }

    #[test]
    fn transaction_requires_a_hash() {
        let hash = format!("0x{}", "ab".repeat(32));
        let parsed = HeuristicClassifier.parse(&format!("show tx {hash}"));
        assert_eq!(parsed.intent, Intent::TransactionDetails);
        assert_eq!(parsed.param("hash"), Some(hash.as_str()));

        let without = HeuristicClassifier.parse("show my last transaction");
        assert_eq!(without.intent, Intent::Help);
    }

    #[test]
    fn unmatched_messages_default_to_help() {
        let parsed = HeuristicClassifier.parse("good morning!");
        assert_eq!(parsed.intent, Intent::Help);
    }

    #[test]
    fn template_renderer_delegates_to_formatter() {
        let result = QueryResult::TokenPrice {
            data: TokenPrice {
                symbol: Some("ETH".to_string()),
                price: Some(2500.0),
                ..Default::default()
            },
            token: "ETH".to_string(),
            chain: "ethereum".to_string(),
        };
        let text = TemplateRenderer.render_result(&result);
        assert!(text.contains("Token Price"));
        assert!(text.contains("ETH"));
    }

    #[test]
    fn llm_intent_payload_tolerates_non_string_parameters() {
        let payload: LlmIntentPayload = serde_json::from_str(
            r#"{"intent":"nft_details","parameters":{"tokenId":1234,"chain":"polygon"},"confidence":0.93}"#,
        )
        .unwrap();
        assert_eq!(payload.intent, "nft_details");
        assert_eq!(
            payload.parameters.get("tokenId"),
            Some(&serde_json::json!(1234))
        );
    }
}
