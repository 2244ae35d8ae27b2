//! Inbound WhatsApp webhook: signature check, intent dispatch, reply.
//!
//! The conversational contract is that chat problems are answered in
//! chat. Missing parameters and upstream failures all produce a 200
//! with an explanatory reply; HTTP errors are reserved for requests
//! that never came from Twilio (bad signature) or replies we could not
//! deliver.

use axum::extract::State;
use axum::http::HeaderMap;
use tracing::{error, info, warn};

use super::AppState;
use crate::error::{AppError, Result};
use crate::formatter;
use crate::models::{Intent, ParsedIntent, QueryResult, TokenPrice};
use crate::validators::{self, TokenKind};

pub async fn handle_incoming_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<&'static str> {
    let signature = headers
        .get("x-twilio-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::MissingSignature)?;

    let params: Vec<(String, String)> = url::form_urlencoded::parse(body.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let url = webhook_url(&state, &headers);
    if !state.twilio.validate_signature(&url, &params, signature) {
        warn!(%url, "webhook signature mismatch");
        return Err(AppError::InvalidSignature);
    }

    let field = |name: &str| {
        params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .unwrap_or_default()
    };
    let message = field("Body").trim().to_string();
    let message_sid = field("MessageSid").to_string();

    let phone = validators::validate_phone_number(field("From"));
    let from = match phone.formatted {
        Some(number) if phone.is_valid => number,
        _ => {
            return Err(AppError::BadRequest(
                "Missing or invalid sender number".to_string(),
            ))
        }
    };

    info!(%message_sid, from = %from, "incoming whatsapp message");

    let length_check = validators::validate_message(&message);
    let reply = if !length_check.is_valid {
        formatter::format_error(&length_check.error.unwrap_or_default())
    } else {
        state.twilio.send_typing_indicator(&from).await;
        let parsed = state.intents.parse_user_intent(&message).await;
        info!(
            intent = parsed.intent.as_str(),
            confidence = parsed.confidence,
            "intent classified"
        );
        process_request(&state, &parsed, &message).await
    };

    let preview: String = reply.chars().take(100).collect();
    tracing::debug!(%preview, "sending reply");
    state.twilio.send_message(&from, &reply).await?;

    Ok("OK")
}

/// Resolves the URL Twilio signed. Configured value wins; otherwise it
/// is rebuilt from the Host header.
fn webhook_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(configured) = &state.config.webhook_url {
        return configured.clone();
    }
    let host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let scheme = if state.config.is_production() {
        "https"
    } else {
        "http"
    };
    format!("{scheme}://{host}/webhook")
}

/// Produces the reply text for a classified message. Total: parameter
/// problems become guidance, upstream failures become apologies.
async fn process_request(state: &AppState, parsed: &ParsedIntent, message: &str) -> String {
    let chain_check = validators::validate_chain(parsed.param("chain").unwrap_or_default());
    let chain = chain_check
        .formatted
        .unwrap_or_else(|| "ethereum".to_string());

    match parsed.intent {
        Intent::Help => formatter::format_help(),

        Intent::WalletBalance => {
            let address = match valid_address(parsed.param("address")) {
                Some(address) => address,
                None => {
                    return formatter::format_error(
                        "Please provide a valid wallet address. Example: \"Check balance for 0x742d35Cc6634C0532925a3b844Bc9e7595f0bEb3\"",
                    )
                }
            };
            match state.nodit.get_wallet_balance(&address, &chain).await {
                Ok(data) => {
                    state
                        .intents
                        .render_response(&QueryResult::WalletBalance {
                            data,
                            address,
                            chain,
                        })
                        .await
                }
                Err(e) => {
                    error!(error = %e, "wallet balance lookup failed");
                    formatter::format_error(
                        "Unable to fetch wallet balance. Please try again later.",
                    )
                }
            }
        }

        Intent::TokenInfo => {
            let token = match parsed.param("token") {
                Some(token) if !token.is_empty() => token.to_string(),
                _ => {
                    return formatter::format_error(
                        "Please specify a token symbol or address. Example: \"What is USDC token?\"",
                    )
                }
            };
            let lookup = validators::validate_token(&token);
            if !lookup.result.is_valid {
                return formatter::format_error(&lookup.result.error.unwrap_or_default());
            }
            let token = lookup.result.formatted.unwrap_or(token);
            let fetched = match lookup.kind {
                Some(TokenKind::Address) => state.nodit.get_token_info(&token, &chain).await,
                _ => state.nodit.search_token(&token, &chain).await,
            };
            match fetched {
                Ok(data) => {
                    state
                        .intents
                        .render_response(&QueryResult::TokenInfo { data, chain })
                        .await
                }
                Err(e) => {
                    error!(error = %e, "token info lookup failed");
                    formatter::format_error(
                        "Unable to fetch token information. Please try again later.",
                    )
                }
            }
        }

        Intent::PriceQuery => {
            let token = match parsed.param("token") {
                Some(token) if !token.is_empty() => token.to_string(),
                _ => {
                    return formatter::format_error(
                        "Please specify which token price you want. Example: \"What's the price of ETH?\"",
                    )
                }
            };
            match fetch_price(state, &token, &chain).await {
                Ok(data) => {
                    state
                        .intents
                        .render_response(&QueryResult::TokenPrice { data, token, chain })
                        .await
                }
                Err(e) => {
                    error!(error = %e, "price lookup failed");
                    formatter::format_error("Unable to fetch token price. Please try again later.")
                }
            }
        }

        Intent::NftDetails => {
            let contract = valid_address(parsed.param("contractAddress"));
            let token_id = parsed
                .param("tokenId")
                .map(validators::validate_token_id)
                .filter(|check| check.is_valid)
                .and_then(|check| check.formatted);
            let (contract, token_id) = match (contract, token_id) {
                (Some(contract), Some(token_id)) => (contract, token_id),
                _ => {
                    return formatter::format_error(
                        "Please provide both the contract address and token ID. Example: \"Show NFT 0xBC4CA0EdA7647A8aB7C2061c2E118A18a936f13D #1234\"",
                    )
                }
            };
            match state.nodit.get_nft_details(&contract, &token_id, &chain).await {
                Ok(data) => {
                    state
                        .intents
                        .render_response(&QueryResult::NftDetails { data, chain })
                        .await
                }
                Err(e) => {
                    error!(error = %e, "nft lookup failed");
                    formatter::format_error("Unable to fetch NFT details. Please try again later.")
                }
            }
        }

        Intent::TransactionDetails => {
            let hash = parsed
                .param("hash")
                .map(validators::validate_transaction_hash)
                .filter(|check| check.is_valid)
                .and_then(|check| check.formatted);
            if hash.is_none() {
                return formatter::format_error(
                    "Please provide a transaction hash. Example: \"Show transaction 0x4e3a3754410177e6937ef1f84bba68ea139e8d1a2258c5f85db9f1cd715a1bdd\"",
                );
            }
            // The data provider has no transaction endpoint yet, so
            // this branch always apologizes.
            warn!(message, "transaction lookup requested but unsupported");
            formatter::format_error(
                "Unable to fetch transaction details. Please try again later.",
            )
        }
    }
}

fn valid_address(raw: Option<&str>) -> Option<String> {
    let check = validators::validate_address(raw?);
    if check.is_valid {
        check.formatted
    } else {
        None
    }
}

/// Price by address directly; a symbol goes through search first. A
/// searched token without an address still yields a price view from
/// its metadata.
async fn fetch_price(state: &AppState, token: &str, chain: &str) -> Result<TokenPrice> {
    let lookup = validators::validate_token(token);
    if !lookup.result.is_valid {
        return Err(AppError::BadRequest(
            lookup.result.error.unwrap_or_default(),
        ));
    }
    let token = lookup.result.formatted.as_deref().unwrap_or(token);

    match lookup.kind {
        Some(TokenKind::Address) => state.nodit.get_token_price(token, chain).await,
        _ => {
            let info = state.nodit.search_token(token, chain).await?;
            match &info.address {
                Some(address) => state.nodit.get_token_price(address, chain).await,
                None => Ok(TokenPrice {
                    symbol: info.symbol,
                    name: info.name,
                    price: info.price,
                    market_cap: info.market_cap,
                    ..Default::default()
                }),
            }
        }
    }
}
