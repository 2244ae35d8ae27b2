//! Regex extraction and keyword intent detection over free-form chat
//! text. Everything here is pure and deterministic; `parse_message`
//! never fails.

use crate::models::Intent;
use once_cell::sync::Lazy;
use regex::Regex;

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"0x[a-fA-F0-9]{40}").unwrap());
static TX_HASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"0x[a-fA-F0-9]{64}").unwrap());
static TOKEN_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\d+)").unwrap());
static SYMBOL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Z]{2,6})\b").unwrap());
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+(\.\d+)?\b").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SPECIAL_CHARS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s0-9#.+\-]").unwrap());

/// Keyword table scanned in order; the first intent with any matching
/// keyword wins regardless of where the keyword sits in the text.
const INTENT_KEYWORDS: [(Intent, &[&str]); 6] = [
    (
        Intent::WalletBalance,
        &["balance", "wallet", "funds", "money", "eth balance", "how much"],
    ),
    (
        Intent::TokenInfo,
        &["token info", "what is", "tell me about", "information about", "details about"],
    ),
    (
        Intent::PriceQuery,
        &["price", "cost", "value", "worth", "how much is", "current price"],
    ),
    (
        Intent::NftDetails,
        &["nft", "non-fungible", "collectible", "art piece", "nft details"],
    ),
    (
        Intent::TransactionDetails,
        &["transaction", "tx", "transfer", "send", "receipt", "tx details"],
    ),
    (
        Intent::Help,
        &["help", "commands", "what can you do", "how to use", "instructions"],
    ),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage {
    pub original: String,
    pub cleaned: String,
    pub intent: Intent,
    pub addresses: Vec<String>,
    pub transaction_hashes: Vec<String>,
    pub token_ids: Vec<String>,
    pub token_symbols: Vec<String>,
    pub blockchain: String,
    pub numbers: Vec<String>,
}

/// All `0x` + 40-hex substrings, in order of appearance, duplicates
/// preserved.
pub fn extract_addresses(message: &str) -> Vec<String> {
    ADDRESS_RE
        .find_iter(message)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// All `0x` + 64-hex substrings.
pub fn extract_transaction_hashes(message: &str) -> Vec<String> {
    TX_HASH_RE
        .find_iter(message)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Digit groups following a `#`.
pub fn extract_token_ids(message: &str) -> Vec<String> {
    TOKEN_ID_RE
        .captures_iter(message)
        .map(|c| c[1].to_string())
        .collect()
}

/// Uppercase runs of 2-6 letters bounded by word edges; candidate
/// token symbols.
pub fn extract_token_symbols(message: &str) -> Vec<String> {
    SYMBOL_RE
        .captures_iter(message)
        .map(|c| c[1].to_string())
        .collect()
}

pub fn extract_numbers(message: &str) -> Vec<String> {
    NUMBER_RE
        .find_iter(message)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Case-insensitive chain mention; ethereum when nothing matches.
pub fn detect_blockchain(message: &str) -> &'static str {
    let lowercase = message.to_lowercase();
    if lowercase.contains("polygon") || lowercase.contains("matic") {
        "polygon"
    } else if lowercase.contains("ethereum") || lowercase.contains("eth") {
        "ethereum"
    } else {
        "ethereum"
    }
}

/// Collapse whitespace and strip special characters except `# . + -`.
pub fn clean_message(message: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(message.trim(), " ");
    SPECIAL_CHARS_RE.replace_all(&collapsed, " ").trim().to_string()
}

/// First intent in table order whose keyword list has a substring
/// match; help when nothing matches.
pub fn detect_intent(message: &str) -> Intent {
    let lowercase = message.to_lowercase();
    for (intent, keywords) in INTENT_KEYWORDS {
        if keywords.iter().any(|keyword| lowercase.contains(keyword)) {
            return intent;
        }
    }
    Intent::Help
}

/// Compose all extractors into one record. Total: any input yields a
/// usable record.
pub fn parse_message(message: &str) -> ParsedMessage {
    let cleaned = clean_message(message);
    let parsed = ParsedMessage {
        original: message.to_string(),
        cleaned: cleaned.clone(),
        intent: detect_intent(&cleaned),
        addresses: extract_addresses(message),
        transaction_hashes: extract_transaction_hashes(message),
        token_ids: extract_token_ids(message),
        token_symbols: extract_token_symbols(&cleaned),
        blockchain: detect_blockchain(&cleaned).to_string(),
        numbers: extract_numbers(&cleaned),
    };
    tracing::debug!(intent = parsed.intent.as_str(), "Parsed message");
    parsed
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Intent-conditional required-field checks. NFT queries missing
/// fields produce a warning rather than an error.
pub fn validate_parsed_data(parsed: &ParsedMessage) -> ValidationReport {
    let mut report = ValidationReport {
        is_valid: true,
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    for address in &parsed.addresses {
        let check = crate::validators::validate_address(address);
        if !check.is_valid {
            report.errors.push(format!("Invalid address format: {address}"));
            report.is_valid = false;
        }
    }
    for hash in &parsed.transaction_hashes {
        let check = crate::validators::validate_transaction_hash(hash);
        if !check.is_valid {
            report
                .errors
                .push(format!("Invalid transaction hash format: {hash}"));
            report.is_valid = false;
        }
    }

    match parsed.intent {
        Intent::WalletBalance => {
            if parsed.addresses.is_empty() {
                report
                    .errors
                    .push("Wallet address required for balance query".to_string());
                report.is_valid = false;
            }
        }
        Intent::NftDetails => {
            if parsed.addresses.is_empty() || parsed.token_ids.is_empty() {
                report
                    .warnings
                    .push("NFT queries require both contract address and token ID".to_string());
            }
        }
        Intent::TransactionDetails => {
            if parsed.transaction_hashes.is_empty() {
                report
                    .errors
                    .push("Transaction hash required for transaction details".to_string());
                report.is_valid = false;
            }
        }
        _ => {}
    }

    report
}
