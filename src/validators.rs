//! Shape checks for user-supplied values. Every function returns the
//! same [`ValidationResult`] contract: either `is_valid` with a
//! normalized `formatted` value, or an `error` describing the problem.

use once_cell::sync::Lazy;
use regex::Regex;

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").unwrap());
static TX_HASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{64}$").unwrap());
static TOKEN_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());
static SYMBOL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]{1,10}$").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").unwrap());

pub const SUPPORTED_CHAINS: [&str; 2] = ["ethereum", "polygon"];

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
    pub formatted: Option<String>,
}

impl ValidationResult {
    fn ok(formatted: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            error: None,
            formatted: Some(formatted.into()),
        }
    }

    fn err(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
            formatted: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Address,
    Symbol,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenValidation {
    pub result: ValidationResult,
    pub kind: Option<TokenKind>,
}

/// Ethereum-style address: 0x followed by exactly 40 hex digits.
pub fn validate_address(address: &str) -> ValidationResult {
    let clean = address.trim();
    if clean.is_empty() {
        return ValidationResult::err("Address is required");
    }
    if !ADDRESS_RE.is_match(clean) {
        return ValidationResult::err(
            "Invalid address format. Must be 42 characters starting with 0x",
        );
    }
    ValidationResult::ok(clean.to_lowercase())
}

/// Transaction hash: 0x followed by exactly 64 hex digits.
pub fn validate_transaction_hash(hash: &str) -> ValidationResult {
    let clean = hash.trim();
    if clean.is_empty() {
        return ValidationResult::err("Transaction hash is required");
    }
    if !TX_HASH_RE.is_match(clean) {
        return ValidationResult::err(
            "Invalid transaction hash format. Must be 66 characters starting with 0x",
        );
    }
    ValidationResult::ok(clean.to_lowercase())
}

/// Chain name with alias handling. An empty chain is valid and
/// defaults to ethereum.
pub fn validate_chain(chain: &str) -> ValidationResult {
    let normalized = chain.to_lowercase().trim().to_string();
    if normalized.is_empty() {
        return ValidationResult::ok("ethereum");
    }

    let resolved = match normalized.as_str() {
        "eth" => "ethereum",
        "matic" | "poly" => "polygon",
        other => other,
    };

    if !SUPPORTED_CHAINS.contains(&resolved) {
        return ValidationResult::err(format!(
            "Unsupported chain: {chain}. Supported chains: {}",
            SUPPORTED_CHAINS.join(", ")
        ));
    }
    ValidationResult::ok(resolved)
}

/// NFT token id: a non-negative decimal integer.
pub fn validate_token_id(token_id: &str) -> ValidationResult {
    let clean = token_id.trim();
    if clean.is_empty() {
        return ValidationResult::err("Token ID is required");
    }
    if !TOKEN_ID_RE.is_match(clean) {
        return ValidationResult::err("Token ID must be a positive integer");
    }
    if clean.parse::<u128>().is_err() {
        return ValidationResult::err("Token ID is too large");
    }
    ValidationResult::ok(clean)
}

/// Token reference: either a contract address or a 1-10 letter symbol.
pub fn validate_token(token: &str) -> TokenValidation {
    let clean = token.trim();
    if clean.is_empty() {
        return TokenValidation {
            result: ValidationResult::err("Token symbol or address is required"),
            kind: None,
        };
    }

    if clean.starts_with("0x") {
        let address_check = validate_address(clean);
        let kind = address_check.is_valid.then_some(TokenKind::Address);
        return TokenValidation {
            result: address_check,
            kind,
        };
    }

    if !SYMBOL_RE.is_match(clean) {
        return TokenValidation {
            result: ValidationResult::err("Token symbol must be 1-10 letters only"),
            kind: None,
        };
    }
    TokenValidation {
        result: ValidationResult::ok(clean.to_uppercase()),
        kind: Some(TokenKind::Symbol),
    }
}

/// International phone number, with the WhatsApp channel prefix and a
/// missing leading `+` repaired before checking.
pub fn validate_phone_number(phone_number: &str) -> ValidationResult {
    let clean = phone_number.replace("whatsapp:", "");
    let clean = clean.trim();
    if clean.is_empty() {
        return ValidationResult::err("Phone number is required");
    }

    let normalized = if clean.starts_with('+') {
        clean.to_string()
    } else {
        format!("+{clean}")
    };

    if !PHONE_RE.is_match(&normalized) {
        return ValidationResult::err(
            "Invalid phone number format. Must be in international format (+1234567890)",
        );
    }
    ValidationResult::ok(normalized)
}

pub fn validate_api_key(api_key: &str) -> ValidationResult {
    let clean = api_key.trim();
    if clean.is_empty() {
        return ValidationResult::err("API key is required");
    }
    if clean.len() < 10 {
        return ValidationResult::err("API key is too short");
    }
    if clean.len() > 200 {
        return ValidationResult::err("API key is too long");
    }
    ValidationResult::ok(clean)
}

pub fn validate_message(message: &str) -> ValidationResult {
    let clean = message.trim();
    if clean.is_empty() {
        return ValidationResult::err("Message cannot be empty");
    }
    if clean.chars().count() > crate::constants::MAX_INBOUND_MESSAGE_CHARS {
        return ValidationResult::err("Message is too long (max 4000 characters)");
    }
    ValidationResult::ok(clean)
}

#[derive(Debug, Clone, Copy)]
pub struct NumberOptions {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub allow_decimals: bool,
    pub name: &'static str,
}

impl Default for NumberOptions {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            allow_decimals: true,
            name: "Number",
        }
    }
}

pub fn validate_number(value: f64, options: &NumberOptions) -> ValidationResult {
    if value.is_nan() || value.is_infinite() {
        return ValidationResult::err(format!("{} must be a valid number", options.name));
    }
    if !options.allow_decimals && value.fract() != 0.0 {
        return ValidationResult::err(format!("{} must be an integer", options.name));
    }
    if let Some(min) = options.min {
        if value < min {
            return ValidationResult::err(format!("{} must be at least {min}", options.name));
        }
    }
    if let Some(max) = options.max {
        if value > max {
            return ValidationResult::err(format!("{} must be at most {max}", options.name));
        }
    }
    ValidationResult::ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_address() {
        let result = validate_address("0x742d35Cc4Bf86C6D8Ba9352532Fd1e42a5D9e69B");
        assert!(result.is_valid);
        assert_eq!(
            result.formatted.as_deref(),
            Some("0x742d35cc4bf86c6d8ba9352532fd1e42a5d9e69b")
        );
        assert!(result.error.is_none());
    }

    #[test]
    fn rejects_wrong_length_address() {
        let result = validate_address("0x742d35Cc4Bf86C6");
        assert!(!result.is_valid);
        assert!(result.error.is_some());
        assert!(result.formatted.is_none());
    }

    #[test]
    fn rejects_bad_charset_address() {
        let result = validate_address(&format!("0x{}", "g".repeat(40)));
        assert!(!result.is_valid);
    }

    #[test]
    fn accepts_transaction_hash() {
        let hash = format!("0x{}", "Ab".repeat(32));
        let result = validate_transaction_hash(&hash);
        assert!(result.is_valid);
        assert_eq!(result.formatted, Some(hash.to_lowercase()));
    }

    #[test]
    fn rejects_address_as_transaction_hash() {
        let result = validate_transaction_hash("0x742d35Cc4Bf86C6D8Ba9352532Fd1e42a5D9e69B");
        assert!(!result.is_valid);
    }

    #[test]
    fn chain_aliases_resolve() {
        assert_eq!(validate_chain("eth").formatted.as_deref(), Some("ethereum"));
        assert_eq!(
            validate_chain("MATIC").formatted.as_deref(),
            Some("polygon")
        );
        assert_eq!(validate_chain("poly").formatted.as_deref(), Some("polygon"));
    }

    #[test]
    fn empty_chain_defaults_to_ethereum() {
        let result = validate_chain("");
        assert!(result.is_valid);
        assert_eq!(result.formatted.as_deref(), Some("ethereum"));
    }

    #[test]
    fn unsupported_chain_rejected() {
        let result = validate_chain("solana");
        assert!(!result.is_valid);
        assert!(result.error.unwrap().contains("Unsupported chain"));
    }

    #[test]
    fn token_id_must_be_digits() {
        assert!(validate_token_id("1234").is_valid);
        assert!(!validate_token_id("-5").is_valid);
        assert!(!validate_token_id("12a").is_valid);
        assert!(!validate_token_id(&"9".repeat(60)).is_valid);
    }

    #[test]
    fn token_address_and_symbol_kinds() {
        let address = validate_token("0x742d35Cc4Bf86C6D8Ba9352532Fd1e42a5D9e69B");
        assert_eq!(address.kind, Some(TokenKind::Address));

        let symbol = validate_token("usdc");
        assert_eq!(symbol.kind, Some(TokenKind::Symbol));
        assert_eq!(symbol.result.formatted.as_deref(), Some("USDC"));

        let bad = validate_token("NOT_A_TOKEN_123");
        assert!(!bad.result.is_valid);
        assert_eq!(bad.kind, None);
    }

    #[test]
    fn phone_number_strips_whatsapp_prefix() {
        let result = validate_phone_number("whatsapp:+14155238886");
        assert!(result.is_valid);
        assert_eq!(result.formatted.as_deref(), Some("+14155238886"));
    }

    #[test]
    fn phone_number_gains_plus_prefix() {
        let result = validate_phone_number("14155238886");
        assert_eq!(result.formatted.as_deref(), Some("+14155238886"));
    }

    #[test]
    fn phone_number_rejects_garbage() {
        assert!(!validate_phone_number("+0123").is_valid);
        assert!(!validate_phone_number("hello").is_valid);
    }

    #[test]
    fn api_key_length_bounds() {
        assert!(!validate_api_key("short").is_valid);
        assert!(validate_api_key(&"k".repeat(32)).is_valid);
        assert!(!validate_api_key(&"k".repeat(201)).is_valid);
    }

    #[test]
    fn message_bounds() {
        assert!(!validate_message("   ").is_valid);
        assert!(validate_message("hello").is_valid);
        assert!(!validate_message(&"x".repeat(4001)).is_valid);
    }

    #[test]
    fn number_options_enforced() {
        let options = NumberOptions {
            min: Some(1.0),
            max: Some(65535.0),
            allow_decimals: false,
            name: "PORT",
        };
        assert!(validate_number(3000.0, &options).is_valid);
        assert!(!validate_number(0.0, &options).is_valid);
        assert!(!validate_number(70000.0, &options).is_valid);
        assert!(!validate_number(80.5, &options).is_valid);
    }
}
