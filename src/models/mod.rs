//! Wire-facing data types: parsed intents, the chain table, and typed
//! views over the provider payloads consumed by the formatter.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The classified purpose of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    WalletBalance,
    TokenInfo,
    NftDetails,
    PriceQuery,
    TransactionDetails,
    Help,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::WalletBalance => "wallet_balance",
            Intent::TokenInfo => "token_info",
            Intent::NftDetails => "nft_details",
            Intent::PriceQuery => "price_query",
            Intent::TransactionDetails => "transaction_details",
            Intent::Help => "help",
        }
    }

    /// Anything unrecognized lands on the help branch, matching the
    /// controller's default arm.
    pub fn parse(value: &str) -> Intent {
        match value {
            "wallet_balance" => Intent::WalletBalance,
            "token_info" => Intent::TokenInfo,
            "nft_details" => Intent::NftDetails,
            "price_query" => Intent::PriceQuery,
            "transaction_details" => Intent::TransactionDetails,
            _ => Intent::Help,
        }
    }
}

/// One inbound message classified and parameterized; consumed exactly
/// once by the webhook controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub intent: Intent,
    pub parameters: HashMap<String, String>,
    pub confidence: f64,
}

impl ParsedIntent {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

/// Protocol/network pair understood by the data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainConfig {
    pub protocol: &'static str,
    pub network: &'static str,
}

pub const ETHEREUM_MAINNET: ChainConfig = ChainConfig {
    protocol: "ethereum",
    network: "mainnet",
};

pub const POLYGON_MAINNET: ChainConfig = ChainConfig {
    protocol: "polygon",
    network: "mainnet",
};

/// Resolve a user-facing chain alias. An unrecognized alias silently
/// falls back to ethereum mainnet.
pub fn resolve_chain(alias: &str) -> ChainConfig {
    match alias.to_lowercase().trim() {
        "polygon" | "matic" => POLYGON_MAINNET,
        _ => ETHEREUM_MAINNET,
    }
}

mod lenient {
    //! The provider is loose about numeric fields: sometimes JSON
    //! numbers, sometimes numeric strings. Accept both.

    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    pub fn f64_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<NumberOrString>::deserialize(deserializer)?;
        Ok(match raw {
            Some(NumberOrString::Number(n)) => Some(n),
            Some(NumberOrString::String(s)) => s.trim().parse::<f64>().ok(),
            None => None,
        })
    }

    pub fn u64_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(f64_opt(deserializer)?.map(|n| n as u64))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHolding {
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub balance: Option<f64>,
}

/// Composed balance view: one native-balance call plus one token
/// holdings call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub balance: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub value_usd: Option<f64>,
    #[serde(default)]
    pub tokens: Vec<TokenHolding>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub market_cap: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub total_supply: Option<f64>,
    pub decimals: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NftAttribute {
    pub trait_type: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftDetails {
    pub name: Option<String>,
    pub token_id: Option<String>,
    pub collection: Option<String>,
    pub contract_address: Option<String>,
    pub owner: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub attributes: Vec<NftAttribute>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPrice {
    pub symbol: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub price_change_24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub volume_24h: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub market_cap: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
    pub hash: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::u64_opt")]
    pub block_number: Option<u64>,
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub value: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub gas_used: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub gas_price: Option<f64>,
    pub timestamp: Option<i64>,
}

/// A structured query result handed to a response renderer.
#[derive(Debug, Clone)]
pub enum QueryResult {
    WalletBalance {
        data: WalletBalance,
        address: String,
        chain: String,
    },
    TokenInfo {
        data: TokenInfo,
        chain: String,
    },
    NftDetails {
        data: NftDetails,
        chain: String,
    },
    TokenPrice {
        data: TokenPrice,
        token: String,
        chain: String,
    },
    Transaction {
        data: TransactionDetails,
        chain: String,
    },
}

impl QueryResult {
    pub fn intent(&self) -> Intent {
        match self {
            QueryResult::WalletBalance { .. } => Intent::WalletBalance,
            QueryResult::TokenInfo { .. } => Intent::TokenInfo,
            QueryResult::NftDetails { .. } => Intent::NftDetails,
            QueryResult::TokenPrice { .. } => Intent::PriceQuery,
            QueryResult::Transaction { .. } => Intent::TransactionDetails,
        }
    }

    /// JSON view of the payload, used when asking the LLM to write the
    /// reply.
    pub fn data_json(&self) -> serde_json::Value {
        match self {
            QueryResult::WalletBalance { data, .. } => serde_json::to_value(data),
            QueryResult::TokenInfo { data, .. } => serde_json::to_value(data),
            QueryResult::NftDetails { data, .. } => serde_json::to_value(data),
            QueryResult::TokenPrice { data, .. } => serde_json::to_value(data),
            QueryResult::Transaction { data, .. } => serde_json::to_value(data),
        }
        .unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_round_trips_through_strings() {
        for intent in [
            Intent::WalletBalance,
            Intent::TokenInfo,
            Intent::NftDetails,
            Intent::PriceQuery,
            Intent::TransactionDetails,
            Intent::Help,
        ] {
            assert_eq!(Intent::parse(intent.as_str()), intent);
        }
    }

    #[test]
    fn unknown_intent_defaults_to_help() {
        assert_eq!(Intent::parse("make_coffee"), Intent::Help);
    }

    #[test]
    fn chain_aliases_resolve_to_protocol_network() {
        assert_eq!(resolve_chain("polygon"), POLYGON_MAINNET);
        assert_eq!(resolve_chain("MATIC"), POLYGON_MAINNET);
        assert_eq!(resolve_chain("ethereum"), ETHEREUM_MAINNET);
        assert_eq!(resolve_chain("eth"), ETHEREUM_MAINNET);
        assert_eq!(resolve_chain("somethingelse"), ETHEREUM_MAINNET);
    }

    #[test]
    fn balance_accepts_string_or_number_fields() {
        let from_strings: WalletBalance =
            serde_json::from_value(serde_json::json!({
                "balance": "1.5000",
                "valueUsd": "4200.10",
                "tokens": [{"symbol": "USDC", "balance": "250"}]
            }))
            .unwrap();
        assert_eq!(from_strings.balance, Some(1.5));
        assert_eq!(from_strings.value_usd, Some(4200.10));
        assert_eq!(from_strings.tokens[0].balance, Some(250.0));

        let from_numbers: WalletBalance =
            serde_json::from_value(serde_json::json!({"balance": 2.25})).unwrap();
        assert_eq!(from_numbers.balance, Some(2.25));
        assert!(from_numbers.value_usd.is_none());
    }

    #[test]
    fn query_result_reports_its_intent() {
        let result = QueryResult::TokenPrice {
            data: TokenPrice::default(),
            token: "ETH".to_string(),
            chain: "ethereum".to_string(),
        };
        assert_eq!(result.intent(), Intent::PriceQuery);
        assert!(result.data_json().is_object());
    }
}
