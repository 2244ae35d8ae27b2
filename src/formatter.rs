//! WhatsApp reply templates, one per intent. Total functions over the
//! typed provider payloads: a missing field drops its line instead of
//! failing the message.

use crate::models::{NftDetails, TokenInfo, TokenPrice, TransactionDetails, WalletBalance};
use chrono::Utc;

pub fn format_wallet_balance(data: &WalletBalance, address: &str, chain: &str) -> String {
    let mut response = format!("💰 *Wallet Balance* {}\n\n", chain_emoji(chain));
    response += &format!("📍 Address: `{}`\n", shorten_address(address));
    response += &format!("⛓️ Chain: {}\n\n", capitalize_first(chain));

    if let Some(balance) = data.balance {
        response += &format!("💎 Balance: *{:.4} {}*\n", balance, chain_symbol(chain));
    }
    if let Some(value_usd) = data.value_usd {
        response += &format!("💵 USD Value: *${}*\n", format_number(value_usd, 2));
    }

    let named_tokens: Vec<_> = data
        .tokens
        .iter()
        .filter(|t| t.symbol.is_some())
        .take(3)
        .collect();
    if !named_tokens.is_empty() {
        response += "\n🪙 *Top Tokens:*\n";
        for token in named_tokens {
            response += &format!(
                "• {}: {:.2}\n",
                token.symbol.as_deref().unwrap_or_default(),
                token.balance.unwrap_or(0.0)
            );
        }
    }

    response
}

pub fn format_token_info(data: &TokenInfo, chain: &str) -> String {
    let mut response = format!("🪙 *Token Information* {}\n\n", chain_emoji(chain));

    if let Some(name) = &data.name {
        response += &format!("📛 Name: *{name}*\n");
    }
    if let Some(symbol) = &data.symbol {
        response += &format!("🏷️ Symbol: *{symbol}*\n");
    }
    if let Some(address) = &data.address {
        response += &format!("📍 Address: `{}`\n", shorten_address(address));
    }
    response += &format!("⛓️ Chain: {}\n\n", capitalize_first(chain));

    if let Some(price) = data.price {
        response += &format!("💰 Price: *${}*\n", format_number(price, 6));
    }
    if let Some(market_cap) = data.market_cap {
        response += &format!("📊 Market Cap: *${}*\n", format_large_number(market_cap));
    }
    if let Some(supply) = data.total_supply {
        response += &format!("🔢 Total Supply: *{}*\n", format_large_number(supply));
    }
    if let Some(decimals) = data.decimals {
        response += &format!("🔸 Decimals: *{decimals}*\n");
    }

    response
}

pub fn format_nft_details(data: &NftDetails, chain: &str) -> String {
    let mut response = format!("🖼️ *NFT Details* {}\n\n", chain_emoji(chain));

    if let Some(name) = &data.name {
        response += &format!("🎨 Name: *{name}*\n");
    }
    if let Some(token_id) = &data.token_id {
        response += &format!("🆔 Token ID: *{token_id}*\n");
    }
    if let Some(collection) = &data.collection {
        response += &format!("📚 Collection: *{collection}*\n");
    }
    if let Some(contract) = &data.contract_address {
        response += &format!("📍 Contract: `{}`\n", shorten_address(contract));
    }
    response += &format!("⛓️ Chain: {}\n\n", capitalize_first(chain));

    if let Some(owner) = &data.owner {
        response += &format!("👤 Owner: `{}`\n", shorten_address(owner));
    }
    if let Some(description) = &data.description {
        let truncated: String = if description.chars().count() > 100 {
            format!("{}...", description.chars().take(100).collect::<String>())
        } else {
            description.clone()
        };
        response += &format!("📝 Description: {truncated}\n");
    }

    if !data.attributes.is_empty() {
        response += "\n✨ *Attributes:*\n";
        for attr in data.attributes.iter().take(3) {
            let value = match &attr.value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            response += &format!("• {}: {}\n", attr.trait_type, value);
        }
    }

    response
}

pub fn format_price_query(data: &TokenPrice, token: &str, chain: &str) -> String {
    let mut response = format!("💰 *Token Price* {}\n\n", chain_emoji(chain));

    let token_name = data
        .symbol
        .as_deref()
        .or(data.name.as_deref())
        .unwrap_or(token);
    response += &format!("🪙 Token: *{token_name}*\n");
    response += &format!("⛓️ Chain: {}\n\n", capitalize_first(chain));

    if let Some(price) = data.price {
        response += &format!("💵 Current Price: *${}*\n", format_number(price, 6));
    }
    if let Some(change) = data.price_change_24h {
        let emoji = if change >= 0.0 { "📈" } else { "📉" };
        let sign = if change >= 0.0 { "+" } else { "" };
        response += &format!("{emoji} 24h Change: *{sign}{change:.2}%*\n");
    }
    if let Some(volume) = data.volume_24h {
        response += &format!("📊 24h Volume: *${}*\n", format_large_number(volume));
    }
    if let Some(market_cap) = data.market_cap {
        response += &format!("🏦 Market Cap: *${}*\n", format_large_number(market_cap));
    }

    response += &format!("\n🕐 Last Updated: {}", Utc::now().format("%H:%M:%S UTC"));

    response
}

pub fn format_transaction_details(data: &TransactionDetails, chain: &str) -> String {
    let mut response = format!("🔍 *Transaction Details* {}\n\n", chain_emoji(chain));

    if let Some(hash) = &data.hash {
        response += &format!("🔗 Hash: `{}`\n", shorten_hash(hash));
    }
    response += &format!("⛓️ Chain: {}\n", capitalize_first(chain));

    if let Some(status) = &data.status {
        let emoji = if status == "success" { "✅" } else { "❌" };
        response += &format!("{emoji} Status: *{}*\n", capitalize_first(status));
    }
    if let Some(block) = data.block_number {
        response += &format!("📦 Block: *{}*\n", format_number(block as f64, 0));
    }

    response += "\n";

    if let Some(from) = &data.from {
        response += &format!("📤 From: `{}`\n", shorten_address(from));
    }
    if let Some(to) = &data.to {
        response += &format!("📥 To: `{}`\n", shorten_address(to));
    }
    if let Some(value) = data.value {
        response += &format!("💎 Value: *{:.4} {}*\n", value, chain_symbol(chain));
    }
    if let (Some(gas_used), Some(gas_price)) = (data.gas_used, data.gas_price) {
        let gas_fee = gas_used * gas_price / 1e18;
        response += &format!("⛽ Gas Fee: *{:.6} {}*\n", gas_fee, chain_symbol(chain));
    }
    if let Some(timestamp) = data.timestamp {
        if let Some(time) = chrono::DateTime::from_timestamp(timestamp, 0) {
            response += &format!("\n🕐 Time: {}", time.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }

    response
}

pub fn format_error(message: &str) -> String {
    format!("❌ *Error*\n\n{message}\n\nTry sending \"help\" for available commands! 🆘")
}

pub fn format_help() -> String {
    r#"🪙 *WallyBot - Your Web3 Assistant*

I can help you with:

💰 *Wallet Balance*
"Check balance for 0x742d35..."

🪙 *Token Information*
"What is USDC token?"
"Token info for 0xA0b86..."

🖼️ *NFT Details*
"Show NFT details for 0x123...def #1234"

💵 *Token Prices*
"What's the price of ETH?"

🔍 *Transaction Details*
"Show transaction 0xabc...123"

📊 *Supported Chains*
• Ethereum 🔷
• Polygon 🟣

Just send me a message in natural language! 🚀"#
        .to_string()
}

/// `0x1234...abcd`: first 6 characters, last 4.
pub fn shorten_address(address: &str) -> String {
    shorten(address, 6, 4)
}

/// `0x123456...abcdef`: first 8 characters, last 6.
pub fn shorten_hash(hash: &str) -> String {
    shorten(hash, 8, 6)
}

// Counts chars, not bytes: provider strings are not guaranteed ASCII
// and byte slicing would panic on a multibyte boundary.
fn shorten(value: &str, head: usize, tail: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < head + tail {
        return value.to_string();
    }
    let front: String = chars[..head].iter().collect();
    let back: String = chars[chars.len() - tail..].iter().collect();
    format!("{front}...{back}")
}

pub fn chain_emoji(chain: &str) -> &'static str {
    match chain.to_lowercase().as_str() {
        "ethereum" => "🔷",
        "polygon" => "🟣",
        "bitcoin" => "🟠",
        "binance" => "🟡",
        _ => "⛓️",
    }
}

pub fn chain_symbol(chain: &str) -> &'static str {
    match chain.to_lowercase().as_str() {
        "polygon" => "MATIC",
        "bitcoin" => "BTC",
        "binance" => "BNB",
        _ => "ETH",
    }
}

pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Thousands separators with a fixed number of decimals.
pub fn format_number(value: f64, decimals: usize) -> String {
    let formatted = format!("{value:.decimals$}");
    let (integer_part, fraction_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let (sign, digits) = match integer_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", integer_part),
    };

    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match fraction_part {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}

/// K/M/B suffixes at 1e3/1e6/1e9 with two decimals.
pub fn format_large_number(value: f64) -> String {
    if value >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else if value >= 1e3 {
        format!("{:.2}K", value / 1e3)
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NftAttribute, TokenHolding};

    const ADDRESS: &str = "0x742d35Cc4Bf86C6D8Ba9352532Fd1e42a5D9e69B";

    fn sample_balance() -> WalletBalance {
        WalletBalance {
            balance: Some(1.52341),
            value_usd: Some(4210.5),
            tokens: vec![
                TokenHolding {
                    symbol: Some("USDC".to_string()),
                    balance: Some(250.0),
                },
                TokenHolding {
                    symbol: Some("WETH".to_string()),
                    balance: Some(0.5),
                },
            ],
        }
    }

    #[test]
    fn balance_includes_shortened_address_and_tokens() {
        let text = format_wallet_balance(&sample_balance(), ADDRESS, "ethereum");
        assert!(text.contains("0x742d...e69B"));
        assert!(text.contains("1.5234 ETH"));
        assert!(text.contains("4,210.50"));
        assert!(text.contains("USDC: 250.00"));
        assert!(text.contains("Ethereum"));
    }

    #[test]
    fn balance_formatting_is_idempotent() {
        let data = sample_balance();
        let first = format_wallet_balance(&data, ADDRESS, "polygon");
        let second = format_wallet_balance(&data, ADDRESS, "polygon");
        assert_eq!(first, second);
    }

    #[test]
    fn balance_omits_missing_fields() {
        let text = format_wallet_balance(&WalletBalance::default(), ADDRESS, "ethereum");
        assert!(!text.contains("Balance:"));
        assert!(!text.contains("USD Value"));
        assert!(!text.contains("Top Tokens"));
    }

    #[test]
    fn token_info_lists_present_fields_only() {
        let data = TokenInfo {
            name: Some("USD Coin".to_string()),
            symbol: Some("USDC".to_string()),
            address: Some(ADDRESS.to_string()),
            price: Some(1.0),
            market_cap: Some(32_500_000_000.0),
            total_supply: None,
            decimals: Some(6),
        };
        let text = format_token_info(&data, "ethereum");
        assert!(text.contains("USD Coin"));
        assert!(text.contains("$32.50B"));
        assert!(text.contains("Decimals: *6*"));
        assert!(!text.contains("Total Supply"));
    }

    #[test]
    fn nft_truncates_description_and_caps_attributes() {
        let data = NftDetails {
            name: Some("Cool Cat #1".to_string()),
            token_id: Some("1".to_string()),
            collection: Some("Cool Cats".to_string()),
            contract_address: Some(ADDRESS.to_string()),
            owner: Some(ADDRESS.to_string()),
            description: Some("d".repeat(150)),
            attributes: (0..5)
                .map(|i| NftAttribute {
                    trait_type: format!("trait{i}"),
                    value: serde_json::json!("v"),
                })
                .collect(),
        };
        let text = format_nft_details(&data, "polygon");
        assert!(text.contains(&format!("{}...", "d".repeat(100))));
        assert!(text.contains("trait2"));
        assert!(!text.contains("trait3"));
        assert!(text.contains("🟣"));
    }

    #[test]
    fn price_shows_change_direction() {
        let up = TokenPrice {
            symbol: Some("ETH".to_string()),
            price: Some(2450.12),
            price_change_24h: Some(3.2),
            ..Default::default()
        };
        let text = format_price_query(&up, "ETH", "ethereum");
        assert!(text.contains("📈 24h Change: *+3.20%*"));

        let down = TokenPrice {
            price_change_24h: Some(-1.5),
            ..Default::default()
        };
        let text = format_price_query(&down, "ETH", "ethereum");
        assert!(text.contains("📉 24h Change: *-1.50%*"));
    }

    #[test]
    fn transaction_computes_gas_fee() {
        let data = TransactionDetails {
            hash: Some(format!("0x{}", "ab".repeat(32))),
            status: Some("success".to_string()),
            block_number: Some(19_000_000),
            from: Some(ADDRESS.to_string()),
            to: Some(ADDRESS.to_string()),
            value: Some(0.25),
            gas_used: Some(21_000.0),
            gas_price: Some(30e9),
            timestamp: Some(1_700_000_000),
        };
        let text = format_transaction_details(&data, "ethereum");
        assert!(text.contains("✅ Status: *Success*"));
        assert!(text.contains("19,000,000"));
        assert!(text.contains("0.000630 ETH"));
        assert!(text.contains("0xab"));
    }

    #[test]
    fn help_lists_all_capability_categories() {
        let help = format_help();
        assert!(help.contains("WallyBot"));
        for category in [
            "Wallet Balance",
            "Token Information",
            "NFT Details",
            "Token Prices",
            "Transaction Details",
        ] {
            assert!(help.contains(category), "missing category {category}");
        }
    }

    #[test]
    fn shorteners_keep_small_inputs() {
        assert_eq!(shorten_address("0x123"), "0x123");
        assert_eq!(shorten_address(ADDRESS), "0x742d...e69B");
        let hash = format!("0x{}", "ab".repeat(32));
        assert_eq!(shorten_hash(&hash), "0xababab...ababab");
    }

    #[test]
    fn shorteners_count_chars_not_bytes() {
        assert_eq!(shorten_address("0x123é6789012345"), "0x123é...2345");
        assert_eq!(shorten_hash("0xé23456789012345"), "0xé23456...012345");
        assert_eq!(shorten_address("éééé"), "éééé");
    }

    #[test]
    fn nft_with_multibyte_owner_still_renders() {
        let data = NftDetails {
            owner: Some("0x123é678901234567".to_string()),
            contract_address: Some("0xé2345678901234567".to_string()),
            ..Default::default()
        };
        let text = format_nft_details(&data, "ethereum");
        assert!(text.contains("0x123é...4567"));
        assert!(text.contains("0xé234...4567"));
    }

    #[test]
    fn transaction_with_multibyte_parties_still_renders() {
        let data = TransactionDetails {
            hash: Some("0xαβγδ4567890123456789".to_string()),
            from: Some("0x9876é43210987654321".to_string()),
            ..Default::default()
        };
        let text = format_transaction_details(&data, "ethereum");
        assert!(text.contains("0xαβγδ45...456789"));
        assert!(text.contains("0x9876...4321"));
    }

    #[test]
    fn number_grouping() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(999.0, 0), "999");
        assert_eq!(format_number(-1000.0, 0), "-1,000");
    }

    #[test]
    fn large_number_suffixes() {
        assert_eq!(format_large_number(950.0), "950.00");
        assert_eq!(format_large_number(1_500.0), "1.50K");
        assert_eq!(format_large_number(2_500_000.0), "2.50M");
        assert_eq!(format_large_number(7_100_000_000.0), "7.10B");
    }

    #[test]
    fn error_template_mentions_help() {
        let text = format_error("Unable to fetch wallet balance.");
        assert!(text.starts_with("❌ *Error*"));
        assert!(text.contains("help"));
    }
}
