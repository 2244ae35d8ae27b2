//! Client for the Nodit Web3 Data API. Read-only queries, one attempt
//! per call; callers translate failures into user-facing apologies.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::constants::{HTTP_CONNECT_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::models::{
    resolve_chain, NftDetails, TokenHolding, TokenInfo, TokenPrice, WalletBalance,
};

#[derive(Clone)]
pub struct NoditClient {
    base_url: String,
    api_key: String,
    client: Client,
}

#[derive(Deserialize, Default)]
struct TokenListResponse {
    #[serde(default)]
    items: Vec<TokenHolding>,
}

#[derive(Deserialize, Default)]
struct TokenSearchResponse {
    #[serde(default)]
    items: Vec<TokenInfo>,
}

impl NoditClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "nodit request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ExternalApi(format!(
                "nodit returned {status} for {path}"
            )));
        }

        Ok(response.json::<T>().await?)
    }

    /// Native balance plus ERC-20 holdings, composed from two calls.
    pub async fn get_wallet_balance(&self, address: &str, chain: &str) -> Result<WalletBalance> {
        let config = resolve_chain(chain);
        let prefix = format!("/v1/{}/{}", config.protocol, config.network);

        let mut balance: WalletBalance = self
            .get(&format!("{prefix}/accounts/{address}/balance"), &[])
            .await?;
        let tokens: TokenListResponse = self
            .get(&format!("{prefix}/accounts/{address}/tokens"), &[])
            .await?;

        balance.tokens = tokens.items;
        Ok(balance)
    }

    /// Token metadata by contract address.
    pub async fn get_token_info(&self, address: &str, chain: &str) -> Result<TokenInfo> {
        let config = resolve_chain(chain);
        self.get(
            &format!(
                "/v1/{}/{}/tokens/{address}",
                config.protocol, config.network
            ),
            &[],
        )
        .await
    }

    /// Current price and 24h stats by contract address.
    pub async fn get_token_price(&self, address: &str, chain: &str) -> Result<TokenPrice> {
        let config = resolve_chain(chain);
        self.get(
            &format!(
                "/v1/{}/{}/tokens/{address}/price",
                config.protocol, config.network
            ),
            &[],
        )
        .await
    }

    pub async fn get_nft_details(
        &self,
        contract_address: &str,
        token_id: &str,
        chain: &str,
    ) -> Result<NftDetails> {
        let config = resolve_chain(chain);
        self.get(
            &format!(
                "/v1/{}/{}/nfts/{contract_address}/{token_id}",
                config.protocol, config.network
            ),
            &[],
        )
        .await
    }

    /// Symbol lookup. Returns the best match or an error when the
    /// symbol is unknown to the provider.
    pub async fn search_token(&self, query: &str, chain: &str) -> Result<TokenInfo> {
        let config = resolve_chain(chain);
        let results: TokenSearchResponse = self
            .get(
                &format!("/v1/{}/{}/tokens/search", config.protocol, config.network),
                &[("q", query)],
            )
            .await?;
        results
            .items
            .into_iter()
            .next()
            .ok_or_else(|| AppError::ExternalApi(format!("no token found for '{query}'")))
    }
}
