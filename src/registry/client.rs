//! HTTP chain-registry client with an in-memory cache

use crate::error::{RelayError, RelayResult};
use crate::registry::types::{AssetList, ChainInfo, Validator};
use crate::util::check_cancelled;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Registry lookups against a chain registry and a validator registry
#[async_trait]
pub trait ChainRegistryClient: Send + Sync {
    /// All chain names the registry knows about
    async fn all_chain_names(&self, ctx: &CancellationToken) -> RelayResult<Vec<String>>;

    /// The registry document for one chain
    async fn chain_info(&self, ctx: &CancellationToken, chain_name: &str)
        -> RelayResult<ChainInfo>;

    /// The asset list for one chain
    async fn asset_list(&self, ctx: &CancellationToken, chain_name: &str)
        -> RelayResult<AssetList>;

    /// Resolve a chain id to the registry name of its chain.
    ///
    /// Passing `refresh_cache` drops everything learned so far and starts
    /// from a clean registry fetch.
    async fn chain_name_for_chain_id(
        &self,
        ctx: &CancellationToken,
        target_chain_id: &str,
        refresh_cache: bool,
    ) -> RelayResult<String>;

    /// A validator's registry document
    async fn validator(&self, ctx: &CancellationToken, name: &str) -> RelayResult<Validator>;
}

/// Raw GET seam under the registry client, so callers can swap transports
#[async_trait]
pub trait RegistryFetcher: Send + Sync {
    /// Fetch a JSON document; non-200 statuses are errors
    async fn get_json(&self, ctx: &CancellationToken, url: &str) -> RelayResult<Vec<u8>>;
}

/// reqwest-backed fetcher
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> RelayResult<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RegistryFetcher for HttpFetcher {
    async fn get_json(&self, ctx: &CancellationToken, url: &str) -> RelayResult<Vec<u8>> {
        check_cancelled(ctx)?;

        let request = async {
            let response = self
                .client
                .get(url)
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await?;

            if response.status() != reqwest::StatusCode::OK {
                return Err(RelayError::HttpStatus {
                    status: response.status().as_u16(),
                });
            }

            Ok(response.bytes().await?.to_vec())
        };

        tokio::select! {
            _ = ctx.cancelled() => Err(RelayError::Cancelled),
            result = request => result,
        }
    }
}

/// Registry client that caches chain names and chain documents.
///
/// Cached entries live for the life of the process unless a lookup is asked
/// to refresh. The cache is internally synchronized, but the client is meant
/// to be owned by one logical caller; shared use should go through the
/// retryable wrapper or an external mutex rather than relying on lookup
/// ordering.
pub struct HttpRegistryClient {
    fetcher: Arc<dyn RegistryFetcher>,
    chains_base_url: String,
    validators_base_url: String,

    chain_names: Mutex<Vec<String>>,
    chain_infos: Mutex<HashMap<String, ChainInfo>>,
}

impl HttpRegistryClient {
    pub fn new(
        chains_base_url: impl Into<String>,
        validators_base_url: impl Into<String>,
    ) -> RelayResult<Self> {
        Ok(Self::with_fetcher(
            Arc::new(HttpFetcher::new()?),
            chains_base_url,
            validators_base_url,
        ))
    }

    /// Build a client over a custom fetcher
    pub fn with_fetcher(
        fetcher: Arc<dyn RegistryFetcher>,
        chains_base_url: impl Into<String>,
        validators_base_url: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            chains_base_url: chains_base_url.into(),
            validators_base_url: validators_base_url.into(),
            chain_names: Mutex::new(Vec::new()),
            chain_infos: Mutex::new(HashMap::new()),
        }
    }

    fn lock_names(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.chain_names
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_infos(&self) -> std::sync::MutexGuard<'_, HashMap<String, ChainInfo>> {
        self.chain_infos
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn fetch_chain_info(
        &self,
        ctx: &CancellationToken,
        chain_name: &str,
    ) -> RelayResult<ChainInfo> {
        let url = format!("{}/{}/chain.json", self.chains_base_url, chain_name);
        let bytes = self.fetcher.get_json(ctx, &url).await?;
        let info: ChainInfo = serde_json::from_slice(&bytes)?;

        self.lock_infos().insert(chain_name.to_string(), info.clone());
        Ok(info)
    }
}

#[async_trait]
impl ChainRegistryClient for HttpRegistryClient {
    async fn all_chain_names(&self, ctx: &CancellationToken) -> RelayResult<Vec<String>> {
        {
            let names = self.lock_names();
            if !names.is_empty() {
                return Ok(names.clone());
            }
        }

        let url = format!("{}/all", self.chains_base_url);
        let bytes = self.fetcher.get_json(ctx, &url).await?;
        let names: Vec<String> = serde_json::from_slice(&bytes)?;
        debug!("loaded {} chains from the registry", names.len());

        *self.lock_names() = names.clone();
        Ok(names)
    }

    async fn chain_info(
        &self,
        ctx: &CancellationToken,
        chain_name: &str,
    ) -> RelayResult<ChainInfo> {
        if let Some(info) = self.lock_infos().get(chain_name) {
            return Ok(info.clone());
        }

        self.fetch_chain_info(ctx, chain_name).await
    }

    async fn asset_list(
        &self,
        ctx: &CancellationToken,
        chain_name: &str,
    ) -> RelayResult<AssetList> {
        let url = format!("{}/{}/assetlist.json", self.chains_base_url, chain_name);
        let bytes = self.fetcher.get_json(ctx, &url).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn chain_name_for_chain_id(
        &self,
        ctx: &CancellationToken,
        target_chain_id: &str,
        refresh_cache: bool,
    ) -> RelayResult<String> {
        if refresh_cache {
            self.lock_names().clear();
            self.lock_infos().clear();
            debug!("reset chain name and chain info caches");
        }

        let chain_names = self.all_chain_names(ctx).await?;

        for chain_name in &chain_names {
            let cached_id = self
                .lock_infos()
                .get(chain_name)
                .map(|info| info.chain_id.clone());

            let chain_id = match cached_id {
                Some(chain_id) => chain_id,
                None => match self.fetch_chain_info(ctx, chain_name).await {
                    Ok(info) => info.chain_id,
                    Err(err) if err.is_cancellation() => return Err(err),
                    Err(err) => {
                        // One bad registry entry should not sink the scan;
                        // that chain is simply unsupported this run.
                        warn!(
                            "failed to fetch chain info for {}, skipping: {}",
                            chain_name, err
                        );
                        continue;
                    }
                },
            };

            if chain_id.eq_ignore_ascii_case(target_chain_id) {
                return Ok(chain_name.clone());
            }
        }

        Err(RelayError::NoChainFound)
    }

    async fn validator(&self, ctx: &CancellationToken, name: &str) -> RelayResult<Validator> {
        let url = format!("{}/{}/chains.json", self.validators_base_url, name);
        let bytes = self.fetcher.get_json(ctx, &url).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fetcher that serves canned documents and records every URL requested
    struct CountingFetcher {
        responses: HashMap<String, Vec<u8>>,
        requests: Mutex<Vec<String>>,
    }

    impl CountingFetcher {
        fn new(responses: Vec<(&str, &str)>) -> Self {
            Self {
                responses: responses
                    .into_iter()
                    .map(|(url, body)| (url.to_string(), body.as_bytes().to_vec()))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RegistryFetcher for CountingFetcher {
        async fn get_json(&self, _ctx: &CancellationToken, url: &str) -> RelayResult<Vec<u8>> {
            self.requests.lock().unwrap().push(url.to_string());
            self.responses
                .get(url)
                .cloned()
                .ok_or(RelayError::HttpStatus { status: 500 })
        }
    }

    const BASE: &str = "https://registry.test/v1/chains";
    const VBASE: &str = "https://registry.test/v1/validators";

    fn client(responses: Vec<(&str, &str)>) -> (HttpRegistryClient, Arc<CountingFetcher>) {
        let fetcher = Arc::new(CountingFetcher::new(responses));
        let client = HttpRegistryClient::with_fetcher(fetcher.clone(), BASE, VBASE);
        (client, fetcher)
    }

    #[tokio::test]
    async fn test_chain_info_is_cached() {
        let (client, fetcher) = client(vec![(
            "https://registry.test/v1/chains/cosmoshub/chain.json",
            r#"{"chain_name": "cosmoshub", "chain_id": "cosmoshub-4"}"#,
        )]);

        let ctx = CancellationToken::new();
        let first = client.chain_info(&ctx, "cosmoshub").await.unwrap();
        let second = client.chain_info(&ctx, "cosmoshub").await.unwrap();

        assert_eq!(first.chain_id, "cosmoshub-4");
        assert_eq!(first, second);
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test]
    async fn test_all_chain_names_is_cached() {
        let (client, fetcher) = client(vec![(
            "https://registry.test/v1/chains/all",
            r#"["a", "b", "c"]"#,
        )]);

        let ctx = CancellationToken::new();
        let names = client.all_chain_names(&ctx).await.unwrap();
        assert_eq!(names, vec!["a", "b", "c"]);

        client.all_chain_names(&ctx).await.unwrap();
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test]
    async fn test_chain_name_for_chain_id() {
        let (client, fetcher) = client(vec![
            ("https://registry.test/v1/chains/all", r#"["a", "b", "c"]"#),
            (
                "https://registry.test/v1/chains/a/chain.json",
                r#"{"chain_name": "a", "chain_id": "A-1"}"#,
            ),
        ]);

        let ctx = CancellationToken::new();

        // The match is case-insensitive against the fetched chain id.
        let name = client
            .chain_name_for_chain_id(&ctx, "a-1", false)
            .await
            .unwrap();
        assert_eq!(name, "a");
        assert_eq!(fetcher.request_count(), 2);

        // A second resolution is served entirely from cache.
        let name = client
            .chain_name_for_chain_id(&ctx, "A-1", false)
            .await
            .unwrap();
        assert_eq!(name, "a");
        assert_eq!(fetcher.request_count(), 2);
    }

    #[tokio::test]
    async fn test_refresh_clears_caches() {
        let (client, fetcher) = client(vec![
            ("https://registry.test/v1/chains/all", r#"["a"]"#),
            (
                "https://registry.test/v1/chains/a/chain.json",
                r#"{"chain_name": "a", "chain_id": "A-1"}"#,
            ),
        ]);

        let ctx = CancellationToken::new();
        client
            .chain_name_for_chain_id(&ctx, "a-1", false)
            .await
            .unwrap();
        assert_eq!(fetcher.request_count(), 2);

        client
            .chain_name_for_chain_id(&ctx, "a-1", true)
            .await
            .unwrap();
        assert_eq!(fetcher.request_count(), 4);
    }

    #[tokio::test]
    async fn test_scan_skips_failing_chains() {
        // No document is registered for chain "a", so its fetch fails with a
        // 500; the scan should continue to "b".
        let (client, _fetcher) = client(vec![
            ("https://registry.test/v1/chains/all", r#"["a", "b"]"#),
            (
                "https://registry.test/v1/chains/b/chain.json",
                r#"{"chain_name": "b", "chain_id": "B-1"}"#,
            ),
        ]);

        let ctx = CancellationToken::new();
        let name = client
            .chain_name_for_chain_id(&ctx, "b-1", false)
            .await
            .unwrap();
        assert_eq!(name, "b");
    }

    #[tokio::test]
    async fn test_unknown_chain_id() {
        let (client, _fetcher) = client(vec![
            ("https://registry.test/v1/chains/all", r#"["a"]"#),
            (
                "https://registry.test/v1/chains/a/chain.json",
                r#"{"chain_name": "a", "chain_id": "A-1"}"#,
            ),
        ]);

        let ctx = CancellationToken::new();
        let result = client.chain_name_for_chain_id(&ctx, "z-9", false).await;
        assert!(matches!(result, Err(RelayError::NoChainFound)));
    }

    #[tokio::test]
    async fn test_validator_lookup() {
        let (client, _fetcher) = client(vec![(
            "https://registry.test/v1/validators/lighthouse/chains.json",
            r#"{"name": "lighthouse", "chains": [{"name": "cosmoshub"}]}"#,
        )]);

        let ctx = CancellationToken::new();
        let validator = client.validator(&ctx, "lighthouse").await.unwrap();
        assert_eq!(validator.name, "lighthouse");
        assert_eq!(validator.chains.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_document_is_status_error() {
        let (client, _fetcher) = client(vec![]);

        let ctx = CancellationToken::new();
        let result = client.chain_info(&ctx, "nope").await;
        assert!(matches!(
            result,
            Err(RelayError::HttpStatus { status: 500 })
        ));
    }
}
