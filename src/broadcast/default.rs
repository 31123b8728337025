//! Default broadcaster: one-shot sign, simulate, broadcast

use crate::broadcast::TxBroadcaster;
use crate::error::RelayResult;
use crate::gas::GasManager;
use crate::rpc::{BroadcastOutcome, InclusionStatus, RpcClient};
use crate::tx::{BytesSigner, Msg, SigningMetadataProvider, TxProvider};

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Bottom of the pipeline: builds a signed transaction at the current gas
/// levels and hands it to the RPC surface
pub struct DefaultBroadcaster {
    chain_name: String,
    account_prefix: String,

    signer: Arc<dyn BytesSigner>,
    gas_manager: Arc<dyn GasManager>,
    rpc_client: Arc<dyn RpcClient>,
    signing_metadata_provider: Arc<SigningMetadataProvider>,
    tx_provider: Arc<dyn TxProvider>,
}

impl DefaultBroadcaster {
    pub fn new(
        chain_name: impl Into<String>,
        account_prefix: impl Into<String>,
        signer: Arc<dyn BytesSigner>,
        gas_manager: Arc<dyn GasManager>,
        rpc_client: Arc<dyn RpcClient>,
        signing_metadata_provider: Arc<SigningMetadataProvider>,
        tx_provider: Arc<dyn TxProvider>,
    ) -> Self {
        Self {
            chain_name: chain_name.into(),
            account_prefix: account_prefix.into(),
            signer,
            gas_manager,
            rpc_client,
            signing_metadata_provider,
            tx_provider,
        }
    }
}

#[async_trait]
impl TxBroadcaster for DefaultBroadcaster {
    async fn sign_and_broadcast(
        &self,
        ctx: &CancellationToken,
        messages: &[Msg],
    ) -> RelayResult<BroadcastOutcome> {
        let gas_price = self.gas_manager.gas_price(&self.chain_name)?;
        let gas_factor = self.gas_manager.gas_factor(&self.chain_name)?;
        debug!(
            "broadcasting on {} with gas price {} and gas factor {}",
            self.chain_name, gas_price, gas_factor
        );

        let sender_address = self.signer.address(&self.account_prefix);
        let metadata = self
            .signing_metadata_provider
            .metadata_for_account(ctx, &sender_address)
            .await?;

        let provided = self
            .tx_provider
            .provide_tx(ctx, gas_price, gas_factor, messages, &metadata)
            .await?;

        let mut outcome = self.rpc_client.broadcast(ctx, &provided.tx_bytes).await?;
        info!(
            "attempted to broadcast transaction {} on {} (codespace {}, code {}): {}",
            outcome.tx_hash, self.chain_name, outcome.codespace, outcome.code, outcome.raw_log
        );

        // Nodes zero out gas_wanted on failed broadcasts. Substitute the value
        // we computed so downstream gas tracking sees real parameters; a
        // non-zero response that disagrees with ours means the transaction on
        // the wire was not the one we built.
        if outcome.gas_wanted != 0 && outcome.gas_wanted != provided.gas_wanted {
            panic!(
                "unexpected gas wanted in tx response. We calculated: {}, response had: {}",
                provided.gas_wanted, outcome.gas_wanted
            );
        }
        outcome.gas_wanted = provided.gas_wanted;

        Ok(outcome)
    }

    async fn check_tx_status(
        &self,
        ctx: &CancellationToken,
        tx_hash: &str,
    ) -> RelayResult<Option<InclusionStatus>> {
        let status = self.rpc_client.tx_status(ctx, tx_hash).await?;

        match &status {
            Some(status) => {
                info!(
                    "got a settled tx status for {} (codespace {}, code {})",
                    tx_hash, status.codespace, status.code
                );
                debug!("full tx logs for {}: {}", tx_hash, status.raw_log);
            }
            None => debug!("tx {} not included in chain", tx_hash),
        }

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::{GasPriceStore, GeometricGasManager, InMemoryGasPriceStore};
    use crate::rpc::{
        AccountEntry, Coin, DenomMetadata, Grant, Page, SimulateOutcome,
    };
    use crate::tx::{ProvidedTx, SigningMetadata};

    use rust_decimal::Decimal;
    use std::sync::Mutex;

    struct StubSigner;

    impl BytesSigner for StubSigner {
        fn address(&self, account_prefix: &str) -> String {
            format!("{account_prefix}1stub")
        }

        fn public_key(&self) -> Vec<u8> {
            vec![1]
        }

        fn sign(&self, _bytes: &[u8]) -> RelayResult<Vec<u8>> {
            Ok(vec![2])
        }
    }

    /// Provider that returns fixed bytes and gas, recording the prices it saw
    struct StubProvider {
        gas_wanted: u64,
        seen_prices: Mutex<Vec<(f64, f64)>>,
    }

    #[async_trait]
    impl TxProvider for StubProvider {
        async fn provide_tx(
            &self,
            _ctx: &CancellationToken,
            gas_price: f64,
            gas_factor: f64,
            _messages: &[Msg],
            _metadata: &SigningMetadata,
        ) -> RelayResult<ProvidedTx> {
            self.seen_prices.lock().unwrap().push((gas_price, gas_factor));
            Ok(ProvidedTx {
                tx_bytes: vec![9, 9, 9],
                gas_wanted: self.gas_wanted,
            })
        }
    }

    /// RPC surface whose broadcast response is scripted
    struct ScriptedRpc {
        response_gas_wanted: u64,
    }

    #[async_trait]
    impl RpcClient for ScriptedRpc {
        async fn broadcast(
            &self,
            _ctx: &CancellationToken,
            _tx_bytes: &[u8],
        ) -> RelayResult<BroadcastOutcome> {
            Ok(BroadcastOutcome {
                tx_hash: "HASH".to_string(),
                code: 0,
                codespace: String::new(),
                raw_log: String::new(),
                gas_wanted: self.response_gas_wanted,
            })
        }

        async fn tx_status(
            &self,
            _ctx: &CancellationToken,
            _tx_hash: &str,
        ) -> RelayResult<Option<InclusionStatus>> {
            Ok(None)
        }

        async fn simulate(
            &self,
            _ctx: &CancellationToken,
            _tx_bytes: &[u8],
        ) -> RelayResult<SimulateOutcome> {
            unreachable!()
        }

        async fn account(
            &self,
            _ctx: &CancellationToken,
            _address: &str,
        ) -> RelayResult<AccountEntry> {
            Ok(AccountEntry {
                account_number: 1,
                sequence: 5,
            })
        }

        async fn balance(
            &self,
            _ctx: &CancellationToken,
            _address: &str,
            _denom: &str,
        ) -> RelayResult<Coin> {
            unreachable!()
        }

        async fn denom_metadata(
            &self,
            _ctx: &CancellationToken,
            _denom: &str,
        ) -> RelayResult<DenomMetadata> {
            unreachable!()
        }

        async fn grants_page(
            &self,
            _ctx: &CancellationToken,
            _grantee: &str,
            _page_key: Vec<u8>,
        ) -> RelayResult<Page<Grant>> {
            unreachable!()
        }

        async fn delegators_page(
            &self,
            _ctx: &CancellationToken,
            _validator: &str,
            _page_key: Vec<u8>,
        ) -> RelayResult<Page<String>> {
            unreachable!()
        }

        async fn balances_page(
            &self,
            _ctx: &CancellationToken,
            _address: &str,
            _page_key: Vec<u8>,
        ) -> RelayResult<Page<Coin>> {
            unreachable!()
        }

        async fn pending_rewards(
            &self,
            _ctx: &CancellationToken,
            _delegator: &str,
            _validator: &str,
            _denom: &str,
        ) -> RelayResult<Decimal> {
            unreachable!()
        }
    }

    fn broadcaster(response_gas_wanted: u64, provider_gas_wanted: u64) -> DefaultBroadcaster {
        let store = Arc::new(InMemoryGasPriceStore::new());
        store.set_gas_price("testchain", 0.025).unwrap();
        store.set_gas_factor("testchain", 1.2).unwrap();

        let gas_manager = Arc::new(
            GeometricGasManager::new(
                crate::config::GasControllerConfig {
                    step_size: 0.01,
                    max_step_size: 0.1,
                    scale_factor: 0.5,
                },
                store,
            )
            .unwrap(),
        );

        let rpc: Arc<dyn RpcClient> = Arc::new(ScriptedRpc {
            response_gas_wanted,
        });

        DefaultBroadcaster::new(
            "testchain",
            "cosmos",
            Arc::new(StubSigner),
            gas_manager,
            rpc.clone(),
            Arc::new(SigningMetadataProvider::new("testchain-1", rpc)),
            Arc::new(StubProvider {
                gas_wanted: provider_gas_wanted,
                seen_prices: Mutex::new(Vec::new()),
            }),
        )
    }

    #[tokio::test]
    async fn test_reconciles_zeroed_gas_wanted() {
        let b = broadcaster(0, 120_000);
        let ctx = CancellationToken::new();
        let outcome = b.sign_and_broadcast(&ctx, &[]).await.unwrap();
        assert_eq!(outcome.gas_wanted, 120_000);
    }

    #[tokio::test]
    async fn test_matching_gas_wanted_passes_through() {
        let b = broadcaster(120_000, 120_000);
        let ctx = CancellationToken::new();
        let outcome = b.sign_and_broadcast(&ctx, &[]).await.unwrap();
        assert_eq!(outcome.gas_wanted, 120_000);
    }

    #[tokio::test]
    #[should_panic(expected = "unexpected gas wanted")]
    async fn test_mismatched_gas_wanted_panics() {
        let b = broadcaster(99, 120_000);
        let ctx = CancellationToken::new();
        let _ = b.sign_and_broadcast(&ctx, &[]).await;
    }

    #[tokio::test]
    async fn test_not_found_status_is_none() {
        let b = broadcaster(0, 120_000);
        let ctx = CancellationToken::new();
        let status = b.check_tx_status(&ctx, "HASH").await.unwrap();
        assert!(status.is_none());
    }

    #[tokio::test]
    async fn test_provider_sees_current_gas_levels() {
        let store = Arc::new(InMemoryGasPriceStore::new());
        store.set_gas_price("testchain", 0.05).unwrap();
        store.set_gas_factor("testchain", 1.4).unwrap();

        let gas_manager = Arc::new(
            GeometricGasManager::new(
                crate::config::GasControllerConfig {
                    step_size: 0.01,
                    max_step_size: 0.1,
                    scale_factor: 0.5,
                },
                store,
            )
            .unwrap(),
        );

        let rpc: Arc<dyn RpcClient> = Arc::new(ScriptedRpc {
            response_gas_wanted: 0,
        });
        let provider = Arc::new(StubProvider {
            gas_wanted: 120_000,
            seen_prices: Mutex::new(Vec::new()),
        });

        let b = DefaultBroadcaster::new(
            "testchain",
            "cosmos",
            Arc::new(StubSigner),
            gas_manager,
            rpc.clone(),
            Arc::new(SigningMetadataProvider::new("testchain-1", rpc)),
            provider.clone(),
        );

        let ctx = CancellationToken::new();
        b.sign_and_broadcast(&ctx, &[]).await.unwrap();

        assert_eq!(*provider.seen_prices.lock().unwrap(), vec![(0.05, 1.4)]);
    }
}
