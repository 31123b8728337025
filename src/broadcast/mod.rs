//! Layered transaction broadcasting
//!
//! Four decorators share one two-method contract and are composed by
//! construction: the default layer signs and broadcasts, polling adds
//! inclusion checks, gas-tracking feeds every outcome to the gas manager, and
//! the retryable layer retries transport failures. [`Broadcaster`] sits on
//! top and turns the stack into a single sign-and-broadcast operation with a
//! gas-driven retry loop.

pub mod default;
pub mod gas_tracking;
pub mod polling;
pub mod retry;

pub use default::DefaultBroadcaster;
pub use gas_tracking::GasTrackingBroadcaster;
pub use polling::PollingBroadcaster;
pub use retry::RetryableBroadcaster;

use crate::config::BroadcasterConfig;
use crate::error::{RelayError, RelayResult};
use crate::gas::{is_gas_related_error, GasManager};
use crate::rpc::{BroadcastOutcome, InclusionStatus, RpcClient};
use crate::tx::{BytesSigner, DefaultTxProvider, Msg, SigningMetadataProvider, TxCodec};
use crate::util::check_cancelled;

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Two-method contract shared by every pipeline layer.
///
/// `check_tx_status` returns `Ok(None)` while the transaction has not been
/// observed on chain; an `Err` means the lookup itself failed.
#[async_trait]
pub trait TxBroadcaster: Send + Sync {
    async fn sign_and_broadcast(
        &self,
        ctx: &CancellationToken,
        messages: &[Msg],
    ) -> RelayResult<BroadcastOutcome>;

    async fn check_tx_status(
        &self,
        ctx: &CancellationToken,
        tx_hash: &str,
    ) -> RelayResult<Option<InclusionStatus>>;
}

/// Top-level broadcaster: the full pipeline behind one operation
pub struct Broadcaster {
    chain_name: String,
    wrapped: Arc<dyn TxBroadcaster>,
}

impl Broadcaster {
    /// Compose the standard stack: default -> polling -> gas-tracking ->
    /// retryable.
    pub fn new(
        config: BroadcasterConfig,
        signer: Arc<dyn BytesSigner>,
        codec: Arc<dyn TxCodec>,
        gas_manager: Arc<dyn GasManager>,
        rpc_client: Arc<dyn RpcClient>,
    ) -> RelayResult<Self> {
        config.validate()?;

        let tx_provider = Arc::new(DefaultTxProvider::new(
            signer.clone(),
            codec,
            rpc_client.clone(),
            config.fee_denom.clone(),
            config.memo.clone(),
        ));
        let signing_metadata_provider = Arc::new(SigningMetadataProvider::new(
            config.chain_id.clone(),
            rpc_client.clone(),
        ));

        let default = DefaultBroadcaster::new(
            config.chain_name.clone(),
            config.account_prefix.clone(),
            signer,
            gas_manager.clone(),
            rpc_client,
            signing_metadata_provider,
            tx_provider,
        );
        let polling = PollingBroadcaster::new(&config.poll, default)?;
        let gas_tracking =
            GasTrackingBroadcaster::new(config.chain_name.clone(), gas_manager, polling);
        let retryable = RetryableBroadcaster::new(&config.retry, gas_tracking)?;

        Ok(Self {
            chain_name: config.chain_name,
            wrapped: Arc::new(retryable),
        })
    }

    /// Build an orchestrator over a prebuilt layer stack
    pub fn from_layers(chain_name: impl Into<String>, wrapped: Arc<dyn TxBroadcaster>) -> Self {
        Self {
            chain_name: chain_name.into(),
            wrapped,
        }
    }

    /// Sign, broadcast, and confirm a set of messages, retrying as long as
    /// failures are gas-related.
    ///
    /// Gas-class failures are always retryable: by the time they surface, the
    /// gas-tracking layer has already fed them to the controller, so the next
    /// iteration rebuilds, re-signs, and rebroadcasts at the adjusted price.
    /// Every other failure is terminal and carries the chain's raw log.
    pub async fn sign_and_broadcast(
        &self,
        ctx: &CancellationToken,
        messages: &[Msg],
    ) -> RelayResult<String> {
        loop {
            check_cancelled(ctx)?;

            let outcome = self.wrapped.sign_and_broadcast(ctx, messages).await?;

            if !outcome.is_success() {
                if is_gas_related_error(&outcome.codespace, outcome.code) {
                    error!(
                        "failed to sign and broadcast on {} due to gas, will retry: {}",
                        self.chain_name, outcome.raw_log
                    );
                    continue;
                }

                error!(
                    "broadcasted on {}, but got non-success response code {}: {}",
                    self.chain_name, outcome.code, outcome.raw_log
                );
                return Err(RelayError::TxFailed {
                    tx_hash: outcome.tx_hash,
                    raw_log: outcome.raw_log,
                });
            }

            let tx_hash = outcome.tx_hash;
            match self.wrapped.check_tx_status(ctx, &tx_hash).await? {
                Some(status) => {
                    if is_gas_related_error(&status.codespace, status.code) {
                        error!(
                            "transaction {} landed on {} but failed due to gas, will retry: {}",
                            tx_hash, self.chain_name, status.raw_log
                        );
                        continue;
                    }

                    if status.is_success() {
                        info!(
                            "transaction {} sent and landed on {} successfully",
                            tx_hash, self.chain_name
                        );
                        return Ok(tx_hash);
                    }

                    error!(
                        "transaction {} landed on {} but failed: {}",
                        tx_hash, self.chain_name, status.raw_log
                    );
                    return Err(RelayError::TxFailed {
                        tx_hash,
                        raw_log: status.raw_log,
                    });
                }
                None => {
                    // Rebroadcasting blindly is dangerous on chains where
                    // settlement can take hours; surface the miss instead.
                    warn!(
                        "transaction {} not found on {} after polling",
                        tx_hash, self.chain_name
                    );
                    return Err(RelayError::TxStatusNotFound);
                }
            }
        }
    }
}
