//! Gas-tracking broadcaster: feeds every outcome to the gas manager

use crate::broadcast::TxBroadcaster;
use crate::error::RelayResult;
use crate::gas::GasManager;
use crate::rpc::{BroadcastOutcome, InclusionStatus};
use crate::tx::Msg;

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Pure pass-through that reports broadcast and inclusion outcomes to the gas
/// manager.
///
/// Feedback failures are logged and swallowed; the transport result the
/// caller cares about is never masked by gas bookkeeping.
pub struct GasTrackingBroadcaster<B> {
    chain_name: String,

    gas_manager: Arc<dyn GasManager>,
    wrapped: B,
}

impl<B: TxBroadcaster> GasTrackingBroadcaster<B> {
    pub fn new(chain_name: impl Into<String>, gas_manager: Arc<dyn GasManager>, wrapped: B) -> Self {
        Self {
            chain_name: chain_name.into(),
            gas_manager,
            wrapped,
        }
    }
}

#[async_trait]
impl<B: TxBroadcaster> TxBroadcaster for GasTrackingBroadcaster<B> {
    async fn sign_and_broadcast(
        &self,
        ctx: &CancellationToken,
        messages: &[Msg],
    ) -> RelayResult<BroadcastOutcome> {
        let outcome = self.wrapped.sign_and_broadcast(ctx, messages).await?;

        // Successful broadcasts carry no price signal yet; wait to see whether
        // the transaction actually lands.
        if !outcome.is_success() {
            if let Err(err) = self
                .gas_manager
                .manage_failing_broadcast_result(&self.chain_name, &outcome)
            {
                warn!(
                    "failed to adjust gas for {} after broadcast result: {}",
                    self.chain_name, err
                );
            }
        }

        Ok(outcome)
    }

    async fn check_tx_status(
        &self,
        ctx: &CancellationToken,
        tx_hash: &str,
    ) -> RelayResult<Option<InclusionStatus>> {
        let status = self.wrapped.check_tx_status(ctx, tx_hash).await;

        match &status {
            // Errors indicate a fundamental problem like connectivity; there
            // is no gas signal in them.
            Err(_) => {
                debug!("received error from wrapped broadcaster, will not adjust gas");
            }
            // No error but no status: the transaction is probably under-fee'd.
            Ok(None) => {
                debug!(
                    "did not find transaction {} but got no error, adjusting gas for {}",
                    tx_hash, self.chain_name
                );
                if let Err(err) = self.gas_manager.manage_inclusion_failure(&self.chain_name) {
                    warn!(
                        "failed to adjust gas for {} after missing inclusion: {}",
                        self.chain_name, err
                    );
                }
            }
            Ok(Some(settled)) => {
                if let Err(err) = self
                    .gas_manager
                    .manage_included_tx_status(&self.chain_name, settled)
                {
                    warn!(
                        "failed to adjust gas for {} after tx status: {}",
                        self.chain_name, err
                    );
                }
            }
        }

        status
    }
}
