//! Polling broadcaster: waits for inclusion by tx hash

use crate::broadcast::TxBroadcaster;
use crate::config::PollConfig;
use crate::error::RelayResult;
use crate::rpc::{BroadcastOutcome, InclusionStatus};
use crate::tx::Msg;
use crate::util::{check_cancelled, sleep_or_cancel};

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Decorator that polls `check_tx_status` until the transaction settles or
/// the attempt budget runs out.
///
/// Exhaustion is reported as `Ok(None)` rather than an error: a transaction
/// that never showed up is gas feedback the layers above still want to see.
pub struct PollingBroadcaster<B> {
    attempts: u32,
    delay: Duration,

    wrapped: B,
}

impl<B: TxBroadcaster> PollingBroadcaster<B> {
    pub fn new(config: &PollConfig, wrapped: B) -> RelayResult<Self> {
        config.validate()?;
        Ok(Self {
            attempts: config.attempts,
            delay: config.delay,
            wrapped,
        })
    }
}

#[async_trait]
impl<B: TxBroadcaster> TxBroadcaster for PollingBroadcaster<B> {
    async fn sign_and_broadcast(
        &self,
        ctx: &CancellationToken,
        messages: &[Msg],
    ) -> RelayResult<BroadcastOutcome> {
        // Nothing to poll on the initial broadcast.
        self.wrapped.sign_and_broadcast(ctx, messages).await
    }

    async fn check_tx_status(
        &self,
        ctx: &CancellationToken,
        tx_hash: &str,
    ) -> RelayResult<Option<InclusionStatus>> {
        info!("polling for inclusion of {}", tx_hash);

        for attempt in 1..=self.attempts {
            check_cancelled(ctx)?;

            // Sleep first: the chain needs a moment to settle after broadcast.
            sleep_or_cancel(ctx, self.delay).await?;

            match self.wrapped.check_tx_status(ctx, tx_hash).await? {
                Some(status) => return Ok(Some(status)),
                None => info!(
                    "transaction {} still not included (attempt {}/{})",
                    tx_hash, attempt, self.attempts
                ),
            }
        }

        warn!(
            "transaction {} not included after exhausting all {} polling attempts",
            tx_hash, self.attempts
        );
        Ok(None)
    }
}
