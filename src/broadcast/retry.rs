//! Retryable broadcaster: bounded retry around the outer operations

use crate::broadcast::TxBroadcaster;
use crate::config::RetryConfig;
use crate::error::RelayResult;
use crate::rpc::{BroadcastOutcome, InclusionStatus};
use crate::tx::Msg;
use crate::util::{check_cancelled, sleep_or_cancel};

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Decorator that retries failed sign-and-broadcast and status checks.
///
/// Only `Err` results are retried; outcomes with non-zero codes flow through
/// untouched because the orchestrator owns gas-driven retries. Cancellation is
/// checked before each attempt and never retried.
pub struct RetryableBroadcaster<B> {
    attempts: u32,
    delay: Duration,

    wrapped: B,
}

impl<B: TxBroadcaster> RetryableBroadcaster<B> {
    pub fn new(config: &RetryConfig, wrapped: B) -> RelayResult<Self> {
        config.validate()?;
        Ok(Self {
            attempts: config.attempts,
            delay: config.delay,
            wrapped,
        })
    }
}

macro_rules! broadcast_with_retries {
    ($self:ident, $ctx:ident, $what:literal, $call:expr) => {{
        let mut attempt: u32 = 0;
        loop {
            check_cancelled($ctx)?;

            match $call.await {
                Ok(value) => break Ok(value),
                Err(err) if err.is_cancellation() => break Err(err),
                Err(err) => {
                    attempt += 1;
                    if attempt >= $self.attempts {
                        error!(
                            "failed in all {} attempts to {}: {}",
                            $self.attempts, $what, err
                        );
                        break Err(err);
                    }
                    error!(
                        "failed to {} (attempt {}/{}), will retry: {}",
                        $what, attempt, $self.attempts, err
                    );
                    sleep_or_cancel($ctx, $self.delay).await?;
                }
            }
        }
    }};
}

#[async_trait]
impl<B: TxBroadcaster> TxBroadcaster for RetryableBroadcaster<B> {
    async fn sign_and_broadcast(
        &self,
        ctx: &CancellationToken,
        messages: &[Msg],
    ) -> RelayResult<BroadcastOutcome> {
        broadcast_with_retries!(
            self,
            ctx,
            "sign and broadcast",
            self.wrapped.sign_and_broadcast(ctx, messages)
        )
    }

    async fn check_tx_status(
        &self,
        ctx: &CancellationToken,
        tx_hash: &str,
    ) -> RelayResult<Option<InclusionStatus>> {
        broadcast_with_retries!(
            self,
            ctx,
            "check tx status",
            self.wrapped.check_tx_status(ctx, tx_hash)
        )
    }
}
