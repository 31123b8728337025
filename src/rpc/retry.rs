//! Retrying decorator for the RPC surface

use crate::config::RetryConfig;
use crate::error::RelayResult;
use crate::rpc::{
    AccountEntry, BroadcastOutcome, Coin, DenomMetadata, Grant, InclusionStatus, Page, RpcClient,
    SimulateOutcome,
};
use crate::util::{check_cancelled, sleep_or_cancel};

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Runs a fallible call up to `attempts` times with `delay` between tries.
/// Cancellation short-circuits before each attempt and is never retried; the
/// last error is surfaced once attempts are exhausted.
macro_rules! with_retries {
    ($self:ident, $ctx:ident, $method:literal, $call:expr) => {{
        let mut attempt: u32 = 0;
        loop {
            check_cancelled($ctx)?;

            match $call.await {
                Ok(value) => break Ok(value),
                Err(err) if err.is_cancellation() => break Err(err),
                Err(err) => {
                    attempt += 1;
                    error!(
                        "failed call in rpc client (method: {}, attempt {}/{}): {}",
                        $method, attempt, $self.attempts, err
                    );
                    if attempt >= $self.attempts {
                        break Err(err);
                    }
                    sleep_or_cancel($ctx, $self.delay).await?;
                }
            }
        }
    }};
}

/// Decorates an [`RpcClient`] with bounded fixed-delay retry.
///
/// Page-granular queries are retried per page, so the inherited aggregate
/// methods recover from transient failures mid-walk without refetching
/// earlier pages.
pub struct RetryableRpcClient<C> {
    wrapped: C,
    attempts: u32,
    delay: Duration,
}

impl<C: RpcClient> RetryableRpcClient<C> {
    pub fn new(config: &RetryConfig, wrapped: C) -> RelayResult<Self> {
        config.validate()?;
        Ok(Self {
            wrapped,
            attempts: config.attempts,
            delay: config.delay,
        })
    }
}

#[async_trait]
impl<C: RpcClient> RpcClient for RetryableRpcClient<C> {
    async fn broadcast(
        &self,
        ctx: &CancellationToken,
        tx_bytes: &[u8],
    ) -> RelayResult<BroadcastOutcome> {
        with_retries!(self, ctx, "broadcast", self.wrapped.broadcast(ctx, tx_bytes))
    }

    async fn tx_status(
        &self,
        ctx: &CancellationToken,
        tx_hash: &str,
    ) -> RelayResult<Option<InclusionStatus>> {
        with_retries!(self, ctx, "tx_status", self.wrapped.tx_status(ctx, tx_hash))
    }

    async fn simulate(
        &self,
        ctx: &CancellationToken,
        tx_bytes: &[u8],
    ) -> RelayResult<SimulateOutcome> {
        with_retries!(self, ctx, "simulate", self.wrapped.simulate(ctx, tx_bytes))
    }

    async fn account(&self, ctx: &CancellationToken, address: &str) -> RelayResult<AccountEntry> {
        with_retries!(self, ctx, "account", self.wrapped.account(ctx, address))
    }

    async fn balance(
        &self,
        ctx: &CancellationToken,
        address: &str,
        denom: &str,
    ) -> RelayResult<Coin> {
        with_retries!(self, ctx, "balance", self.wrapped.balance(ctx, address, denom))
    }

    async fn denom_metadata(
        &self,
        ctx: &CancellationToken,
        denom: &str,
    ) -> RelayResult<DenomMetadata> {
        with_retries!(
            self,
            ctx,
            "denom_metadata",
            self.wrapped.denom_metadata(ctx, denom)
        )
    }

    async fn grants_page(
        &self,
        ctx: &CancellationToken,
        grantee: &str,
        page_key: Vec<u8>,
    ) -> RelayResult<Page<Grant>> {
        with_retries!(
            self,
            ctx,
            "grants",
            self.wrapped.grants_page(ctx, grantee, page_key.clone())
        )
    }

    async fn delegators_page(
        &self,
        ctx: &CancellationToken,
        validator: &str,
        page_key: Vec<u8>,
    ) -> RelayResult<Page<String>> {
        with_retries!(
            self,
            ctx,
            "delegators",
            self.wrapped.delegators_page(ctx, validator, page_key.clone())
        )
    }

    async fn balances_page(
        &self,
        ctx: &CancellationToken,
        address: &str,
        page_key: Vec<u8>,
    ) -> RelayResult<Page<Coin>> {
        with_retries!(
            self,
            ctx,
            "balances",
            self.wrapped.balances_page(ctx, address, page_key.clone())
        )
    }

    async fn pending_rewards(
        &self,
        ctx: &CancellationToken,
        delegator: &str,
        validator: &str,
        denom: &str,
    ) -> RelayResult<Decimal> {
        with_retries!(
            self,
            ctx,
            "pending_rewards",
            self.wrapped.pending_rewards(ctx, delegator, validator, denom)
        )
    }
}
