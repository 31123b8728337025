//! Retrying decorator for the chain-registry client

use crate::config::RetryConfig;
use crate::error::RelayResult;
use crate::registry::client::ChainRegistryClient;
use crate::registry::types::{AssetList, ChainInfo, Validator};
use crate::util::{check_cancelled, sleep_or_cancel};

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::error;

macro_rules! registry_with_retries {
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
                        "failed call in registry client (method: {}, attempt {}/{}): {}",
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

/// Decorates a [`ChainRegistryClient`] with bounded fixed-delay retry
pub struct RetryableRegistryClient<C> {
    wrapped: C,
    attempts: u32,
    delay: Duration,
}

impl<C: ChainRegistryClient> RetryableRegistryClient<C> {
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
impl<C: ChainRegistryClient> ChainRegistryClient for RetryableRegistryClient<C> {
    async fn all_chain_names(&self, ctx: &CancellationToken) -> RelayResult<Vec<String>> {
        registry_with_retries!(self, ctx, "all_chain_names", self.wrapped.all_chain_names(ctx))
    }

    async fn chain_info(
        &self,
        ctx: &CancellationToken,
        chain_name: &str,
    ) -> RelayResult<ChainInfo> {
        registry_with_retries!(
            self,
            ctx,
            "chain_info",
            self.wrapped.chain_info(ctx, chain_name)
        )
    }

    async fn asset_list(
        &self,
        ctx: &CancellationToken,
        chain_name: &str,
    ) -> RelayResult<AssetList> {
        registry_with_retries!(
            self,
            ctx,
            "asset_list",
            self.wrapped.asset_list(ctx, chain_name)
        )
    }

    async fn chain_name_for_chain_id(
        &self,
        ctx: &CancellationToken,
        target_chain_id: &str,
        refresh_cache: bool,
    ) -> RelayResult<String> {
        registry_with_retries!(
            self,
            ctx,
            "chain_name_for_chain_id",
            self.wrapped
                .chain_name_for_chain_id(ctx, target_chain_id, refresh_cache)
        )
    }

    async fn validator(&self, ctx: &CancellationToken, name: &str) -> RelayResult<Validator> {
        registry_with_retries!(self, ctx, "validator", self.wrapped.validator(ctx, name))
    }
}
