//! Abstract RPC surface for a ledger node
//!
//! This module defines the typed contract the rest of the library programs
//! against. Concrete transports (gRPC, REST, in-memory test doubles) implement
//! [`RpcClient`]; the library itself never opens a connection. Paginated
//! queries are exposed page-by-page and aggregated by provided methods using
//! the next-key pattern.

pub mod pagination;
pub mod retry;

pub use retry::RetryableRpcClient;

use crate::error::RelayResult;
use crate::util::check_cancelled;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

/// Page size for paginated queries
pub const PAGE_SIZE: u64 = 100;

/// Immediate acknowledgement of a broadcast.
///
/// A `code` of zero means the node accepted the transaction; the codespace is
/// only meaningful for non-zero codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub tx_hash: String,
    pub code: u32,
    pub codespace: String,
    pub raw_log: String,
    pub gas_wanted: u64,
}

impl BroadcastOutcome {
    /// A zero code is success, regardless of codespace
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Settled status of a transaction that was found on chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionStatus {
    pub tx_hash: String,
    pub code: u32,
    pub codespace: String,
    pub raw_log: String,
    pub gas_wanted: u64,
    pub height: u64,
}

impl InclusionStatus {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Result of simulating a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulateOutcome {
    pub gas_used: u64,
}

/// On-chain account record used for signing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountEntry {
    pub account_number: u64,
    pub sequence: u64,
}

/// An amount of a single denomination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

/// A unit of a denomination and its decimal exponent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenomUnit {
    pub denom: String,
    pub exponent: u32,
}

/// Bank metadata for a denomination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenomMetadata {
    pub base: String,
    pub denom_units: Vec<DenomUnit>,
}

/// An authorization grant from a granter to a grantee
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub granter: String,
    pub grantee: String,
    /// Type URL of the granted authorization
    pub authorization_type_url: String,
    /// Opaque encoded authorization payload
    pub authorization_value: Vec<u8>,
}

/// One page of a paginated query.
///
/// An empty `next_key` means this was the final page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_key: Vec<u8>,
}

impl<T> Page<T> {
    /// A single page carrying the entire result set
    pub fn complete(items: Vec<T>) -> Self {
        Self {
            items,
            next_key: Vec::new(),
        }
    }
}

/// Typed request/response contract to a remote ledger node.
///
/// Every operation is cancellable through the supplied token. Inclusion
/// lookups distinguish "not found" (`Ok(None)`) from transport failures
/// (`Err`). The provided `grants`/`delegators`/`balances` methods walk all
/// pages in order until the next-key is empty, checking cancellation between
/// pages; there is no artificial cap on the number of pages.
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Submit signed transaction bytes and return the node's immediate ack
    async fn broadcast(
        &self,
        ctx: &CancellationToken,
        tx_bytes: &[u8],
    ) -> RelayResult<BroadcastOutcome>;

    /// Fetch the settled status of a transaction, or `None` if not yet found
    async fn tx_status(
        &self,
        ctx: &CancellationToken,
        tx_hash: &str,
    ) -> RelayResult<Option<InclusionStatus>>;

    /// Simulate transaction bytes and report the gas they consumed
    async fn simulate(
        &self,
        ctx: &CancellationToken,
        tx_bytes: &[u8],
    ) -> RelayResult<SimulateOutcome>;

    /// Fetch the account record for an address
    async fn account(&self, ctx: &CancellationToken, address: &str) -> RelayResult<AccountEntry>;

    /// Fetch the balance of a single denomination
    async fn balance(
        &self,
        ctx: &CancellationToken,
        address: &str,
        denom: &str,
    ) -> RelayResult<Coin>;

    /// Fetch bank metadata for a denomination
    async fn denom_metadata(
        &self,
        ctx: &CancellationToken,
        denom: &str,
    ) -> RelayResult<DenomMetadata>;

    /// Fetch one page of grants where the given address is the grantee
    async fn grants_page(
        &self,
        ctx: &CancellationToken,
        grantee: &str,
        page_key: Vec<u8>,
    ) -> RelayResult<Page<Grant>>;

    /// Fetch one page of delegator addresses for a validator
    async fn delegators_page(
        &self,
        ctx: &CancellationToken,
        validator: &str,
        page_key: Vec<u8>,
    ) -> RelayResult<Page<String>>;

    /// Fetch one page of balances for an address
    async fn balances_page(
        &self,
        ctx: &CancellationToken,
        address: &str,
        page_key: Vec<u8>,
    ) -> RelayResult<Page<Coin>>;

    /// Fetch pending staking rewards for a delegator/validator pair
    async fn pending_rewards(
        &self,
        ctx: &CancellationToken,
        delegator: &str,
        validator: &str,
        denom: &str,
    ) -> RelayResult<Decimal>;

    /// Fetch all grants where the given address is the grantee
    async fn grants(&self, ctx: &CancellationToken, grantee: &str) -> RelayResult<Vec<Grant>> {
        check_cancelled(ctx)?;
        pagination::fetch_all_pages(ctx, "grants", |key| self.grants_page(ctx, grantee, key)).await
    }

    /// Fetch all delegator addresses for a validator
    async fn delegators(
        &self,
        ctx: &CancellationToken,
        validator: &str,
    ) -> RelayResult<Vec<String>> {
        check_cancelled(ctx)?;
        pagination::fetch_all_pages(ctx, "delegations", |key| {
            self.delegators_page(ctx, validator, key)
        })
        .await
    }

    /// Fetch all balances for an address
    async fn balances(&self, ctx: &CancellationToken, address: &str) -> RelayResult<Vec<Coin>> {
        check_cancelled(ctx)?;
        pagination::fetch_all_pages(ctx, "balances", |key| self.balances_page(ctx, address, key))
            .await
    }
}
