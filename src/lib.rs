//! relaykit - reliable transaction submission for Cosmos-style ledgers
//!
//! This library owns the full life-cycle of a signed message: gas estimation,
//! fee computation, broadcast, inclusion polling, adaptive gas-price
//! adjustment, and retry. Three subsystems cooperate:
//!
//! - A layered [`broadcast::Broadcaster`] pipeline (default -> polling ->
//!   gas-tracking -> retryable -> orchestrator).
//! - An adaptive [`gas::GasManager`] that learns per-chain fee levels from
//!   broadcast and inclusion outcomes.
//! - A [`registry::ChainRegistryClient`] that discovers chain metadata over
//!   HTTP with caching and bounded retry.
//!
//! Cryptographic signing, message construction, and the ledger transport are
//! external collaborators behind narrow traits ([`tx::BytesSigner`],
//! [`tx::TxCodec`], [`rpc::RpcClient`]). The library spawns no background
//! tasks; every network-facing operation takes a
//! [`tokio_util::sync::CancellationToken`] and returns promptly once it fires.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod gas;
pub mod registry;
pub mod rpc;
pub mod tx;

mod util;

pub use error::{RelayError, RelayResult};
