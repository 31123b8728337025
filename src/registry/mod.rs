//! Chain-registry discovery
//!
//! HTTP-backed lookups of chain metadata, asset lists, and validator
//! records, with an in-memory cache and a retryable wrapper.

pub mod client;
pub mod retry;
pub mod types;

pub use client::{ChainRegistryClient, HttpFetcher, HttpRegistryClient, RegistryFetcher};
pub use retry::RetryableRegistryClient;
pub use types::{Asset, AssetList, ChainInfo, FeeToken, Validator};
