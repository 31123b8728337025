//! Adaptive gas management
//!
//! This module owns per-chain gas pricing: a classifier for ledger error
//! codes, a store for learned prices and factors, and a feedback controller
//! that converges both toward the minimum viable values.

pub mod classify;
pub mod manager;
pub mod store;

pub use classify::{classify, extract_min_global_fee, is_gas_related_error, GasErrorKind};
pub use manager::{GasManager, GeometricGasManager};
pub use store::{FileBackedGasPriceStore, GasPriceStore, InMemoryGasPriceStore};
