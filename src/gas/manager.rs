//! Feedback-driven gas controller
//!
//! The manager receives one feedback event per broadcast or inclusion outcome
//! and nudges the stored gas price and gas factor for that chain. Prices move
//! geometrically (steps scale exponentially with consecutive outcomes, bounded
//! by a max step). Factors move linearly and periodically probe a decrease
//! after a run of successes, backing off the probe cadence when a probe fails.

use crate::config::GasControllerConfig;
use crate::error::{RelayError, RelayResult};
use crate::gas::classify::{classify, extract_min_global_fee, GasErrorKind};
use crate::gas::store::GasPriceStore;
use crate::rpc::{BroadcastOutcome, InclusionStatus};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Consecutive successes required before the price steps down
const PRICE_SUCCESS_THRESHOLD: u32 = 5;

/// Linear step applied to the gas factor
const FACTOR_STEP: f64 = 0.01;

/// Initial consecutive-success threshold for factor probing
const BASE_FACTOR_SUCCESS_THRESHOLD: u32 = 10;

/// Upper bound on the factor probing threshold
const MAX_FACTOR_SUCCESS_THRESHOLD: u32 = 100;

/// Factor assumed when a chain has no stored value
const DEFAULT_GAS_FACTOR: f64 = 1.2;

/// Interprets transaction results and maintains per-chain gas levels.
///
/// Call exactly one feedback method per observed outcome: a failing broadcast,
/// a settled inclusion status, or an inclusion that never happened. Feeding
/// the same outcome through more than one method double-counts it.
pub trait GasManager: Send + Sync {
    /// Current gas price for the chain; 0 with a warning when unknown
    fn gas_price(&self, chain_name: &str) -> RelayResult<f64>;

    /// Current gas factor for the chain; 1.2 with a warning when unknown
    fn gas_factor(&self, chain_name: &str) -> RelayResult<f64>;

    /// Seed a price. No-op if the chain already has one.
    fn initialize_price(&self, chain_name: &str, gas_price: f64) -> RelayResult<()>;

    /// A broadcast came back with a non-zero code
    fn manage_failing_broadcast_result(
        &self,
        chain_name: &str,
        outcome: &BroadcastOutcome,
    ) -> RelayResult<()>;

    /// A transaction settled on chain, successfully or not
    fn manage_included_tx_status(
        &self,
        chain_name: &str,
        status: &InclusionStatus,
    ) -> RelayResult<()>;

    /// A broadcast was accepted but the transaction never appeared on chain
    fn manage_inclusion_failure(&self, chain_name: &str) -> RelayResult<()>;
}

/// Per-chain controller state, created lazily on first feedback
struct ChainGasState {
    price_successes: u32,
    price_failures: u32,
    factor_successes: u32,
    factor_failures: u32,
    probing_lower_factor: bool,
    factor_success_threshold: u32,
}

impl Default for ChainGasState {
    fn default() -> Self {
        Self {
            price_successes: 0,
            price_failures: 0,
            factor_successes: 0,
            factor_failures: 0,
            probing_lower_factor: false,
            factor_success_threshold: BASE_FACTOR_SUCCESS_THRESHOLD,
        }
    }
}

/// Gas manager with geometrically scaled price steps
pub struct GeometricGasManager {
    step_size: f64,
    max_step_size: f64,
    scale_factor: f64,

    state: Mutex<HashMap<String, ChainGasState>>,
    store: Arc<dyn GasPriceStore>,
}

impl GeometricGasManager {
    pub fn new(config: GasControllerConfig, store: Arc<dyn GasPriceStore>) -> RelayResult<Self> {
        config.validate()?;
        Ok(Self {
            step_size: config.step_size,
            max_step_size: config.max_step_size,
            scale_factor: config.scale_factor,
            state: Mutex::new(HashMap::new()),
            store,
        })
    }

    /// Step size scaled by consecutive outcomes, bounded by the max step
    fn bounded_step(&self, consecutive: u32) -> f64 {
        let scaled = self.step_size * (1.0 + self.scale_factor).powi(consecutive as i32);
        if scaled > self.max_step_size {
            warn!(
                "bounding step size: desired {}, max {}",
                scaled, self.max_step_size
            );
            self.max_step_size
        } else {
            scaled
        }
    }

    fn track_failing_code(
        &self,
        chain_name: &str,
        code: u32,
        codespace: &str,
        raw_log: &str,
        gas_wanted: u64,
    ) -> RelayResult<()> {
        match classify(codespace, code) {
            GasErrorKind::Unrelated => {
                info!(
                    "result for {} (codespace {}, code {}) was unrelated to gas, not adjusting: {}",
                    chain_name, codespace, code, raw_log
                );
                Ok(())
            }
            GasErrorKind::PriceTooLow => {
                let old_price = self.gas_price(chain_name)?;
                self.track_price_failure(chain_name)?;

                // A chain-suggested minimum fee beats the additive step.
                if let Some(suggested_fee) = extract_min_global_fee(raw_log) {
                    if gas_wanted == 0 {
                        panic!("gas wanted cannot be zero when applying a chain-suggested fee");
                    }
                    let new_price = suggested_fee / gas_wanted as f64;
                    self.store.set_gas_price(chain_name, new_price)?;
                    info!(
                        "calculated exact price from chain suggestion for {}: {} (was {})",
                        chain_name, new_price, old_price
                    );
                }
                Ok(())
            }
            GasErrorKind::TooFewUnits => self.track_factor_failure(chain_name),
        }
    }

    fn track_price_failure(&self, chain_name: &str) -> RelayResult<()> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let chain = state.entry(chain_name.to_string()).or_default();
        chain.price_successes = 0;
        chain.price_failures += 1;
        let failures = chain.price_failures;

        self.adjust_price(chain_name, 0, failures)
    }

    fn track_price_success(&self, chain_name: &str) -> RelayResult<()> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let chain = state.entry(chain_name.to_string()).or_default();
        chain.price_failures = 0;
        chain.price_successes += 1;
        let successes = chain.price_successes;

        self.adjust_price(chain_name, successes, 0)
    }

    fn adjust_price(&self, chain_name: &str, successes: u32, failures: u32) -> RelayResult<()> {
        if failures == 0 && successes < PRICE_SUCCESS_THRESHOLD {
            return Ok(());
        }

        let old_price = self.gas_price(chain_name)?;
        let new_price = if failures > 0 {
            old_price + self.bounded_step(failures)
        } else {
            let step = self.bounded_step(successes - PRICE_SUCCESS_THRESHOLD);
            (old_price - step).max(0.0)
        };

        self.store.set_gas_price(chain_name, new_price)?;
        info!(
            "adjusted gas price for {}: {} -> {} ({} consecutive successes, {} consecutive failures)",
            chain_name, old_price, new_price, successes, failures
        );
        Ok(())
    }

    fn track_factor_failure(&self, chain_name: &str) -> RelayResult<()> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let chain = state.entry(chain_name.to_string()).or_default();
        chain.factor_successes = 0;
        chain.factor_failures += 1;
        let failures = chain.factor_failures;

        self.adjust_factor(chain_name, chain, 0, failures)
    }

    fn track_factor_success(&self, chain_name: &str) -> RelayResult<()> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let chain = state.entry(chain_name.to_string()).or_default();
        chain.factor_failures = 0;
        chain.factor_successes += 1;
        let successes = chain.factor_successes;

        self.adjust_factor(chain_name, chain, successes, 0)
    }

    fn adjust_factor(
        &self,
        chain_name: &str,
        chain: &mut ChainGasState,
        successes: u32,
        failures: u32,
    ) -> RelayResult<()> {
        let old_factor = self.gas_factor(chain_name)?;
        let new_factor;

        if chain.probing_lower_factor {
            chain.probing_lower_factor = false;

            if failures > 0 {
                // The probe failed: undo it and probe less eagerly next time.
                chain.factor_success_threshold = (chain.factor_success_threshold
                    + BASE_FACTOR_SUCCESS_THRESHOLD)
                    .min(MAX_FACTOR_SUCCESS_THRESHOLD);
                new_factor = old_factor + FACTOR_STEP;
            } else {
                // The lower factor held. Keep it and reset the cadence.
                chain.factor_success_threshold = BASE_FACTOR_SUCCESS_THRESHOLD;
                chain.factor_successes = 0;
                return Ok(());
            }
        } else {
            if failures == 0 && successes < chain.factor_success_threshold {
                return Ok(());
            }

            if failures > 0 {
                new_factor = old_factor + FACTOR_STEP;
            } else {
                new_factor = (old_factor - FACTOR_STEP).max(0.0);
                chain.probing_lower_factor = true;
            }
        }

        self.store.set_gas_factor(chain_name, new_factor)?;
        info!(
            "adjusted gas factor for {}: {} -> {} ({} consecutive successes, {} consecutive failures)",
            chain_name, old_factor, new_factor, successes, failures
        );
        Ok(())
    }
}

impl GasManager for GeometricGasManager {
    fn gas_price(&self, chain_name: &str) -> RelayResult<f64> {
        match self.store.gas_price(chain_name) {
            Ok(price) => Ok(price),
            Err(RelayError::NoGasPrice) => {
                warn!("no gas price found for {}, using zero", chain_name);
                Ok(0.0)
            }
            Err(err) => Err(err),
        }
    }

    fn gas_factor(&self, chain_name: &str) -> RelayResult<f64> {
        match self.store.gas_factor(chain_name) {
            Ok(factor) => Ok(factor),
            Err(RelayError::NoGasFactor) => {
                warn!(
                    "no gas factor found for {}, using {}",
                    chain_name, DEFAULT_GAS_FACTOR
                );
                Ok(DEFAULT_GAS_FACTOR)
            }
            Err(err) => Err(err),
        }
    }

    fn initialize_price(&self, chain_name: &str, gas_price: f64) -> RelayResult<()> {
        if self.store.has_gas_price(chain_name)? {
            warn!(
                "requested initialization of previously initialized price for {}, ignoring",
                chain_name
            );
            return Ok(());
        }
        self.store.set_gas_price(chain_name, gas_price)
    }

    fn manage_failing_broadcast_result(
        &self,
        chain_name: &str,
        outcome: &BroadcastOutcome,
    ) -> RelayResult<()> {
        if outcome.is_success() {
            warn!(
                "broadcast result for {} was successful, but the gas manager was asked to track a failure",
                chain_name
            );
            return Ok(());
        }

        self.track_failing_code(
            chain_name,
            outcome.code,
            &outcome.codespace,
            &outcome.raw_log,
            outcome.gas_wanted,
        )
    }

    fn manage_included_tx_status(
        &self,
        chain_name: &str,
        status: &InclusionStatus,
    ) -> RelayResult<()> {
        if status.is_success() {
            self.track_price_success(chain_name)?;
            self.track_factor_success(chain_name)?;
            return Ok(());
        }

        self.track_failing_code(
            chain_name,
            status.code,
            &status.codespace,
            &status.raw_log,
            status.gas_wanted,
        )
    }

    fn manage_inclusion_failure(&self, chain_name: &str) -> RelayResult<()> {
        self.track_price_failure(chain_name)
    }
}
