//! Configuration for the broadcaster pipeline and gas controller
//!
//! All parameters are supplied at construction time and validated before use.

use crate::error::{RelayError, RelayResult};

use std::time::Duration;

/// Parameters for the geometric gas-price controller
#[derive(Debug, Clone)]
pub struct GasControllerConfig {
    /// Base step applied to the gas price on each adjustment
    pub step_size: f64,
    /// Upper bound on any single price adjustment
    pub max_step_size: f64,
    /// Exponential scaling applied to consecutive outcomes, in (0, 1)
    pub scale_factor: f64,
}

impl GasControllerConfig {
    pub fn validate(&self) -> RelayResult<()> {
        if self.scale_factor <= 0.0 || self.scale_factor >= 1.0 {
            return Err(RelayError::InvalidConfig(format!(
                "invalid scale factor: {}. Must conform to: 0 < scale_factor < 1",
                self.scale_factor
            )));
        }
        if self.step_size <= 0.0 {
            return Err(RelayError::InvalidConfig(format!(
                "invalid step size: {}. Must be positive",
                self.step_size
            )));
        }
        if self.max_step_size < self.step_size {
            return Err(RelayError::InvalidConfig(format!(
                "max step size {} is smaller than step size {}",
                self.max_step_size, self.step_size
            )));
        }
        Ok(())
    }
}

/// Parameters for inclusion polling
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Maximum number of status checks per broadcast
    pub attempts: u32,
    /// Delay before each status check
    pub delay: Duration,
}

impl PollConfig {
    pub fn validate(&self) -> RelayResult<()> {
        if self.attempts == 0 {
            return Err(RelayError::InvalidConfig(
                "poll attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters for bounded retry loops
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub attempts: u32,
    /// Delay between attempts
    pub delay: Duration,
}

impl RetryConfig {
    pub fn validate(&self) -> RelayResult<()> {
        if self.attempts == 0 {
            return Err(RelayError::InvalidConfig(
                "retry attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Chain-level parameters for a broadcaster stack
#[derive(Debug, Clone)]
pub struct BroadcasterConfig {
    /// Registry name of the target chain
    pub chain_name: String,
    /// Network identifier used in sign bytes
    pub chain_id: String,
    /// Account prefix for deriving the signer address
    pub account_prefix: String,
    /// Denomination the fee is paid in
    pub fee_denom: String,
    /// Memo attached to every transaction
    pub memo: String,
    /// Inclusion polling parameters
    pub poll: PollConfig,
    /// Outer retry parameters
    pub retry: RetryConfig,
}

impl BroadcasterConfig {
    pub fn validate(&self) -> RelayResult<()> {
        if self.chain_name.is_empty() {
            return Err(RelayError::InvalidConfig(
                "chain name must not be empty".to_string(),
            ));
        }
        if self.chain_id.is_empty() {
            return Err(RelayError::InvalidConfig(
                "chain id must not be empty".to_string(),
            ));
        }
        if self.fee_denom.is_empty() {
            return Err(RelayError::InvalidConfig(
                "fee denom must not be empty".to_string(),
            ));
        }
        self.poll.validate()?;
        self.retry.validate()?;
        Ok(())
    }
}
