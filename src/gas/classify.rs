//! Classification of ledger error codes for gas management
//!
//! Codes arrive as a `(codespace, code)` pair. Only two families are
//! actionable for the controller: fee-too-low and gas-limit-too-low.
//! Everything else is noise the controller must not react to.

use regex::Regex;
use std::sync::OnceLock;

/// How a non-zero ledger code relates to gas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasErrorKind {
    /// The fee was below the node's minimum gas price
    PriceTooLow,
    /// The gas limit was below what execution required
    TooFewUnits,
    /// Not a gas problem; the controller must not adjust
    Unrelated,
}

/// Classify a `(codespace, code)` pair
pub fn classify(codespace: &str, code: u32) -> GasErrorKind {
    if is_gas_price_error(codespace, code) {
        GasErrorKind::PriceTooLow
    } else if is_gas_amount_error(codespace, code) {
        GasErrorKind::TooFewUnits
    } else {
        GasErrorKind::Unrelated
    }
}

/// True for codes that signal an insufficient fee
pub fn is_gas_price_error(codespace: &str, code: u32) -> bool {
    (codespace == "sdk" && code == 13) || (codespace == "gaia" && code == 4)
}

/// True for codes that signal an insufficient gas limit
pub fn is_gas_amount_error(codespace: &str, code: u32) -> bool {
    codespace == "sdk" && code == 11
}

/// True if the code belongs to either gas family
pub fn is_gas_related_error(codespace: &str, code: u32) -> bool {
    is_gas_price_error(codespace, code) || is_gas_amount_error(codespace, code)
}

fn min_fee_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d+)\w+\)\. Please increase").expect("min fee pattern must compile")
    })
}

/// Extract a chain-suggested minimum fee from a raw log.
///
/// Some nodes spell out the fee they want, e.g.
/// `"provided fee < minimum global fee (100uatom < 5000uatom). Please
/// increase..."`. Returns the fee in absolute units when the log matches that
/// shape.
pub fn extract_min_global_fee(raw_log: &str) -> Option<f64> {
    let captures = min_fee_pattern().captures(raw_log)?;
    captures.get(1)?.as_str().parse::<f64>().ok()
}
