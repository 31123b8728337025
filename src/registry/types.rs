//! Chain-registry and validator-registry JSON models
//!
//! Shapes follow the public chain-registry documents; unknown fields are
//! ignored and missing ones default so partially filled registries still
//! parse.

use crate::error::{RelayError, RelayResult};
use crate::rpc::{Coin, RpcClient};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub denom: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeeToken {
    pub denom: String,

    #[serde(default)]
    pub fixed_min_gas_price: f64,
    #[serde(default)]
    pub low_gas_price: f64,
    #[serde(default)]
    pub average_gas_price: f64,
    #[serde(default)]
    pub high_gas_price: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Fees {
    #[serde(default)]
    pub fee_tokens: Vec<FeeToken>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Staking {
    #[serde(default)]
    pub staking_tokens: Vec<Token>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiAddress {
    pub address: String,
    #[serde(default)]
    pub provider: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Apis {
    #[serde(default)]
    pub rpc: Vec<ApiAddress>,
    #[serde(default)]
    pub rest: Vec<ApiAddress>,
    #[serde(default)]
    pub grpc: Vec<ApiAddress>,
}

/// One chain's registry document (`chain.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChainInfo {
    pub chain_name: String,
    pub chain_id: String,

    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub network_type: String,
    #[serde(default)]
    pub pretty_name: String,
    #[serde(default)]
    pub bech32_prefix: String,
    #[serde(default)]
    pub slip44: u32,
    #[serde(default)]
    pub fees: Fees,
    #[serde(default)]
    pub staking: Staking,
    #[serde(default)]
    pub apis: Apis,
}

impl ChainInfo {
    /// First fee token listed for the chain
    pub fn fee_token(&self) -> RelayResult<&FeeToken> {
        self.fees.fee_tokens.first().ok_or(RelayError::NoFeeToken)
    }

    pub fn fee_denom(&self) -> RelayResult<&str> {
        Ok(&self.fee_token()?.denom)
    }

    /// The chain's published minimum gas price
    pub fn min_gas_fee(&self) -> RelayResult<f64> {
        Ok(self.fee_token()?.fixed_min_gas_price)
    }

    pub fn staking_denom(&self) -> RelayResult<&str> {
        self.staking
            .staking_tokens
            .first()
            .map(|token| token.denom.as_str())
            .ok_or(RelayError::NoStakingToken)
    }

    /// One whole fee token in base units.
    ///
    /// The registry omits decimals, so the exponent comes from the ledger's
    /// denom metadata.
    pub async fn one_fee_token(
        &self,
        ctx: &CancellationToken,
        rpc_client: &dyn RpcClient,
    ) -> RelayResult<Coin> {
        let fee_denom = self.fee_denom()?.to_string();

        let metadata = rpc_client.denom_metadata(ctx, &fee_denom).await?;
        let decimals = metadata
            .denom_units
            .first()
            .map(|unit| unit.exponent)
            .ok_or(RelayError::NoDenomUnits {
                denom: fee_denom.clone(),
            })?;

        Ok(Coin {
            denom: fee_denom,
            amount: 10u128.pow(decimals),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DenomUnit {
    pub denom: String,
    #[serde(default)]
    pub exponent: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub denom_units: Vec<DenomUnit>,
    pub base: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub symbol: String,
}

impl Asset {
    /// Find a denom unit by name, case-insensitively
    pub fn denom_unit(&self, needle: &str) -> RelayResult<&DenomUnit> {
        self.denom_units
            .iter()
            .find(|unit| unit.denom.eq_ignore_ascii_case(needle))
            .ok_or(RelayError::NoMatchingDenom)
    }
}

/// One chain's asset registry document (`assetlist.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssetList {
    #[serde(default)]
    pub chain_name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl AssetList {
    /// Find an asset by its base denom, case-insensitively
    pub fn asset_by_base(&self, base: &str) -> RelayResult<&Asset> {
        self.assets
            .iter()
            .find(|asset| asset.base.eq_ignore_ascii_case(base))
            .ok_or(RelayError::NoMatchingAsset)
    }
}

// Validator registry

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Restake {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub minimum_reward: f64,
}

/// A validator's per-chain operations record
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RestakeInfo {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub moniker: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub jailed: bool,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub restake: Restake,
}

/// A validator's registry document (`chains.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Validator {
    pub name: String,
    #[serde(default)]
    pub chains: Vec<RestakeInfo>,
}

impl Validator {
    /// The validator's record for a specific chain
    pub fn chain(&self, chain_name: &str) -> Option<&RestakeInfo> {
        self.chains
            .iter()
            .find(|info| info.name.eq_ignore_ascii_case(chain_name))
    }
}
