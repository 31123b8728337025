//! Transaction provider: build, simulate, price, sign, encode

use crate::error::RelayResult;
use crate::rpc::{Coin, RpcClient};
use crate::tx::codec::{TxBody, TxCodec};
use crate::tx::metadata::SigningMetadata;
use crate::tx::signer::BytesSigner;
use crate::tx::Msg;

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A fully signed transaction plus the gas limit it was built with.
///
/// The gas limit is surfaced so callers can reconcile broadcast responses that
/// zero out `gas_wanted` on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedTx {
    pub tx_bytes: Vec<u8>,
    pub gas_wanted: u64,
}

/// Builds a broadcast-ready transaction from messages
#[async_trait]
pub trait TxProvider: Send + Sync {
    async fn provide_tx(
        &self,
        ctx: &CancellationToken,
        gas_price: f64,
        gas_factor: f64,
        messages: &[Msg],
        metadata: &SigningMetadata,
    ) -> RelayResult<ProvidedTx>;
}

/// Gas limit derived from a simulation: simulated gas scaled by the factor,
/// rounded up
pub fn gas_recommendation(simulated_gas: u64, gas_factor: f64) -> u64 {
    (simulated_gas as f64 * gas_factor).ceil() as u64
}

/// Fee in the smallest denomination: price times gas, rounded down, plus one
/// to stay above the node's cutoff
fn fee_amount(gas_price: f64, gas_wanted: u64) -> u128 {
    (gas_price * gas_wanted as f64) as u128 + 1
}

/// Default provider wiring the signer and codec seams to the RPC surface
pub struct DefaultTxProvider {
    signer: Arc<dyn BytesSigner>,
    codec: Arc<dyn TxCodec>,
    rpc_client: Arc<dyn RpcClient>,

    fee_denom: String,
    memo: String,
}

impl DefaultTxProvider {
    pub fn new(
        signer: Arc<dyn BytesSigner>,
        codec: Arc<dyn TxCodec>,
        rpc_client: Arc<dyn RpcClient>,
        fee_denom: impl Into<String>,
        memo: impl Into<String>,
    ) -> Self {
        Self {
            signer,
            codec,
            rpc_client,
            fee_denom: fee_denom.into(),
            memo: memo.into(),
        }
    }
}

#[async_trait]
impl TxProvider for DefaultTxProvider {
    async fn provide_tx(
        &self,
        ctx: &CancellationToken,
        gas_price: f64,
        gas_factor: f64,
        messages: &[Msg],
        metadata: &SigningMetadata,
    ) -> RelayResult<ProvidedTx> {
        let mut body = TxBody::new(messages.to_vec(), self.memo.clone());
        let public_key = self.signer.public_key();

        // The sign mode requires a placeholder signature with the right public
        // key and sequence before the bytes can be simulated.
        let simulation_bytes = self
            .codec
            .encode(&body, &public_key, metadata.sequence(), None)?;
        let simulated = self.rpc_client.simulate(ctx, &simulation_bytes).await?;

        let gas_wanted = gas_recommendation(simulated.gas_used, gas_factor);
        debug!(
            "simulated gas: {} raw, {} with factor {}",
            simulated.gas_used, gas_wanted, gas_factor
        );

        body.gas_limit = gas_wanted;
        body.fee = Some(Coin {
            denom: self.fee_denom.clone(),
            amount: fee_amount(gas_price, gas_wanted),
        });

        let sign_doc = self.codec.sign_doc(&body, metadata, &public_key)?;
        let signature = self.signer.sign(&sign_doc)?;
        let tx_bytes = self
            .codec
            .encode(&body, &public_key, metadata.sequence(), Some(&signature))?;

        Ok(ProvidedTx {
            tx_bytes,
            gas_wanted,
        })
    }
}
