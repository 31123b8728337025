//! Transaction encoding seam

use crate::error::RelayResult;
use crate::rpc::Coin;
use crate::tx::metadata::SigningMetadata;
use crate::tx::Msg;

/// The mutable envelope a transaction is assembled in before encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxBody {
    pub messages: Vec<Msg>,
    pub memo: String,
    /// Fee amount; unset until simulation has priced the transaction
    pub fee: Option<Coin>,
    pub gas_limit: u64,
}

impl TxBody {
    pub fn new(messages: Vec<Msg>, memo: impl Into<String>) -> Self {
        Self {
            messages,
            memo: memo.into(),
            fee: None,
            gas_limit: 0,
        }
    }
}

/// Encodes transactions to their wire and signing representations.
///
/// Implementations own the concrete wire format (protobuf sign modes, field
/// ordering, signer-info layout). Passing `None` for the signature installs a
/// placeholder with the correct public key and sequence, which the sign mode
/// requires for simulation.
pub trait TxCodec: Send + Sync {
    /// Encode the transaction to wire bytes, with a placeholder signature
    /// when `signature` is `None`
    fn encode(
        &self,
        body: &TxBody,
        public_key: &[u8],
        sequence: u64,
        signature: Option<&[u8]>,
    ) -> RelayResult<Vec<u8>>;

    /// Produce the canonical bytes the signer must sign
    fn sign_doc(
        &self,
        body: &TxBody,
        metadata: &SigningMetadata,
        public_key: &[u8],
    ) -> RelayResult<Vec<u8>>;
}
