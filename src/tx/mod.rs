//! Transaction construction and signing seams
//!
//! Message construction, protobuf encoding, and key handling are external
//! collaborators. This module defines the narrow traits they plug into and
//! the provider that drives them through simulate/price/sign/encode.

pub mod codec;
pub mod metadata;
pub mod provider;
pub mod signer;

pub use codec::{TxBody, TxCodec};
pub use metadata::{SigningMetadata, SigningMetadataProvider};
pub use provider::{DefaultTxProvider, ProvidedTx, TxProvider};
pub use signer::BytesSigner;

/// An opaque, pre-encoded ledger message (a protobuf `Any`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Msg {
    pub type_url: String,
    pub value: Vec<u8>,
}

impl Msg {
    pub fn new(type_url: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            type_url: type_url.into(),
            value,
        }
    }
}
