//! Byte-signing seam

use crate::error::RelayResult;

/// Signs opaque byte strings with a fixed key pair.
///
/// Key derivation and curve choice live behind this trait; the library only
/// needs an address, a public key to embed in signer infos, and a signature
/// over canonical sign bytes.
pub trait BytesSigner: Send + Sync {
    /// Bech32-style address for the signer under the given account prefix
    fn address(&self, account_prefix: &str) -> String;

    /// Encoded public key for signer infos
    fn public_key(&self) -> Vec<u8>;

    /// Sign the given bytes
    fn sign(&self, bytes: &[u8]) -> RelayResult<Vec<u8>>;
}
