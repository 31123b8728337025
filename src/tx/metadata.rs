//! Signing metadata lookup

use crate::error::RelayResult;
use crate::rpc::RpcClient;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything the codec needs to know about the signer for one transaction.
///
/// Immutable once built; fetch a fresh one per attempt so the sequence tracks
/// the on-chain account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningMetadata {
    address: String,
    account_number: u64,
    chain_id: String,
    sequence: u64,
}

impl SigningMetadata {
    pub fn new(
        address: impl Into<String>,
        account_number: u64,
        chain_id: impl Into<String>,
        sequence: u64,
    ) -> Self {
        Self {
            address: address.into(),
            account_number,
            chain_id: chain_id.into(),
            sequence,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn account_number(&self) -> u64 {
        self.account_number
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Fetches signing metadata for an account.
///
/// The chain id is fixed at construction; account number and sequence are
/// re-read from the ledger on every call.
pub struct SigningMetadataProvider {
    chain_id: String,
    rpc_client: Arc<dyn RpcClient>,
}

impl SigningMetadataProvider {
    pub fn new(chain_id: impl Into<String>, rpc_client: Arc<dyn RpcClient>) -> Self {
        Self {
            chain_id: chain_id.into(),
            rpc_client,
        }
    }

    pub async fn metadata_for_account(
        &self,
        ctx: &CancellationToken,
        address: &str,
    ) -> RelayResult<SigningMetadata> {
        let account = self.rpc_client.account(ctx, address).await?;

        Ok(SigningMetadata {
            address: address.to_string(),
            account_number: account.account_number,
            chain_id: self.chain_id.clone(),
            sequence: account.sequence,
        })
    }
}
