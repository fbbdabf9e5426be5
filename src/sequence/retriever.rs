//! Online account lookup
//!
//! Queries a ledger node over JSON-RPC for the account number and current
//! sequence of an address. Used once per run, before any transaction is read.

use crate::{
    error::{Error, Result},
    AccountIdentity,
};
use async_trait::async_trait;
use ethers::providers::{Http, Provider};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// JSON-RPC method returning an account's number and sequence
const ACCOUNT_METHOD: &str = "auth_account";

/// Source of on-chain account state
#[async_trait]
pub trait AccountRetriever: Send + Sync {
    async fn account(&self, address: Address) -> Result<AccountIdentity>;
}

#[derive(Debug, Serialize, Deserialize)]
struct AccountResponse {
    account_number: u64,
    sequence: u64,
}

/// Account retriever backed by a node's JSON-RPC endpoint
#[derive(Debug, Clone)]
pub struct RpcAccountRetriever {
    provider: Provider<Http>,
}

impl RpcAccountRetriever {
    /// Only parses the URL; nothing is sent until the first lookup
    pub fn new(rpc_url: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| Error::AccountLookup(format!("invalid node url {}: {}", rpc_url, e)))?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl AccountRetriever for RpcAccountRetriever {
    async fn account(&self, address: Address) -> Result<AccountIdentity> {
        debug!("Querying account {:?}", address);
        let response: AccountResponse = self
            .provider
            .request(ACCOUNT_METHOD, [address])
            .await
            .map_err(|e| Error::AccountLookup(format!("{:?}: {}", address, e)))?;

        Ok(AccountIdentity {
            address,
            account_number: response.account_number,
            sequence: response.sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_url() {
        assert!(matches!(
            RpcAccountRetriever::new("not a url"),
            Err(Error::AccountLookup(_))
        ));
        assert!(RpcAccountRetriever::new("http://127.0.0.1:26657").is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_node_is_a_lookup_error() {
        // port 9 (discard) on localhost is not expected to speak JSON-RPC
        let retriever = RpcAccountRetriever::new("http://127.0.0.1:9").unwrap();
        let err = retriever.account(Address::zero()).await.unwrap_err();
        assert!(matches!(err, Error::AccountLookup(_)));
    }
}
