use super::AccountRetriever;
use crate::{
    config::SignOptions,
    error::{Error, Result},
};
use ethers::types::Address;
use tracing::{info, warn};

/// Account number and next sequence for the transactions of one run.
///
/// The account number never changes after construction; the sequence only
/// moves forward, one step per signed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceTracker {
    account_number: u64,
    sequence: u64,
}

impl SequenceTracker {
    pub fn new(account_number: u64, sequence: u64) -> Self {
        Self {
            account_number,
            sequence,
        }
    }

    /// Seed the tracker for a run.
    ///
    /// - multisig: explicit values, each defaulting to 0; no lookup
    /// - offline: explicit values, both required
    /// - online: looked up for `signer`; explicit values are ignored
    ///
    /// # Arguments
    /// * `opts` - Options of the run, carrying the mode and explicit values
    /// * `signer` - Address whose account is looked up when online
    /// * `retriever` - Source of account state, only queried when online
    ///
    /// # Returns
    /// * `Err(MissingAccountInfo)` when offline without both values
    /// * `Err(AccountLookup)` when the online lookup fails
    pub async fn resolve<A: AccountRetriever + ?Sized>(
        opts: &SignOptions,
        signer: Address,
        retriever: &A,
    ) -> Result<Self> {
        if opts.multisig.is_some() {
            return Ok(Self::new(
                opts.account_number.unwrap_or(0),
                opts.sequence.unwrap_or(0),
            ));
        }

        if opts.offline {
            let account_number = opts
                .account_number
                .ok_or(Error::MissingAccountInfo("account number"))?;
            let sequence = opts.sequence.ok_or(Error::MissingAccountInfo("sequence"))?;
            return Ok(Self::new(account_number, sequence));
        }

        if opts.account_number.is_some() || opts.sequence.is_some() {
            warn!("Ignoring explicit account number/sequence while online");
        }
        let account = retriever.account(signer).await?;
        info!(
            "Resolved account {:?}: number={}, sequence={}",
            account.address, account.account_number, account.sequence
        );
        Ok(Self::new(account.account_number, account.sequence))
    }

    /// Values to stamp on the current transaction
    pub fn current(&self) -> (u64, u64) {
        (self.account_number, self.sequence)
    }

    pub fn account_number(&self) -> u64 {
        self.account_number
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Move on to the next sequence
    pub fn advance(&mut self) -> Result<()> {
        self.sequence = self
            .sequence
            .checked_add(1)
            .ok_or(Error::SequenceOverflow(self.sequence))?;
        Ok(())
    }
}
