//! Signing Orchestrator Module
//!
//! Signs decoded transactions one at a time. For every transaction it:
//! 1. Stamps the current account number and sequence
//! 2. Checks multisig membership when signing on behalf of a multisig key
//! 3. Asks the keyring to sign the canonical sign bytes
//! 4. Attaches the signature (append, or replace when overwriting)
//! 5. Advances the sequence and returns the record to emit
//!
//! A failing transaction leaves the sequence untouched.

use crate::{
    config::SignOptions,
    error::{Error, Result},
    keyring::{KeyRecord, Keyring},
    multisig::MultisigValidator,
    sequence::{AccountRetriever, SequenceTracker},
    OutputRecord, SignatureRecord, SignedTransaction, UnsignedTransaction,
};
use ethers::types::Bytes;
use tracing::{debug, info};

/// Settings and counters shared by every transaction of a run
#[derive(Debug, Clone)]
pub struct BatchState {
    pub tracker: SequenceTracker,
    /// Present when signing on behalf of a multisig key
    pub multisig: Option<MultisigValidator>,
    pub sig_only: bool,
    pub overwrite: bool,
    pub chain_id: String,
}

impl BatchState {
    /// Resolve the multisig target and starting account values for a run
    pub async fn resolve<K, A>(
        opts: &SignOptions,
        signer: &KeyRecord,
        keyring: &K,
        retriever: &A,
    ) -> Result<Self>
    where
        K: Keyring + ?Sized,
        A: AccountRetriever + ?Sized,
    {
        let multisig = match &opts.multisig {
            Some(reference) => Some(MultisigValidator::new(&keyring.key(reference)?)?),
            None => None,
        };
        if let Some(validator) = &multisig {
            info!("Signing on behalf of multisig {}", validator.target());
            if !opts.signature_only {
                info!("Multisig signing implies signature-only output");
            }
        }

        let tracker = SequenceTracker::resolve(opts, signer.address, retriever).await?;
        debug!(
            "Batch state: offline={}, account_number={}, sequence={}",
            opts.offline,
            tracker.account_number(),
            tracker.sequence()
        );

        Ok(Self {
            tracker,
            sig_only: opts.signature_only || multisig.is_some(),
            multisig,
            overwrite: opts.overwrite,
            chain_id: opts.chain_id.clone(),
        })
    }
}

/// Signs transactions with one signing key under one `BatchState`
pub struct SigningOrchestrator<'k, K: ?Sized> {
    keyring: &'k K,
    signer: KeyRecord,
    /// Public key of `signer`, attached to every signature
    signer_key: Bytes,
    state: BatchState,
}

impl<'k, K: Keyring + ?Sized> SigningOrchestrator<'k, K> {
    /// The signer must be a single key; multisig keys only sign through
    /// their members
    pub fn new(keyring: &'k K, signer: KeyRecord, state: BatchState) -> Result<Self> {
        let signer_key = signer.public_key.as_simple().cloned().ok_or_else(|| {
            Error::Keyring(format!("{} is a multisig key and cannot sign", signer.name))
        })?;
        Ok(Self {
            keyring,
            signer,
            signer_key,
            state,
        })
    }

    pub fn state(&self) -> &BatchState {
        &self.state
    }

    /// Sign one transaction
    ///
    /// # Returns
    /// * `Ok(OutputRecord)` - the new signature, or the whole signed
    ///   transaction unless signing signature-only
    /// * `Err` if membership, signing or sequence advance fails; the sequence
    ///   is then left as it was
    pub async fn process(&mut self, mut tx: UnsignedTransaction) -> Result<OutputRecord> {
        let (account_number, sequence) = self.state.tracker.current();
        tx.stamp(account_number, sequence);

        // membership is checked before the signer sees anything
        let multisig_slot = match &self.state.multisig {
            Some(validator) => Some(validator.validate(&self.signer)?),
            None => None,
        };

        let payload = tx.sign_bytes(&self.state.chain_id)?;
        let signature = self
            .keyring
            .sign(&self.signer.name, &payload)
            .await
            .map_err(|e| match e {
                Error::Signing { .. } => e,
                other => Error::Signing {
                    signer: self.signer.name.clone(),
                    reason: other.to_string(),
                },
            })?;

        let record = SignatureRecord {
            public_key: self.signer_key.clone(),
            signature,
            sequence,
            multisig_slot,
        };
        tx.attach_signature(record.clone(), self.state.overwrite);
        self.state.tracker.advance()?;

        debug!(
            "Signed transaction with {} at account {} sequence {}",
            self.signer.name, account_number, sequence
        );

        if self.state.sig_only {
            Ok(OutputRecord::Signature(record))
        } else {
            Ok(OutputRecord::Transaction(SignedTransaction(tx)))
        }
    }
}
