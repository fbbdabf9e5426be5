use super::{KeyRecord, Keyring};
use crate::{
    config::KeyringConfig,
    error::{Error, Result},
    MultisigKey, PublicKey,
};
use async_trait::async_trait;
use ethers::core::k256::{elliptic_curve::sec1::ToEncodedPoint, PublicKey as K256PublicKey};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes};
use std::collections::BTreeMap;
use tracing::{debug, info};

struct Entry {
    record: KeyRecord,
    /// `None` for multisig entries, which cannot sign on their own
    wallet: Option<LocalWallet>,
}

/// In-memory keyring
#[derive(Default)]
pub struct LocalKeyring {
    entries: BTreeMap<String, Entry>,
}

impl LocalKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a keyring from the `[keyring]` configuration section.
    /// Multisig entries may only reference keys declared in `keys`.
    pub fn from_config(config: &KeyringConfig) -> Result<Self> {
        let mut keyring = Self::new();
        for key in &config.keys {
            keyring.add_private_key(&key.name, &key.private_key)?;
        }
        for multisig in &config.multisig {
            let members: Vec<&str> = multisig.members.iter().map(String::as_str).collect();
            keyring.add_multisig(&multisig.name, multisig.threshold, &members)?;
        }
        info!("Keyring loaded with {} entries", keyring.entries.len());
        Ok(keyring)
    }

    /// Add a key from its hex-encoded private key
    pub fn add_private_key(&mut self, name: &str, private_key: &str) -> Result<KeyRecord> {
        let wallet = private_key
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| Error::Keyring(format!("invalid private key for {}: {}", name, e)))?;
        self.add_wallet(name, wallet)
    }

    pub fn add_wallet(&mut self, name: &str, wallet: LocalWallet) -> Result<KeyRecord> {
        let record = KeyRecord {
            name: name.to_string(),
            address: wallet.address(),
            public_key: PublicKey::Simple(compressed_public_key(&wallet)),
        };
        self.insert(record.clone(), Some(wallet))?;
        debug!("Added key {} ({:?})", name, record.address);
        Ok(record)
    }

    /// Add a multisig key over existing single keys
    ///
    /// # Arguments
    /// * `name` - Name the multisig key is registered under
    /// * `threshold` - Number of member signatures the key requires
    /// * `members` - Names or addresses of member keys, in slot order
    ///
    /// # Returns
    /// * `Ok(KeyRecord)` for the new key, its address derived from the members
    /// * `Err` if a member is unknown or a multisig, the threshold is out of
    ///   range, or the name is taken
    pub fn add_multisig(
        &mut self,
        name: &str,
        threshold: usize,
        members: &[&str],
    ) -> Result<KeyRecord> {
        let mut keys = Vec::with_capacity(members.len());
        for member in members {
            let record = self.key(member)?;
            let key = record.public_key.as_simple().cloned().ok_or_else(|| {
                Error::Keyring(format!("multisig member {} is itself a multisig key", member))
            })?;
            keys.push(key);
        }
        let key = MultisigKey::new(threshold, keys)?;
        let record = KeyRecord {
            name: name.to_string(),
            address: key.address(),
            public_key: PublicKey::Multisig(key),
        };
        self.insert(record.clone(), None)?;
        debug!("Added {}-of-{} multisig key {}", threshold, members.len(), name);
        Ok(record)
    }

    fn insert(&mut self, record: KeyRecord, wallet: Option<LocalWallet>) -> Result<()> {
        if self.entries.contains_key(&record.name) {
            return Err(Error::Keyring(format!("duplicate key name {}", record.name)));
        }
        self.entries.insert(record.name.clone(), Entry { record, wallet });
        Ok(())
    }
}

#[async_trait]
impl Keyring for LocalKeyring {
    fn key(&self, reference: &str) -> Result<KeyRecord> {
        if let Some(entry) = self.entries.get(reference) {
            return Ok(entry.record.clone());
        }
        // not a name, maybe an address
        if let Ok(address) = reference.parse::<Address>() {
            if let Some(entry) = self.entries.values().find(|e| e.record.address == address) {
                return Ok(entry.record.clone());
            }
        }
        Err(Error::Keyring(format!("key {} not found", reference)))
    }

    async fn sign(&self, name: &str, payload: &[u8]) -> Result<Bytes> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| Error::Keyring(format!("key {} not found", name)))?;
        let wallet = entry.wallet.as_ref().ok_or_else(|| Error::Signing {
            signer: name.to_string(),
            reason: "multisig keys cannot sign directly".into(),
        })?;
        let signature = wallet.sign_message(payload).await.map_err(|e| Error::Signing {
            signer: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Bytes::from(signature.to_vec()))
    }
}

fn compressed_public_key(wallet: &LocalWallet) -> Bytes {
    let key = K256PublicKey::from(wallet.signer().verifying_key());
    Bytes::from(key.to_encoded_point(true).as_bytes().to_vec())
}
