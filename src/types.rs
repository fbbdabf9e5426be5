use crate::error::{Error, Result};
use ethers::types::{Address, Bytes};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Transaction read from the input stream, possibly carrying signatures
/// added by earlier signers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    /// Opaque transaction body, signed as-is
    pub body: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    /// Signature slots in attachment order
    #[serde(default)]
    pub signatures: Vec<SignatureRecord>,
}

impl UnsignedTransaction {
    pub fn new(body: Value) -> Self {
        Self {
            body,
            account_number: None,
            sequence: None,
            signatures: Vec::new(),
        }
    }

    /// Embed the signing account's number and sequence
    pub fn stamp(&mut self, account_number: u64, sequence: u64) {
        self.account_number = Some(account_number);
        self.sequence = Some(sequence);
    }

    /// Canonical bytes a signer commits to for this transaction
    pub fn sign_bytes(&self, chain_id: &str) -> Result<Vec<u8>> {
        let doc = SignDoc {
            chain_id,
            account_number: self.account_number.unwrap_or_default(),
            sequence: self.sequence.unwrap_or_default(),
            body: &self.body,
        };
        serde_json::to_vec(&doc).map_err(Error::Encode)
    }

    /// Attach a signature. With `overwrite` any slot held by the same public
    /// key is replaced in place; otherwise the signature is appended.
    pub fn attach_signature(&mut self, record: SignatureRecord, overwrite: bool) {
        if overwrite {
            if let Some(pos) = self
                .signatures
                .iter()
                .position(|s| s.public_key == record.public_key)
            {
                // keep the first slot of this key, drop any later ones
                let mut index = 0;
                self.signatures.retain(|s| {
                    let keep = index <= pos || s.public_key != record.public_key;
                    index += 1;
                    keep
                });
                self.signatures[pos] = record;
                return;
            }
        }
        self.signatures.push(record);
    }

    /// Number of slots signed by `public_key`
    pub fn signature_count(&self, public_key: &[u8]) -> usize {
        self.signatures
            .iter()
            .filter(|s| s.public_key.as_ref() == public_key)
            .count()
    }
}

/// Document serialized to produce the signing payload. serde_json keeps
/// object keys ordered, so the bytes are deterministic for a given input.
#[derive(Debug, Serialize)]
struct SignDoc<'a> {
    chain_id: &'a str,
    account_number: u64,
    sequence: u64,
    body: &'a Value,
}

/// A single signature contribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub public_key: Bytes,
    pub signature: Bytes,
    pub sequence: u64,
    /// Position of the signer in the multisig member list, for multisig
    /// contributions only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multisig_slot: Option<usize>,
}

/// Transaction with at least one signature attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedTransaction(pub UnsignedTransaction);

/// What a processed transaction turns into
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputRecord {
    Signature(SignatureRecord),
    Transaction(SignedTransaction),
}

impl OutputRecord {
    /// Sequence the record was signed with
    pub fn sequence(&self) -> Option<u64> {
        match self {
            OutputRecord::Signature(sig) => Some(sig.sequence),
            OutputRecord::Transaction(tx) => tx.0.sequence,
        }
    }
}

/// Account state on the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub address: Address,
    pub account_number: u64,
    pub sequence: u64,
}

/// Public key of a keyring entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PublicKey {
    /// Compressed secp256k1 point
    Simple(Bytes),
    Multisig(MultisigKey),
}

impl PublicKey {
    pub fn as_simple(&self) -> Option<&Bytes> {
        match self {
            PublicKey::Simple(bytes) => Some(bytes),
            PublicKey::Multisig(_) => None,
        }
    }

    pub fn as_multisig(&self) -> Option<&MultisigKey> {
        match self {
            PublicKey::Multisig(key) => Some(key),
            PublicKey::Simple(_) => None,
        }
    }
}

/// Threshold key over an ordered set of member keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMultisigKey")]
pub struct MultisigKey {
    threshold: usize,
    members: Vec<Bytes>,
}

#[derive(Deserialize)]
struct RawMultisigKey {
    threshold: usize,
    members: Vec<Bytes>,
}

impl TryFrom<RawMultisigKey> for MultisigKey {
    type Error = Error;

    fn try_from(raw: RawMultisigKey) -> Result<Self> {
        MultisigKey::new(raw.threshold, raw.members)
    }
}

impl MultisigKey {
    /// Requires `1 <= threshold <= members.len()` and distinct members
    pub fn new(threshold: usize, members: Vec<Bytes>) -> Result<Self> {
        if threshold == 0 {
            return Err(Error::InvalidMultisigKey("threshold must be at least 1".into()));
        }
        if threshold > members.len() {
            return Err(Error::InvalidMultisigKey(format!(
                "threshold {} exceeds {} members",
                threshold,
                members.len()
            )));
        }
        let mut seen: HashSet<&[u8]> = HashSet::new();
        for member in &members {
            if !seen.insert(member.as_ref()) {
                return Err(Error::InvalidMultisigKey(format!(
                    "duplicate member {:?}",
                    member
                )));
            }
        }
        Ok(Self { threshold, members })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn members(&self) -> &[Bytes] {
        &self.members
    }

    /// Address derived from the threshold and the ordered member keys
    pub fn address(&self) -> Address {
        let mut data = Vec::new();
        data.extend_from_slice(&(self.threshold as u64).to_be_bytes());
        for member in &self.members {
            data.extend_from_slice(member.as_ref());
        }
        Address::from_slice(&keccak256(data)[12..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(byte: u8) -> Bytes {
        Bytes::from(vec![byte; 33])
    }

    fn record(pk: u8, sig: u8, sequence: u64) -> SignatureRecord {
        SignatureRecord {
            public_key: key(pk),
            signature: Bytes::from(vec![sig; 65]),
            sequence,
            multisig_slot: None,
        }
    }

    #[test]
    fn test_multisig_key_rejects_bad_threshold() {
        assert!(MultisigKey::new(0, vec![key(1)]).is_err());
        assert!(MultisigKey::new(3, vec![key(1), key(2)]).is_err());
        assert!(MultisigKey::new(2, vec![key(1), key(2)]).is_ok());
    }

    #[test]
    fn test_multisig_key_rejects_duplicate_members() {
        let err = MultisigKey::new(1, vec![key(1), key(2), key(1)]).unwrap_err();
        assert!(matches!(err, Error::InvalidMultisigKey(_)));
    }

    #[test]
    fn test_multisig_key_deserialization_is_validated() {
        let bad = json!({ "threshold": 4, "members": ["0x01", "0x02"] });
        assert!(serde_json::from_value::<MultisigKey>(bad).is_err());

        let good = json!({ "threshold": 1, "members": ["0x01", "0x02"] });
        let key: MultisigKey = serde_json::from_value(good).unwrap();
        assert_eq!(key.threshold(), 1);
        assert_eq!(key.members().len(), 2);
    }

    #[test]
    fn test_multisig_address_depends_on_member_order() {
        let a = MultisigKey::new(1, vec![key(1), key(2)]).unwrap();
        let b = MultisigKey::new(1, vec![key(2), key(1)]).unwrap();
        assert_ne!(a.address(), b.address());
        assert_eq!(a.address(), a.clone().address());
    }

    #[test]
    fn test_overwrite_replaces_slot_of_same_key() {
        let mut tx = UnsignedTransaction::new(json!({ "msg": "send" }));
        tx.attach_signature(record(1, 0xaa, 0), true);
        tx.attach_signature(record(2, 0xbb, 0), true);
        tx.attach_signature(record(1, 0xcc, 1), true);

        assert_eq!(tx.signatures.len(), 2);
        assert_eq!(tx.signatures[0].signature, Bytes::from(vec![0xcc; 65]));
        assert_eq!(tx.signatures[1].public_key, key(2));
    }

    #[test]
    fn test_append_keeps_every_slot() {
        let mut tx = UnsignedTransaction::new(json!({ "msg": "send" }));
        tx.attach_signature(record(1, 0xaa, 0), false);
        tx.attach_signature(record(1, 0xcc, 1), false);
        assert_eq!(tx.signature_count(key(1).as_ref()), 2);
    }

    #[test]
    fn test_overwrite_collapses_existing_duplicates() {
        let mut tx = UnsignedTransaction::new(json!({}));
        tx.signatures = vec![record(1, 0xaa, 0), record(2, 0xbb, 0), record(1, 0xaa, 1)];
        tx.attach_signature(record(1, 0xdd, 2), true);
        assert_eq!(tx.signature_count(key(1).as_ref()), 1);
        assert_eq!(tx.signatures[0].sequence, 2);
    }

    #[test]
    fn test_sign_bytes_cover_stamp_and_chain() {
        let mut tx = UnsignedTransaction::new(json!({ "b": 2, "a": 1 }));
        tx.stamp(7, 3);
        let bytes = tx.sign_bytes("testing").unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"chain_id":"testing","account_number":7,"sequence":3,"body":{"a":1,"b":2}}"#
        );

        tx.stamp(7, 4);
        assert_ne!(tx.sign_bytes("testing").unwrap(), tx.sign_bytes("other").unwrap());
    }

    #[test]
    fn test_signature_record_round_trip() {
        let mut rec = record(3, 0x11, 42);
        rec.multisig_slot = Some(1);
        let encoded = serde_json::to_string(&rec).unwrap();
        let decoded: SignatureRecord = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, rec);
    }
}
