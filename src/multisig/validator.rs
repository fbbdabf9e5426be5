use crate::{
    error::{Error, Result},
    keyring::KeyRecord,
    MultisigKey,
};
use tracing::{debug, warn};

/// Slot of `candidate` in the member ordering of `key`
///
/// # Arguments
/// * `key` - The multisig key whose members are searched
/// * `candidate` - Encoded public key of the would-be signer
///
/// # Returns
/// * `Some(slot)` for the first member equal to `candidate`
/// * `None` if `candidate` is not a member
pub fn member_index(key: &MultisigKey, candidate: &[u8]) -> Option<usize> {
    key.members().iter().position(|m| m.as_ref() == candidate)
}

/// Whether `candidate` is one of the members of `key`
pub fn is_member(key: &MultisigKey, candidate: &[u8]) -> bool {
    member_index(key, candidate).is_some()
}

/// Membership check against one target multisig key
#[derive(Debug, Clone)]
pub struct MultisigValidator {
    target: String,
    key: MultisigKey,
}

impl MultisigValidator {
    /// Fails if `target` is not a multisig key
    pub fn new(target: &KeyRecord) -> Result<Self> {
        let key = target.public_key.as_multisig().cloned().ok_or_else(|| {
            Error::Keyring(format!("{} is not a multisig key", target.name))
        })?;
        Ok(Self {
            target: target.name.clone(),
            key,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Slot of `signer` in the member ordering, or a membership error
    pub fn validate(&self, signer: &KeyRecord) -> Result<usize> {
        let rejected = || Error::MultisigMembership {
            signer: signer.name.clone(),
            multisig: self.target.clone(),
        };

        let candidate = signer.public_key.as_simple().ok_or_else(rejected)?;
        let Some(slot) = member_index(&self.key, candidate) else {
            warn!("{} is not a member of multisig {}", signer.name, self.target);
            return Err(rejected());
        };

        debug!("{} signs multisig {} in slot {}", signer.name, self.target, slot);
        Ok(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PublicKey;
    use ethers::types::{Address, Bytes};

    fn simple(name: &str, byte: u8) -> KeyRecord {
        KeyRecord {
            name: name.into(),
            address: Address::repeat_byte(byte),
            public_key: PublicKey::Simple(Bytes::from(vec![byte; 33])),
        }
    }

    fn team(members: &[u8]) -> KeyRecord {
        let key = MultisigKey::new(
            1,
            members.iter().map(|b| Bytes::from(vec![*b; 33])).collect(),
        )
        .unwrap();
        KeyRecord {
            name: "team".into(),
            address: key.address(),
            public_key: PublicKey::Multisig(key),
        }
    }

    #[test]
    fn test_is_member_uses_exact_bytes() {
        let record = team(&[1, 2]);
        let key = record.public_key.as_multisig().unwrap();
        assert!(is_member(key, &[1; 33]));
        assert!(!is_member(key, &[1; 32]));
        assert!(!is_member(key, &[3; 33]));
    }

    #[test]
    fn test_member_index_follows_member_order() {
        let record = team(&[5, 1, 9]);
        let key = record.public_key.as_multisig().unwrap();
        assert_eq!(member_index(key, &[5; 33]), Some(0));
        assert_eq!(member_index(key, &[9; 33]), Some(2));
        assert_eq!(member_index(key, &[7; 33]), None);
    }

    #[test]
    fn test_member_gets_its_slot() {
        let validator = MultisigValidator::new(&team(&[5, 1, 9])).unwrap();
        assert_eq!(validator.validate(&simple("alice", 1)).unwrap(), 1);
        assert_eq!(validator.validate(&simple("carol", 9)).unwrap(), 2);
    }

    #[test]
    fn test_non_member_is_rejected() {
        let validator = MultisigValidator::new(&team(&[1, 2])).unwrap();
        let err = validator.validate(&simple("mallory", 7)).unwrap_err();
        assert!(matches!(
            err,
            Error::MultisigMembership { ref signer, ref multisig } if signer == "mallory" && multisig == "team"
        ));
    }

    #[test]
    fn test_target_must_be_multisig() {
        assert!(matches!(
            MultisigValidator::new(&simple("alice", 1)),
            Err(Error::Keyring(_))
        ));
    }

    #[test]
    fn test_multisig_signer_is_rejected() {
        let validator = MultisigValidator::new(&team(&[1, 2])).unwrap();
        assert!(validator.validate(&team(&[1, 2])).is_err());
    }
}
