//! Multisig Membership Module
//!
//! Signing on behalf of a multisig key is only allowed for keys that are
//! members of it. The check runs before the signer is asked for anything.

mod validator;
pub use validator::{MultisigValidator, is_member, member_index};
