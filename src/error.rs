//! Error Module
//!
//! Every failure a signing run can end with. A run never retries: the first
//! error is returned to the caller together with whatever output was already
//! written.

use thiserror::Error;

/// Convenience alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A transaction record in the input stream could not be decoded
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The line is not a valid unsigned transaction document
    #[error("line {line}: malformed transaction: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    /// Empty lines are reported rather than skipped
    #[error("line {line}: blank line in transaction stream")]
    BlankLine { line: usize },
    #[error("line {line}: not valid UTF-8")]
    InvalidUtf8 { line: usize },
}

/// Terminal error of a sign or sign-batch run
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("account lookup failed: {0}")]
    AccountLookup(String),

    #[error("signing key {signer} is not a member of multisig key {multisig}")]
    MultisigMembership { signer: String, multisig: String },

    #[error("signer {signer} failed: {reason}")]
    Signing { signer: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Closing the output document failed. `pending` holds the error that
    /// was already on its way out when the close was attempted.
    #[error(
        "failed to close output document: {source}{}",
        .pending.as_ref().map(|e| format!(" (after: {e})")).unwrap_or_default()
    )]
    Close {
        #[source]
        source: std::io::Error,
        pending: Option<Box<Error>>,
    },

    #[error("keyring: {0}")]
    Keyring(String),

    #[error("offline mode requires an explicit {0}")]
    MissingAccountInfo(&'static str),

    #[error("invalid multisig key: {0}")]
    InvalidMultisigKey(String),

    #[error("failed to encode output: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("sequence overflow after {0}")]
    SequenceOverflow(u64),
}

impl Error {
    /// Combine the outcome of a run with the outcome of closing its output.
    pub fn compose_close<T>(
        pending: Result<T>,
        closed: std::io::Result<()>,
    ) -> Result<T> {
        match (pending, closed) {
            (pending, Ok(())) => pending,
            (Ok(_), Err(source)) => Err(Error::Close {
                source,
                pending: None,
            }),
            (Err(pending), Err(source)) => Err(Error::Close {
                source,
                pending: Some(Box::new(pending)),
            }),
        }
    }

    /// The error that caused the run to fail, looking through close failures.
    pub fn root(&self) -> &Error {
        match self {
            Error::Close {
                pending: Some(pending),
                ..
            } => pending.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn close_error_keeps_pending_error() {
        let pending: Result<()> = Err(Error::MultisigMembership {
            signer: "alice".into(),
            multisig: "team".into(),
        });
        let closed = Err(io::Error::other("disk gone"));

        let err = Error::compose_close(pending, closed).unwrap_err();
        assert!(matches!(err, Error::Close { pending: Some(_), .. }));
        assert!(matches!(err.root(), Error::MultisigMembership { .. }));
        let message = err.to_string();
        assert!(message.contains("disk gone"));
        assert!(message.contains("not a member"));
    }

    #[test]
    fn clean_close_passes_result_through() {
        let ok = Error::compose_close(Ok(7), Ok(())).unwrap();
        assert_eq!(ok, 7);

        let err = Error::compose_close::<()>(Ok(()), Err(io::Error::other("busy"))).unwrap_err();
        assert!(matches!(err, Error::Close { pending: None, .. }));
    }
}
