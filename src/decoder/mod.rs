//! Transaction Decoding Module
//!
//! This module turns the input stream into unsigned transactions:
//! - TransactionDecoder: lazy, forward-only reader over newline-delimited JSON
//! - decode_document: a single whole-file transaction for the `sign` command

mod stream;

pub use stream::{TransactionDecoder, decode_document, open_input, read_document};
