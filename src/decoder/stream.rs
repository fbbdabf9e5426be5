//! Newline-delimited transaction stream
//!
//! Each line of the input holds one unsigned transaction document. The decoder
//! hands them out one at a time and stops for good at the first line it cannot
//! decode, remembering why it stopped so the caller can tell a partial batch
//! from a complete one.

use crate::{
    error::{DecodeError, Error, Result},
    UnsignedTransaction,
};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::{debug, warn};

/// Input path meaning "read standard input"
const STDIN: &str = "-";

/// Lazy decoder over newline-delimited unsigned transactions
pub struct TransactionDecoder<R> {
    reader: R,
    /// Raw bytes of the current line, newline included
    buf: Vec<u8>,
    /// 1-based number of the last line read
    line: usize,
    /// Why the stream stopped early, if it did
    error: Option<Error>,
    finished: bool,
}

impl<R: AsyncBufRead + Unpin> TransactionDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line: 0,
            error: None,
            finished: false,
        }
    }

    /// Decode the next transaction.
    ///
    /// Returns `None` at end of input or after the first failure; once it has
    /// returned `None` it keeps doing so.
    pub async fn next_tx(&mut self) -> Option<UnsignedTransaction> {
        if self.finished {
            return None;
        }

        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf).await {
            Ok(0) => {
                debug!("Transaction stream exhausted after {} lines", self.line);
                self.finished = true;
                return None;
            }
            Ok(_) => {}
            Err(e) => {
                self.fail(Error::Io(e));
                return None;
            }
        }
        self.line += 1;

        // invalid UTF-8 fails the line it is on
        let text = match std::str::from_utf8(&self.buf) {
            Ok(text) => text.trim_end_matches(['\n', '\r']),
            Err(_) => {
                self.fail(DecodeError::InvalidUtf8 { line: self.line }.into());
                return None;
            }
        };

        if text.trim().is_empty() {
            self.fail(DecodeError::BlankLine { line: self.line }.into());
            return None;
        }

        match serde_json::from_str::<UnsignedTransaction>(text) {
            Ok(tx) => Some(tx),
            Err(source) => {
                self.fail(
                    DecodeError::Malformed {
                        line: self.line,
                        source,
                    }
                    .into(),
                );
                None
            }
        }
    }

    /// Take the error that ended the stream. Yields it at most once.
    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    /// Whether the stream ended because of an error rather than end of input
    pub fn stopped_on_error(&self) -> bool {
        self.error.is_some()
    }

    /// Number of lines consumed so far
    pub fn lines_read(&self) -> usize {
        self.line
    }

    fn fail(&mut self, error: Error) {
        warn!("Transaction stream stopped: {}", error);
        self.finished = true;
        self.error = Some(error);
    }
}

/// Decode one whole transaction document
pub fn decode_document(bytes: &[u8]) -> Result<UnsignedTransaction> {
    serde_json::from_slice(bytes)
        .map_err(|source| DecodeError::Malformed { line: 1, source }.into())
}

/// Open `path` for line-by-line reading, `-` meaning standard input
pub async fn open_input(path: &str) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if path == STDIN {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = File::open(path).await?;
    Ok(Box::new(BufReader::new(file)))
}

/// Read a whole input document, `-` meaning standard input
pub async fn read_document(path: &str) -> Result<Vec<u8>> {
    if path == STDIN {
        let mut buf = Vec::new();
        tokio::io::stdin().read_to_end(&mut buf).await?;
        return Ok(buf);
    }
    Ok(tokio::fs::read(path).await?)
}
