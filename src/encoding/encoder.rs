use crate::{
    error::{Error, Result},
    OutputRecord,
};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Destination of encoded records
pub type OutputSink = Box<dyn AsyncWrite + Unpin + Send>;

/// Open the output sink: the given file, created or truncated, or stdout
pub async fn open_sink(output_document: Option<&Path>) -> Result<OutputSink> {
    match output_document {
        Some(path) => {
            debug!("Writing output to {}", path.display());
            let file = File::create(path).await?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

/// Writes one JSON document per line to `W`
pub struct ResultEncoder<W> {
    writer: W,
    written: usize,
}

impl<W: AsyncWrite + Unpin> ResultEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Deterministic JSON for a record: the bare signature when signing
    /// signature-only, the whole signed transaction otherwise
    pub fn encode(record: &OutputRecord) -> Result<Vec<u8>> {
        serde_json::to_vec(record).map_err(Error::Encode)
    }

    /// Encode and write a record, then flush so it survives a later failure
    pub async fn write_record(&mut self, record: &OutputRecord) -> Result<()> {
        let mut line = Self::encode(record)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        self.written += 1;
        Ok(())
    }

    /// Records written so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Close the sink, folding a close failure into `outcome`
    pub async fn finish<T>(mut self, outcome: Result<T>) -> Result<T> {
        let closed = self.writer.shutdown().await;
        Error::compose_close(outcome, closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SignatureRecord, SignedTransaction, UnsignedTransaction};
    use ethers::types::Bytes;
    use serde_json::json;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    fn signature(sequence: u64) -> SignatureRecord {
        SignatureRecord {
            public_key: Bytes::from(vec![2; 33]),
            signature: Bytes::from(vec![7; 65]),
            sequence,
            multisig_slot: None,
        }
    }

    /// Accepts writes but fails to shut down
    struct BrokenClose(Vec<u8>);

    impl AsyncWrite for BrokenClose {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.0.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::other("close failed")))
        }
    }

    #[tokio::test]
    async fn test_one_record_per_line() {
        let mut out = Vec::new();
        let mut encoder = ResultEncoder::new(&mut out);
        encoder
            .write_record(&OutputRecord::Signature(signature(0)))
            .await
            .unwrap();
        encoder
            .write_record(&OutputRecord::Signature(signature(1)))
            .await
            .unwrap();
        assert_eq!(encoder.written(), 2);

        drop(encoder);

        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: SignatureRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second, signature(1));
    }

    #[test]
    fn test_signature_only_document_round_trips() {
        let record = signature(42);
        let bytes = ResultEncoder::<Vec<u8>>::encode(&OutputRecord::Signature(record.clone())).unwrap();
        let decoded: SignatureRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, record);
        assert!(!String::from_utf8(bytes).unwrap().contains("body"));
    }

    #[test]
    fn test_full_document_contains_transaction() {
        let mut tx = UnsignedTransaction::new(json!({ "amount": "10" }));
        tx.stamp(3, 4);
        tx.signatures.push(signature(4));
        let bytes =
            ResultEncoder::<Vec<u8>>::encode(&OutputRecord::Transaction(SignedTransaction(tx.clone())))
                .unwrap();
        let decoded: UnsignedTransaction = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(
            bytes,
            ResultEncoder::<Vec<u8>>::encode(&OutputRecord::Transaction(SignedTransaction(tx))).unwrap()
        );
    }

    #[tokio::test]
    async fn test_close_error_is_reported() {
        let encoder = ResultEncoder::new(BrokenClose(Vec::new()));
        let err = encoder.finish(Ok(())).await.unwrap_err();
        assert!(matches!(err, Error::Close { pending: None, .. }));

        let encoder = ResultEncoder::new(BrokenClose(Vec::new()));
        let err = encoder
            .finish::<()>(Err(Error::Signing {
                signer: "alice".into(),
                reason: "denied".into(),
            }))
            .await
            .unwrap_err();
        assert!(matches!(err.root(), Error::Signing { .. }));
    }

    #[tokio::test]
    async fn test_file_sink_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, "stale contents that must disappear\n").unwrap();

        let mut encoder = ResultEncoder::new(open_sink(Some(path.as_path())).await.unwrap());
        encoder
            .write_record(&OutputRecord::Signature(signature(9)))
            .await
            .unwrap();
        encoder.finish(Ok(())).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("stale"));
        assert_eq!(written.lines().count(), 1);
    }
}
