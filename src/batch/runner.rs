//! Batch Runner Module
//!
//! Drives a whole sign or sign-batch run:
//!
//! `Init -> ResolvingAccount -> Streaming -> Complete | Failed`
//!
//! Records are written as soon as they are signed, so a run that fails part
//! way keeps everything emitted before the failure. The output sink is closed
//! on every path and a close failure never hides the error that ended the run.

use super::{BatchState, SigningOrchestrator};
use crate::{
    config::SignOptions,
    decoder::{TransactionDecoder, decode_document, open_input, read_document},
    encoding::{ResultEncoder, open_sink},
    error::Result,
    keyring::Keyring,
    sequence::AccountRetriever,
    OutputRecord,
};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, error, info, warn};

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Init,
    ResolvingAccount,
    Streaming,
    Complete,
    Failed,
}

/// Summary of a successful batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    /// Number of records written
    pub signed: usize,
    /// Sequence the next transaction of this account would use
    pub next_sequence: u64,
}

/// Sign every transaction of `decoder`, writing each record as it is produced.
///
/// Stops at the first failure. A decode failure is reported after the
/// records before it have been written.
pub async fn sign_stream<K, R, W>(
    orchestrator: &mut SigningOrchestrator<'_, K>,
    decoder: &mut TransactionDecoder<R>,
    encoder: &mut ResultEncoder<W>,
) -> Result<usize>
where
    K: Keyring + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(tx) = decoder.next_tx().await {
        let record = orchestrator.process(tx).await?;
        encoder.write_record(&record).await?;
    }

    if decoder.stopped_on_error() {
        warn!(
            "Input stopped at line {} after {} signed records",
            decoder.lines_read(),
            encoder.written()
        );
    } else {
        debug!("Read {} input lines", decoder.lines_read());
    }

    match decoder.take_error() {
        Some(e) => Err(e),
        None => Ok(encoder.written()),
    }
}

/// One sign or sign-batch run
pub struct BatchRunner<'a, K: ?Sized, A: ?Sized> {
    opts: &'a SignOptions,
    keyring: &'a K,
    retriever: &'a A,
    phase: BatchPhase,
}

impl<'a, K, A> BatchRunner<'a, K, A>
where
    K: Keyring + ?Sized,
    A: AccountRetriever + ?Sized,
{
    pub fn new(opts: &'a SignOptions, keyring: &'a K, retriever: &'a A) -> Self {
        Self {
            opts,
            keyring,
            retriever,
            phase: BatchPhase::Init,
        }
    }

    pub fn phase(&self) -> BatchPhase {
        self.phase
    }

    /// Sign the newline-delimited transactions of `input` into `sink`.
    /// The sink is shut down before returning.
    pub async fn run<R, W>(&mut self, input: R, sink: W) -> Result<BatchReport>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut decoder = TransactionDecoder::new(input);
        let mut encoder = ResultEncoder::new(sink);

        let outcome = self.stream(&mut decoder, &mut encoder).await;
        let outcome = encoder.finish(outcome).await;
        self.settle(&outcome);

        if let Ok(report) = &outcome {
            info!(
                "Signed {} transactions, next sequence {}",
                report.signed, report.next_sequence
            );
        }
        outcome
    }

    /// Sign a single transaction document
    pub async fn sign_document(&mut self, document: &[u8]) -> Result<OutputRecord> {
        let outcome = self.sign_one(document).await;
        self.settle(&outcome);
        outcome
    }

    async fn stream<R, W>(
        &mut self,
        decoder: &mut TransactionDecoder<R>,
        encoder: &mut ResultEncoder<W>,
    ) -> Result<BatchReport>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut orchestrator = self.orchestrator().await?;
        self.enter(BatchPhase::Streaming);
        let signed = sign_stream(&mut orchestrator, decoder, encoder).await?;
        Ok(BatchReport {
            signed,
            next_sequence: orchestrator.state().tracker.sequence(),
        })
    }

    async fn sign_one(&mut self, document: &[u8]) -> Result<OutputRecord> {
        let tx = decode_document(document)?;
        let mut orchestrator = self.orchestrator().await?;
        self.enter(BatchPhase::Streaming);
        orchestrator.process(tx).await
    }

    async fn orchestrator(&mut self) -> Result<SigningOrchestrator<'a, K>> {
        self.enter(BatchPhase::ResolvingAccount);
        let signer = self.keyring.key(&self.opts.from)?;
        let state = BatchState::resolve(self.opts, &signer, self.keyring, self.retriever).await?;
        SigningOrchestrator::new(self.keyring, signer, state)
    }

    fn settle<T>(&mut self, outcome: &Result<T>) {
        match outcome {
            Ok(_) => self.enter(BatchPhase::Complete),
            Err(e) => {
                error!("Signing run failed: {}", e);
                self.enter(BatchPhase::Failed);
            }
        }
    }

    fn enter(&mut self, phase: BatchPhase) {
        debug!("Run phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }
}

/// `sign-batch`: sign every line of `input` (`-` for stdin)
///
/// # Arguments
/// * `opts` - Options of the run
/// * `keyring` - Holds the signing key named by `opts.from`
/// * `retriever` - Account source used when signing online
/// * `input` - Path of the newline-delimited input, or `-`
///
/// # Returns
/// * `Ok(BatchReport)` once every line was signed and the output closed
/// * `Err` with the first failure; records before it are already written
pub async fn run_batch<K, A>(
    opts: &SignOptions,
    keyring: &K,
    retriever: &A,
    input: &str,
) -> Result<BatchReport>
where
    K: Keyring + ?Sized,
    A: AccountRetriever + ?Sized,
{
    let sink = open_sink(opts.output_document.as_deref()).await?;
    let reader = match open_input(input).await {
        Ok(reader) => reader,
        Err(e) => return ResultEncoder::new(sink).finish(Err(e)).await,
    };
    BatchRunner::new(opts, keyring, retriever)
        .run(reader, sink)
        .await
}

/// `sign`: sign the single transaction document at `input` (`-` for stdin).
/// The output document is only created once signing succeeded.
pub async fn run_single<K, A>(
    opts: &SignOptions,
    keyring: &K,
    retriever: &A,
    input: &str,
) -> Result<OutputRecord>
where
    K: Keyring + ?Sized,
    A: AccountRetriever + ?Sized,
{
    let document = read_document(input).await?;
    let record = BatchRunner::new(opts, keyring, retriever)
        .sign_document(&document)
        .await?;

    let mut encoder = ResultEncoder::new(open_sink(opts.output_document.as_deref()).await?);
    let written = encoder.write_record(&record).await;
    encoder.finish(written).await?;
    Ok(record)
}
