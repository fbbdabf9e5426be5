//! Output Encoding Module
//!
//! Renders signing results as JSON and writes them to the output sink, one
//! record per line, flushing after every record.

mod encoder;
pub use encoder::{OutputSink, ResultEncoder, open_sink};
