//! Sample acquisition sources.
//!
//! A [`SampleSource`] produces the reduced per-frame samples the pipeline
//! consumes. Two implementations ship: CSV replay of a recorded session and
//! a synthetic fingertip generator for development without hardware.

mod replay;
mod synthetic;

pub use replay::CsvReplaySource;
pub use synthetic::{SyntheticConfig, SyntheticSource};

use crate::types::Sample;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while acquiring samples.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("I/O error reading sample data: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed sample record at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// A stream of reduced samples.
///
/// `next_sample` returns `Ok(None)` when the source is exhausted; live
/// sources never exhaust and pace themselves internally.
#[async_trait]
pub trait SampleSource: Send {
    async fn next_sample(&mut self) -> Result<Option<Sample>, AcquisitionError>;
}
