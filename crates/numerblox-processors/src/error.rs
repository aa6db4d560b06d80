//! Error types for processors and pipelines.

use numerblox_data::{DataError, EraKey, ErrorKind};
use numerblox_exposure::ExposureError;
use std::fmt;
use thiserror::Error;

/// Result type for processors.
pub type Result<T> = std::result::Result<T, ProcessorError>;

/// One era that failed during fan-out
#[derive(Debug)]
pub struct EraFailure {
    /// Era value
    pub era: EraKey,
    /// Cause
    pub source: ExposureError,
}

impl fmt::Display for EraFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "era {}: {}", self.era, self.source)
    }
}

/// Errors raised by a single processor
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Schema, column or recombination error
    #[error(transparent)]
    Data(#[from] DataError),

    /// Numerical error outside per-era fan-out
    #[error(transparent)]
    Exposure(#[from] ExposureError),

    /// One or more eras failed; every failure is listed
    #[error("{} era(s) failed: {}", .0.len(), join_failures(.0))]
    Eras(Vec<EraFailure>),

    /// Invalid processor configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ProcessorError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Data(e) => e.kind(),
            Self::Exposure(e) => e.kind(),
            Self::Eras(failures) => failures
                .first()
                .map_or(ErrorKind::Numerical, |f| f.source.kind()),
            Self::InvalidConfig(_) => ErrorKind::Validation,
        }
    }
}

fn join_failures(failures: &[EraFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Pipeline failure, tagged with the stage that raised it
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage failed; later stages were not run
    #[error("Stage {index} ({processor}) failed: {source}")]
    Stage {
        /// Processor name
        processor: String,
        /// Position in the pipeline
        index: usize,
        /// Underlying error
        #[source]
        source: ProcessorError,
    },
}

impl PipelineError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Stage { source, .. } => source.kind(),
        }
    }

    /// Name of the failing processor.
    pub fn processor(&self) -> &str {
        match self {
            Self::Stage { processor, .. } => processor,
        }
    }
}
