//! Error types for dataset operations.

use crate::taxonomy::ColumnGroup;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Coarse classification shared by every numerblox error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad parameter range, missing column, group overlap or shape mismatch.
    Validation,
    /// Row bookkeeping broke during per-era recombination.
    Integrity,
    /// Pseudo-inverse failure, optimizer divergence or non-finite values.
    Numerical,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Integrity => "integrity",
            Self::Numerical => "numerical",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while classifying, reading or reassembling a dataset.
#[derive(Debug, Error)]
pub enum DataError {
    /// A requested column is not part of the dataset
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A column would land in two taxonomy groups
    #[error("Column '{column}' belongs to both the {first} and {second} groups")]
    GroupOverlap {
        /// Offending column
        column: String,
        /// First group the column matched
        first: ColumnGroup,
        /// Second group the column matched
        second: ColumnGroup,
    },

    /// The dataset has no recognizable era column
    #[error("No era column found (looked for {candidates:?})")]
    MissingEraColumn {
        /// Column names that were tried
        candidates: Vec<String>,
    },

    /// A column holds values the operation cannot use
    #[error("Invalid column '{column}': {reason}")]
    InvalidColumn {
        /// Column name
        column: String,
        /// Why the column was rejected
        reason: String,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Recombined fragments do not cover the dataset exactly
    #[error("Row count mismatch after recombination: expected {expected}, got {actual}")]
    RowCountMismatch {
        /// Rows in the source dataset
        expected: usize,
        /// Rows produced by the fragments
        actual: usize,
    },

    /// A fragment reported a row that another fragment already filled
    #[error("Row {row} produced more than once during recombination")]
    DuplicateRow {
        /// Index of the duplicated row
        row: usize,
    },

    /// A fragment carried a different number of values than row indices
    #[error("Era {era} produced {values} values for {rows} rows")]
    FragmentLength {
        /// Era the fragment belongs to
        era: String,
        /// Row indices in the fragment
        rows: usize,
        /// Values in the fragment
        values: usize,
    },

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

impl DataError {
    /// Classify the error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RowCountMismatch { .. } | Self::DuplicateRow { .. } | Self::FragmentLength { .. } => {
                ErrorKind::Integrity
            }
            _ => ErrorKind::Validation,
        }
    }
}
