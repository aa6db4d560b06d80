//! Era partitioning
//!
//! Splits a dataset into per-era row groups and reassembles per-era results
//! in the dataset's original row order. Nothing computed for one era may
//! depend on another, so this module is the only place where rows from
//! different eras meet again.

use crate::dataset::Dataset;
use crate::error::{DataError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Value of the era column for one group
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EraKey {
    /// Integer era (compared numerically)
    Int(i64),
    /// Any other era representation (compared lexicographically)
    Text(String),
}

impl fmt::Display for EraKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Iteration order of era groups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EraOrder {
    /// Ascending by era key
    #[default]
    Ascending,
    /// Order of first appearance in the dataset
    FirstSeen,
}

/// Rows sharing one era value, in original row order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EraGroup {
    /// Era value
    pub key: EraKey,
    /// Row indices into the source dataset, ascending
    pub rows: Vec<usize>,
}

impl EraGroup {
    /// Number of rows in the era.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the era is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Per-era output destined for [`EraPartitioner::recombine`]
#[derive(Debug, Clone)]
pub struct EraFragment<T> {
    /// Era the values belong to
    pub key: EraKey,
    /// Source row of each value
    pub rows: Vec<usize>,
    /// Processed values, aligned with `rows`
    pub values: Vec<T>,
}

/// Groups rows by era and puts per-era results back together
#[derive(Debug, Clone, Copy, Default)]
pub struct EraPartitioner {
    order: EraOrder,
}

impl EraPartitioner {
    /// Create a partitioner with the given era order.
    pub const fn new(order: EraOrder) -> Self {
        Self { order }
    }

    /// Configured era order.
    pub const fn order(&self) -> EraOrder {
        self.order
    }

    /// Partition a dataset on its era column.
    pub fn partition(&self, dataset: &Dataset) -> Result<Vec<EraGroup>> {
        self.partition_column(dataset.frame(), dataset.era_col()?)
    }

    /// Partition a frame on `era_col`.
    ///
    /// Integer era columns produce [`EraKey::Int`]; every other dtype is
    /// rendered as text. Null era values are rejected.
    pub fn partition_column(&self, frame: &DataFrame, era_col: &str) -> Result<Vec<EraGroup>> {
        let keys = era_keys(frame, era_col)?;

        let mut index: HashMap<EraKey, usize> = HashMap::new();
        let mut groups: Vec<EraGroup> = Vec::new();
        for (row, key) in keys.into_iter().enumerate() {
            match index.get(&key) {
                Some(&slot) => groups[slot].rows.push(row),
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push(EraGroup {
                        key,
                        rows: vec![row],
                    });
                }
            }
        }

        if self.order == EraOrder::Ascending {
            groups.sort_by(|a, b| a.key.cmp(&b.key));
        }
        debug!(era_col, eras = groups.len(), rows = frame.height(), "partitioned by era");
        Ok(groups)
    }

    /// Reassemble per-era fragments into one vector in original row order.
    ///
    /// # Errors
    /// * [`DataError::FragmentLength`] if a fragment's values and rows differ in length
    /// * [`DataError::DuplicateRow`] if two fragments claim the same row
    /// * [`DataError::RowCountMismatch`] if the fragments do not cover exactly `n_rows` rows
    pub fn recombine<T>(&self, fragments: Vec<EraFragment<T>>, n_rows: usize) -> Result<Vec<T>> {
        let produced: usize = fragments.iter().map(|f| f.values.len()).sum();
        if produced != n_rows {
            return Err(DataError::RowCountMismatch {
                expected: n_rows,
                actual: produced,
            });
        }

        let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(n_rows).collect();
        for fragment in fragments {
            if fragment.rows.len() != fragment.values.len() {
                return Err(DataError::FragmentLength {
                    era: fragment.key.to_string(),
                    rows: fragment.rows.len(),
                    values: fragment.values.len(),
                });
            }
            for (row, value) in fragment.rows.into_iter().zip(fragment.values) {
                let slot = slots.get_mut(row).ok_or(DataError::RowCountMismatch {
                    expected: n_rows,
                    actual: row + 1,
                })?;
                if slot.replace(value).is_some() {
                    return Err(DataError::DuplicateRow { row });
                }
            }
        }

        // Equal totals without duplicates means every slot is filled.
        slots
            .into_iter()
            .map(|slot| {
                slot.ok_or(DataError::RowCountMismatch {
                    expected: n_rows,
                    actual: produced,
                })
            })
            .collect()
    }
}

fn era_keys(frame: &DataFrame, era_col: &str) -> Result<Vec<EraKey>> {
    let column = frame
        .column(era_col)
        .map_err(|_| DataError::MissingColumn(era_col.to_string()))?;
    let null_error = |row: usize| DataError::InvalidColumn {
        column: era_col.to_string(),
        reason: format!("null era at row {row}"),
    };

    if column.dtype().is_integer() {
        let values = column.cast(&DataType::Int64)?;
        values
            .i64()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| v.map(EraKey::Int).ok_or_else(|| null_error(row)))
            .collect()
    } else {
        let values = column.cast(&DataType::String)?;
        values
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.map(|s| EraKey::Text(s.to_string()))
                    .ok_or_else(|| null_error(row))
            })
            .collect()
    }
}
