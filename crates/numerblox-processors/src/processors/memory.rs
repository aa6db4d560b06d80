//! Reduce Memory Processor
//!
//! Narrows numeric columns whose values fit a smaller type: `Float64` to
//! `Float32` and `Int64` to `Int32`. Other dtypes are left alone.

use crate::error::Result;
use crate::processor::Processor;
use numerblox_data::Dataset;
use polars::prelude::*;
use tracing::info;

/// Shrinks numeric dtypes where the column range allows it
#[derive(Debug, Clone, Copy, Default)]
pub struct ReduceMemoryProcessor;

impl ReduceMemoryProcessor {
    /// Create the processor.
    pub const fn new() -> Self {
        Self
    }
}

impl Processor for ReduceMemoryProcessor {
    fn name(&self) -> &str {
        "ReduceMemoryProcessor"
    }

    fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
        let frame = dataset.frame();
        let before = frame.estimated_size();

        let columns = frame
            .get_columns()
            .iter()
            .map(narrow)
            .collect::<PolarsResult<Vec<Column>>>()
            .map_err(numerblox_data::DataError::from)?;
        let reduced = DataFrame::new(columns).map_err(numerblox_data::DataError::from)?;

        let after = reduced.estimated_size();
        let saved = if before == 0 {
            0.0
        } else {
            100.0 * (before as f64 - after as f64) / before as f64
        };
        info!(
            before_mb = before as f64 / 1024f64.powi(2),
            after_mb = after as f64 / 1024f64.powi(2),
            saved_pct = saved,
            "reduced memory usage"
        );
        Ok(dataset.derive(reduced)?)
    }
}

fn narrow(column: &Column) -> PolarsResult<Column> {
    match column.dtype() {
        DataType::Float64 => {
            let values = column.f64()?;
            let fits = values
                .into_iter()
                .flatten()
                .all(|v| !v.is_finite() || v.abs() <= f64::from(f32::MAX));
            if fits {
                column.cast(&DataType::Float32)
            } else {
                Ok(column.clone())
            }
        }
        DataType::Int64 => {
            let values = column.i64()?;
            let fits = values
                .into_iter()
                .flatten()
                .all(|v| i32::try_from(v).is_ok());
            if fits {
                column.cast(&DataType::Int32)
            } else {
                Ok(column.clone())
            }
        }
        _ => Ok(column.clone()),
    }
}
