//! Mean Ensembler
//!
//! Row-wise mean of several prediction columns.

use crate::error::{ProcessorError, Result};
use crate::processor::Processor;
use ndarray::Axis;
use numerblox_data::Dataset;
use tracing::info;

/// Averages `cols` into a new prediction column
#[derive(Debug, Clone)]
pub struct MeanEnsembler {
    cols: Vec<String>,
    final_col_name: String,
}

impl MeanEnsembler {
    /// Average `cols` into `final_col_name`.
    ///
    /// # Errors
    /// [`ProcessorError::InvalidConfig`] if `cols` is empty or the output
    /// name does not start with `prediction`.
    pub fn new(cols: Vec<String>, final_col_name: impl Into<String>) -> Result<Self> {
        let final_col_name = final_col_name.into();
        if !final_col_name.starts_with("prediction") {
            return Err(ProcessorError::InvalidConfig(format!(
                "final column name should start with 'prediction', got '{final_col_name}'"
            )));
        }
        if cols.is_empty() {
            return Err(ProcessorError::InvalidConfig(
                "no columns to ensemble".to_string(),
            ));
        }
        Ok(Self {
            cols,
            final_col_name,
        })
    }
}

impl Processor for MeanEnsembler {
    fn name(&self) -> &str {
        "MeanEnsembler"
    }

    fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
        let values = dataset.matrix(&self.cols)?;
        let mean = values
            .mean_axis(Axis(1))
            .map(|m| m.to_vec())
            .unwrap_or_default();
        info!(cols = ?self.cols, column = %self.final_col_name, "ensembled with simple mean");
        Ok(dataset.with_f64_column(&self.final_col_name, mean)?)
    }
}
