//! Concrete pipeline stages.

pub mod ensemble;
pub mod memory;
pub mod neutralize;
pub mod penalize;
pub mod select;

pub use ensemble::MeanEnsembler;
pub use memory::ReduceMemoryProcessor;
pub use neutralize::FeatureNeutralizer;
pub use penalize::{EraPenalty, FeaturePenalizer, WarmStart, warm_start_from};
pub use select::{FeatureSelectionProcessor, TargetSelectionProcessor};

use crate::error::{ProcessorError, Result};
use ndarray::Array2;
use numerblox_data::Dataset;

/// Feature columns of `dataset` as a rows × features matrix.
///
/// # Errors
/// [`ProcessorError::InvalidConfig`] for an empty feature list.
pub(crate) fn exposure_matrix(dataset: &Dataset, features: &[String]) -> Result<Array2<f64>> {
    if features.is_empty() {
        return Err(ProcessorError::InvalidConfig(
            "no feature columns to measure exposure against".to_string(),
        ));
    }
    Ok(dataset.matrix(features)?)
}
