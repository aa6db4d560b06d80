//! Column selection processors
//!
//! Keep a subset of one taxonomy group and every column of the others.

use crate::error::Result;
use crate::processor::Processor;
use numerblox_data::{ColumnGroup, Dataset};
use tracing::debug;

/// Keeps the listed feature columns plus all target, prediction and
/// auxiliary columns
#[derive(Debug, Clone)]
pub struct FeatureSelectionProcessor {
    feature_cols: Vec<String>,
}

impl FeatureSelectionProcessor {
    /// Keep only `feature_cols` among the features.
    pub fn new(feature_cols: Vec<String>) -> Self {
        Self { feature_cols }
    }
}

impl Processor for FeatureSelectionProcessor {
    fn name(&self) -> &str {
        "FeatureSelectionProcessor"
    }

    fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
        keep_group_subset(dataset, ColumnGroup::Feature, &self.feature_cols)
    }
}

/// Keeps the listed target columns plus all feature, prediction and
/// auxiliary columns
#[derive(Debug, Clone)]
pub struct TargetSelectionProcessor {
    target_cols: Vec<String>,
}

impl TargetSelectionProcessor {
    /// Keep only `target_cols` among the targets.
    pub fn new(target_cols: Vec<String>) -> Self {
        Self { target_cols }
    }
}

impl Processor for TargetSelectionProcessor {
    fn name(&self) -> &str {
        "TargetSelectionProcessor"
    }

    fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
        keep_group_subset(dataset, ColumnGroup::Target, &self.target_cols)
    }
}

/// Drop every column of `group` not listed in `keep`, preserving column order.
fn keep_group_subset(dataset: &Dataset, group: ColumnGroup, keep: &[String]) -> Result<Dataset> {
    dataset.require_columns(keep)?;
    let taxonomy = dataset.taxonomy();
    let selected: Vec<String> = dataset
        .frame()
        .get_column_names()
        .into_iter()
        .filter(|name| {
            taxonomy.group_of(name.as_str()) != Some(group) || keep.iter().any(|k| k == name.as_str())
        })
        .map(|name| name.to_string())
        .collect();
    debug!(%group, kept = keep.len(), columns = selected.len(), "selected columns");
    Ok(dataset.select(&selected)?)
}
