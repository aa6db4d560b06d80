//! Processor Registry
//!
//! Static catalogue of the available processors, used for listings and
//! lookup by name.

use std::collections::HashMap;

/// Processor categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorCategory {
    /// Column subsetting
    Selection,
    /// Combining prediction columns
    Ensemble,
    /// Exposure control on predictions
    Exposure,
    /// Storage footprint
    Memory,
}

/// Processor metadata
#[derive(Debug, Clone)]
pub struct ProcessorInfo {
    /// Processor name, as returned by `Processor::name`
    pub name: &'static str,
    /// Processor category
    pub category: ProcessorCategory,
    /// Brief description of what the processor does
    pub description: &'static str,
    /// Pattern of the column the processor writes, if any
    pub output_column: Option<&'static str>,
}

/// Get all available processor info
pub fn available_processors() -> Vec<ProcessorInfo> {
    vec![
        ProcessorInfo {
            name: "FeatureSelectionProcessor",
            category: ProcessorCategory::Selection,
            description: "Keep listed features plus all target, prediction and aux columns",
            output_column: None,
        },
        ProcessorInfo {
            name: "TargetSelectionProcessor",
            category: ProcessorCategory::Selection,
            description: "Keep listed targets plus all feature, prediction and aux columns",
            output_column: None,
        },
        ProcessorInfo {
            name: "MeanEnsembler",
            category: ProcessorCategory::Ensemble,
            description: "Row-wise mean of several prediction columns",
            output_column: Some("prediction*"),
        },
        ProcessorInfo {
            name: "FeatureNeutralizer",
            category: ProcessorCategory::Exposure,
            description: "Remove a proportion of linear feature exposure per era",
            output_column: Some("<pred>_neutralized_<proportion>"),
        },
        ProcessorInfo {
            name: "FeaturePenalizer",
            category: ProcessorCategory::Exposure,
            description: "Cap per-feature exposure per era with a fitted linear correction",
            output_column: Some("prediction_<pred>_<model>_FP_<max_exposure>"),
        },
        ProcessorInfo {
            name: "ReduceMemoryProcessor",
            category: ProcessorCategory::Memory,
            description: "Narrow Float64 and Int64 columns whose values fit",
            output_column: None,
        },
    ]
}

/// Get processors by category
pub fn processors_by_category(category: ProcessorCategory) -> Vec<ProcessorInfo> {
    available_processors()
        .into_iter()
        .filter(|p| p.category == category)
        .collect()
}

/// Get processor info by name
pub fn get_processor_info(name: &str) -> Option<ProcessorInfo> {
    available_processors().into_iter().find(|p| p.name == name)
}

/// Count processors by category
pub fn count_by_category() -> HashMap<ProcessorCategory, usize> {
    let mut counts = HashMap::new();
    for processor in available_processors() {
        *counts.entry(processor.category).or_insert(0) += 1;
    }
    counts
}
