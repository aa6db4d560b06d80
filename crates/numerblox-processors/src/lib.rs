#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/crowdcent/numerblox/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod executor;
pub mod instrument;
pub mod naming;
pub mod pipeline;
pub mod processor;
pub mod processors;
pub mod registry;

// Re-export main types
pub use error::{EraFailure, PipelineError, ProcessorError, Result};
pub use executor::{EraExecutor, EraOutput};
pub use instrument::{Instrumented, StageReport, instrument, instrument_with};
pub use pipeline::Pipeline;
pub use processor::Processor;
pub use processors::{
    EraPenalty, FeatureNeutralizer, FeaturePenalizer, FeatureSelectionProcessor, MeanEnsembler,
    ReduceMemoryProcessor, TargetSelectionProcessor, WarmStart, warm_start_from,
};
pub use registry::{
    ProcessorCategory, ProcessorInfo, available_processors, count_by_category,
    get_processor_info, processors_by_category,
};
