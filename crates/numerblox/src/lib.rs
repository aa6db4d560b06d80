#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/crowdcent/numerblox/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod summary;
pub mod synthetic;

// Re-export main types from sub-crates
pub use numerblox_data as data;
pub use numerblox_exposure as exposure;
pub use numerblox_processors as processors;

// Re-export common types
pub use numerblox_data::{Dataset, ErrorKind};
pub use summary::{EraExposure, ExposureSummary, SummaryError};
pub use synthetic::SyntheticPanel;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
