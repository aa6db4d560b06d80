#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/crowdcent/numerblox/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod exposure;
pub mod gaussianize;
pub mod linalg;
pub mod neutralizer;
pub mod optimizer;
pub mod penalizer;
pub mod scale;

// Re-export main types
pub use error::{ExposureError, Result};
pub use exposure::{feature_exposures, max_abs};
pub use gaussianize::{GaussianizeConfig, RankGaussianizer};
pub use linalg::PseudoInverseConfig;
pub use neutralizer::OrthogonalNeutralizer;
pub use optimizer::{Adamax, AdamaxConfig};
pub use penalizer::{
    ExposurePenalizer, Penalized, PenaltyConfig, PenaltyReport, StopReason, apply_weights,
};
