#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/crowdcent/numerblox/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod dataset;
pub mod era;
pub mod error;
pub mod taxonomy;

pub use dataset::Dataset;
pub use era::{EraFragment, EraGroup, EraKey, EraOrder, EraPartitioner};
pub use error::{DataError, ErrorKind, Result};
pub use taxonomy::{ColumnGroup, ColumnTaxonomy, TaxonomyRules};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
