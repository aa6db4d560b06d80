//! Glue between the CLI and the numerblox crates.
//!
//! Builds the neutralize/penalize pipeline from command-line options and
//! collects the reports the `simulate` command prints.

pub(crate) mod simulation;
