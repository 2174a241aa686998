//! Data reduction and layout engine for QC report charts.
//!
//! Turns raw per-sample metric values into bounded, renderer-ready bar,
//! scatter and violin descriptions.

pub mod cli;
pub mod core;
pub mod report;
