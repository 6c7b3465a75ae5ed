//! Runtime layer for the enrollment pivot.
//!
//! Drives the data layer for the two entry points: a one-shot batch run over
//! an input directory and a long-lived upload session that keeps the most
//! recent result for download.

pub mod batch;
pub mod session;

#[cfg(test)]
pub(crate) mod fixtures;

pub use pivot_core as core;
pub use pivot_data as data;
