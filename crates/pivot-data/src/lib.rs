//! Data layer for the enrollment pivot.
//!
//! Reads enrollment workbooks, decodes rows through a versioned schema,
//! classifies and counts active enrollments for one target month, stores
//! the monthly snapshots and merges them into the fiscal-year pivot.

pub mod aggregator;
pub mod classifier;
pub mod decoder;
pub mod exporter;
pub mod pivot;
pub mod reader;
pub mod sheet;
pub mod store;

pub use pivot_core as core;
