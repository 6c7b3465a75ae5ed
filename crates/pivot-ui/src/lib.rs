//! Terminal presentation of the fiscal-year pivot.
//!
//! A scrollable [`ratatui`] table viewer with themes, plus a plain-text
//! rendering for line-oriented output.

pub mod app;
pub mod table_view;
pub mod text_view;
pub mod themes;

pub use pivot_core as core;
