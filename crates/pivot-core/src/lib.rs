//! Domain types shared by every enrollment-pivot crate.
//!
//! Holds the error type, fiscal period arithmetic, the versioned input
//! schemas, the group-key / snapshot / pivot models, CLI settings and the
//! small number-formatting helpers used by the summary output.

pub mod error;
pub mod formatting;
pub mod models;
pub mod period;
pub mod schema;
pub mod settings;
