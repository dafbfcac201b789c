//! Cohort engine diagnostics and error handling
//!
//! This crate provides the error handling infrastructure shared by every stage of the
//! engine: structured error codes, source locations inside rule expressions, and the
//! run-level error taxonomy.
//!
//! Only errors that stop a run live here. Per-patient failures (unresolvable dates,
//! event-store timeouts) are recovered by exclusion inside the evaluator and never
//! become a [`CohortError`].

mod error;
mod error_code;
mod span;

pub use error::*;
pub use error_code::*;
pub use span::*;

/// Result type for cohort engine operations
pub type Result<T> = std::result::Result<T, CohortError>;
