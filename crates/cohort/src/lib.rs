//! Derived-variable and rate-measure engine for clinical cohorts
//!
//! A study declares named variables over clinical events and demographic facts, a
//! population rule, and rate measures. This crate compiles such a declaration,
//! evaluates it for every patient of an [`EventStore`], and returns:
//!
//! - a population extract, one row per in-population patient
//! - one table per measure, with small counts suppressed where requested
//! - a run report of excluded patients and unresolved values
//!
//! # Example
//!
//! ```ignore
//! use cohort::{CancellationFlag, EngineConfig, Study};
//!
//! let study = Study::from_json(definition_json, &codelists, EngineConfig::default())?;
//! let output = study.run(&store, index_date, &CancellationFlag::new()).await?;
//! println!("{}", output.to_json()?);
//! ```

pub mod config;
pub mod output;
pub mod runner;
pub mod study;

// Re-export the component crates
pub use cohort_ast as ast;
pub use cohort_diagnostics as diagnostics;
pub use cohort_eval as eval;
pub use cohort_measures as measures;
pub use cohort_parser as parser;

// Convenience re-exports
pub use cohort_ast::{Codelist, CodelistSet, MeasureDef, StudyDefinition, VariableDef};
pub use cohort_diagnostics::{CohortError, Result};
pub use cohort_eval::{EventStore, InMemoryEventStore, PatientId, PatientRecord, Value};
pub use cohort_measures::{CountCell, MeasureTable, SuppressionPolicy};
pub use config::EngineConfig;
pub use output::{ExtractRow, PopulationExtract, RunReport, StudyOutput};
pub use runner::{CancellationFlag, IndexDateRange};
pub use study::Study;
