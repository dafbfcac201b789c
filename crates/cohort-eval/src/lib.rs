//! Cohort rule evaluation
//!
//! This crate turns a compiled study into per-patient values:
//!
//! - [`Value`]: typed resolved values (boolean, number, text, date, missing)
//! - [`DateResolver`]: relative dates against an index date
//! - [`CompiledExpression`]: the rule-expression interpreter
//! - [`Categoriser`] and [`PopulationFilter`]: rule sets built on expressions
//! - [`VariableGraph`]: dependency ordering and memoized per-patient evaluation
//! - [`EventStore`]: the query surface over clinical data, with an in-memory store
//!
//! # Missing values
//!
//! Evaluation follows a false-on-missing rule rather than full three-valued logic.
//! Comparisons against a missing value are false, a missing value is falsy under
//! `AND`, `OR` and `NOT`, and arithmetic involving one is missing. Population
//! membership additionally requires every referenced variable to be resolved.

pub mod categorise;
pub mod context;
pub mod date;
pub mod error;
pub mod expression;
pub mod graph;
pub mod population;
pub mod store;
pub mod value;

pub use categorise::{CategoryRule, Categoriser};
pub use context::{EvaluationContext, ResolvedVars};
pub use date::DateResolver;
pub use error::{DateResolutionError, EventStoreError};
pub use expression::{CompiledExpression, evaluate};
pub use graph::{DATE_OF_MATCH_SUFFIX, ExtractColumn, MatchPolicy, VariableGraph};
pub use population::PopulationFilter;
pub use store::{
    ClinicalEvent, DateRange, EventQuery, EventSource, EventStore, Fact, InMemoryEventStore,
    PatientId, PatientRecord, StoreFailure,
};
pub use value::Value;
