//! Abstract syntax tree and declarative model for cohort rule sets
//!
//! Two layers live here:
//!
//! - the parsed form of the embedded mini-languages: boolean/arithmetic
//!   [`Expression`]s used by categorisation and population rules, and relative
//!   [`DateExpr`]essions such as `first_day_of_month(index_date) - 1 day`
//! - the declarative study model ([`StudyDefinition`], [`VariableDef`], [`MeasureDef`])
//!   exactly as written by study authors, with expressions still held as source text
//!
//! Compiling the declarative model into an evaluable graph is the job of `cohort-eval`.

mod codelist;
mod date;
mod expression;
mod literal;
mod operator;
mod study;

pub use codelist::*;
pub use date::*;
pub use expression::*;
pub use literal::*;
pub use operator::*;
pub use study::*;

/// Type alias for boxed expressions
pub type BoxExpr = Box<Expression>;
