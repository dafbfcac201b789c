//! Rate measures over a filtered population
//!
//! [`MeasureAggregator`] counts numerator and denominator patients per group with a
//! parallel fold over the resolved population. [`SuppressionEngine`] then redacts
//! small counts in the emitted tables; the resolved data itself is never altered.

pub mod aggregate;
pub mod suppression;
pub mod table;

pub use aggregate::{GroupTally, MeasureAggregator, aggregate_measure};
pub use suppression::{SuppressionEngine, SuppressionPolicy, round_half_even};
pub use table::{CountCell, GroupKey, MISSING_GROUP, MeasureRow, MeasureTable, POPULATION_GROUP, rate};
