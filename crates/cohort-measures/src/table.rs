//! Measure output tables

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Group label for patients whose group-by variable is unresolved
pub const MISSING_GROUP: &str = "(missing)";

/// Label of the single row of an unstratified measure
pub const POPULATION_GROUP: &str = "population";

/// Group values, one per group-by variable; empty for an unstratified measure
pub type GroupKey = SmallVec<[String; 2]>;

/// One emitted count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountCell {
    /// Exact count
    Count(u64),
    /// Count rounded to protect a suppressed neighbour
    Rounded(u64),
    /// Redacted small count
    Suppressed,
}

impl CountCell {
    /// The emitted number, if any
    pub fn value(&self) -> Option<u64> {
        match self {
            Self::Count(n) | Self::Rounded(n) => Some(*n),
            Self::Suppressed => None,
        }
    }

    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed)
    }

    pub fn is_rounded(&self) -> bool {
        matches!(self, Self::Rounded(_))
    }
}

impl fmt::Display for CountCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) | Self::Rounded(n) => write!(f, "{}", n),
            Self::Suppressed => f.write_str("[REDACTED]"),
        }
    }
}

/// `numerator / denominator`; `None` for a zero denominator or a redacted count
pub fn rate(numerator: CountCell, denominator: CountCell) -> Option<Decimal> {
    let n = numerator.value()?;
    let d = denominator.value()?;
    Decimal::from(n).checked_div(Decimal::from(d))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureRow {
    pub group: GroupKey,
    pub numerator: CountCell,
    pub denominator: CountCell,
    pub rate: Option<Decimal>,
}

impl MeasureRow {
    pub fn new(group: GroupKey, numerator: u64, denominator: u64) -> Self {
        let numerator = CountCell::Count(numerator);
        let denominator = CountCell::Count(denominator);
        Self {
            group,
            numerator,
            denominator,
            rate: rate(numerator, denominator),
        }
    }

    /// Display label of the group: values joined by `", "`
    pub fn group_label(&self) -> String {
        if self.group.is_empty() {
            POPULATION_GROUP.to_string()
        } else {
            self.group.join(", ")
        }
    }
}

/// All rows of one measure, ordered by group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureTable {
    pub measure_id: String,
    /// Group-by variables; empty for an unstratified measure
    pub group_by: Vec<String>,
    pub rows: Vec<MeasureRow>,
    /// Small-number suppression has been applied to the rows
    #[serde(default)]
    pub suppression_applied: bool,
}

impl MeasureTable {
    pub fn new(measure_id: impl Into<String>, group_by: Vec<String>, rows: Vec<MeasureRow>) -> Self {
        Self {
            measure_id: measure_id.into(),
            group_by,
            rows,
            suppression_applied: false,
        }
    }

    pub fn row(&self, group: &[&str]) -> Option<&MeasureRow> {
        self.rows
            .iter()
            .find(|row| row.group.iter().map(String::as_str).eq(group.iter().copied()))
    }

    pub fn numerators(&self) -> Vec<CountCell> {
        self.rows.iter().map(|r| r.numerator).collect()
    }

    pub fn denominators(&self) -> Vec<CountCell> {
        self.rows.iter().map(|r| r.denominator).collect()
    }

    pub fn suppressed_cells(&self) -> usize {
        self.rows
            .iter()
            .map(|r| usize::from(r.numerator.is_suppressed()) + usize::from(r.denominator.is_suppressed()))
            .sum()
    }
}
