//! Relative date expressions
//!
//! Study declarations express periods relative to the index date, e.g.
//! `last_day_of_month(index_date)` or `first_day_of_month(index_date) - 1 day`.
//! A [`DateExpr`] is an anchor, an optional calendar boundary applied to it, and at
//! most one signed offset.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateExpr {
    pub anchor: DateAnchor,
    pub boundary: Option<PeriodBoundary>,
    pub offset: Option<DateOffset>,
}

impl DateExpr {
    pub fn new(anchor: DateAnchor) -> Self {
        Self {
            anchor,
            boundary: None,
            offset: None,
        }
    }

    pub fn index_date() -> Self {
        Self::new(DateAnchor::IndexDate)
    }

    pub fn with_boundary(mut self, boundary: PeriodBoundary) -> Self {
        self.boundary = Some(boundary);
        self
    }

    pub fn with_offset(mut self, amount: i32, unit: DateUnit) -> Self {
        self.offset = Some(DateOffset { amount, unit });
        self
    }

    /// Name of the variable this expression is anchored to, if any
    pub fn anchor_variable(&self) -> Option<&str> {
        match &self.anchor {
            DateAnchor::Variable(name) => Some(name),
            _ => None,
        }
    }
}

/// What a relative date is computed from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateAnchor {
    /// The evaluation pass's index date
    IndexDate,
    /// The run's reference "today"
    Today,
    /// A literal ISO date
    Literal(NaiveDate),
    /// The resolved date of a declared variable (e.g. `prostate_ca_date`)
    Variable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodBoundary {
    FirstDayOfMonth,
    LastDayOfMonth,
    FirstDayOfYear,
    LastDayOfYear,
}

impl PeriodBoundary {
    pub const fn function_name(&self) -> &'static str {
        match self {
            Self::FirstDayOfMonth => "first_day_of_month",
            Self::LastDayOfMonth => "last_day_of_month",
            Self::FirstDayOfYear => "first_day_of_year",
            Self::LastDayOfYear => "last_day_of_year",
        }
    }

    pub fn from_function_name(name: &str) -> Option<Self> {
        match name {
            "first_day_of_month" => Some(Self::FirstDayOfMonth),
            "last_day_of_month" => Some(Self::LastDayOfMonth),
            "first_day_of_year" => Some(Self::FirstDayOfYear),
            "last_day_of_year" => Some(Self::LastDayOfYear),
            _ => None,
        }
    }
}

/// Signed calendar offset; negative amounts move backwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateOffset {
    pub amount: i32,
    pub unit: DateUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateUnit {
    Days,
    Months,
    Years,
}

impl DateUnit {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Months => "months",
            Self::Years => "years",
        }
    }
}

impl fmt::Display for DateAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateAnchor::IndexDate => f.write_str("index_date"),
            DateAnchor::Today => f.write_str("today"),
            DateAnchor::Literal(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            DateAnchor::Variable(name) => f.write_str(name),
        }
    }
}

impl fmt::Display for DateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.boundary {
            Some(boundary) => write!(f, "{}({})", boundary.function_name(), self.anchor)?,
            None => write!(f, "{}", self.anchor)?,
        }
        if let Some(offset) = &self.offset {
            let sign = if offset.amount < 0 { '-' } else { '+' };
            write!(f, " {} {} {}", sign, offset.amount.unsigned_abs(), offset.unit.as_str())?;
        }
        Ok(())
    }
}

/// Precision at which a date value is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DatePrecision {
    #[default]
    Year,
    Month,
    Day,
}

impl DatePrecision {
    /// Render a date at this precision (`2019`, `2019-03`, `2019-03-01`)
    pub fn format(&self, date: NaiveDate) -> String {
        match self {
            DatePrecision::Year => format!("{:04}", date.year()),
            DatePrecision::Month => format!("{:04}-{:02}", date.year(), date.month()),
            DatePrecision::Day => format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day()),
        }
    }
}

/// Declared output format of a date-returning variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateFormat {
    #[serde(rename = "YYYY")]
    Year,
    #[serde(rename = "YYYY-MM")]
    YearMonth,
    #[serde(rename = "YYYY-MM-DD")]
    YearMonthDay,
}

impl From<DateFormat> for DatePrecision {
    fn from(format: DateFormat) -> Self {
        match format {
            DateFormat::Year => DatePrecision::Year,
            DateFormat::YearMonth => DatePrecision::Month,
            DateFormat::YearMonthDay => DatePrecision::Day,
        }
    }
}
