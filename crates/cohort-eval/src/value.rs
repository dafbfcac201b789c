//! Resolved per-patient values

use chrono::NaiveDate;
use cohort_ast::{DatePrecision, Literal};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Value of one variable for one patient
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Unresolved: no data, failed date resolution, or an undefined operation
    #[default]
    Missing,
    Bool(bool),
    Number(Decimal),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn number(n: impl Into<Decimal>) -> Self {
        Self::Number(n.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Truthiness used by boolean connectives, rule matching and numerators.
    ///
    /// Missing is false, numbers are true when non-zero, text is true unless empty
    /// or `"0"`, and a date is always true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Missing => false,
            Self::Bool(b) => *b,
            Self::Number(n) => !n.is_zero(),
            Self::Text(s) => !s.is_empty() && s != "0",
            Self::Date(_) => true,
        }
    }

    /// Numeric view: numbers, booleans as 0/1, and text that parses as a number
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Bool(b) => Some(Decimal::from(u8::from(*b))),
            Self::Text(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
    }

    /// Date view: dates, and text in ISO `YYYY-MM-DD` form
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Order two values, coercing text to a number or a date when the other side
    /// is one. `None` when either side is missing or the kinds cannot be compared.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Missing, _) | (_, Self::Missing) => None,
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Date(_), _) | (_, Self::Date(_)) => {
                Some(self.as_date()?.cmp(&other.as_date()?))
            }
            _ => Some(self.as_number()?.cmp(&other.as_number()?)),
        }
    }

    /// Group label of a resolved value; `None` when missing
    pub fn label(&self) -> Option<String> {
        match self {
            Self::Missing => None,
            Self::Bool(true) => Some("1".to_string()),
            Self::Bool(false) => Some("0".to_string()),
            Self::Number(n) => Some(n.normalize().to_string()),
            Self::Text(s) => Some(s.clone()),
            Self::Date(d) => Some(DatePrecision::Day.format(*d)),
        }
    }

    /// Extract cell rendering; dates are cut to the column's precision
    pub fn render(&self, precision: DatePrecision) -> String {
        match self {
            Self::Date(d) => precision.format(*d),
            other => other.label().unwrap_or_default(),
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Boolean(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::Text(s.clone()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(date: NaiveDate) -> Self {
        Value::Date(date)
    }
}

impl From<Option<NaiveDate>> for Value {
    fn from(date: Option<NaiveDate>) -> Self {
        date.map_or(Value::Missing, Value::Date)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => f.write_str(&label),
            None => f.write_str("<missing>"),
        }
    }
}
