//! Relative date resolution
//!
//! A [`DateExpr`] resolves in three steps: the anchor becomes a calendar date, the
//! optional boundary function snaps it to the start or end of its month or year, and
//! the optional offset moves it. Month and year offsets clamp to the end of the
//! target month (`2020-01-31 + 1 month` is `2020-02-29`).

use crate::context::ResolvedVars;
use crate::error::DateResolutionError;
use chrono::{Datelike, Months, NaiveDate, TimeDelta};
use cohort_ast::{DateAnchor, DateExpr, DateUnit, PeriodBoundary};
use cohort_parser::parse_date_expression;

/// Resolves relative dates for one evaluation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateResolver {
    index_date: NaiveDate,
    today: NaiveDate,
}

impl DateResolver {
    pub fn new(index_date: NaiveDate, today: NaiveDate) -> Self {
        Self { index_date, today }
    }

    pub fn index_date(&self) -> NaiveDate {
        self.index_date
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn resolve(
        &self,
        expr: &DateExpr,
        vars: &ResolvedVars,
    ) -> Result<NaiveDate, DateResolutionError> {
        let anchor = match &expr.anchor {
            DateAnchor::IndexDate => self.index_date,
            DateAnchor::Today => self.today,
            DateAnchor::Literal(date) => *date,
            DateAnchor::Variable(name) => vars.get(name).as_date().ok_or_else(|| {
                DateResolutionError::UnresolvedAnchor { name: name.clone() }
            })?,
        };

        let date = match expr.boundary {
            Some(boundary) => apply_boundary(anchor, boundary),
            None => Some(anchor),
        };

        let date = match (date, expr.offset) {
            (Some(date), Some(offset)) => apply_offset(date, offset.amount, offset.unit),
            (date, None) => date,
            (None, Some(_)) => None,
        };

        date.ok_or_else(|| DateResolutionError::OutOfRange {
            expression: expr.to_string(),
        })
    }

    /// Parse and resolve in one step
    pub fn resolve_str(
        &self,
        source: &str,
        vars: &ResolvedVars,
    ) -> Result<NaiveDate, DateResolutionError> {
        let expr =
            parse_date_expression(source).map_err(|e| DateResolutionError::MalformedLiteral {
                expression: source.to_string(),
                reason: e.to_string(),
            })?;
        self.resolve(&expr, vars)
    }
}

fn apply_boundary(date: NaiveDate, boundary: PeriodBoundary) -> Option<NaiveDate> {
    let year = date.year();
    match boundary {
        PeriodBoundary::FirstDayOfMonth => date.with_day(1),
        PeriodBoundary::LastDayOfMonth => {
            NaiveDate::from_ymd_opt(year, date.month(), days_in_month(year, date.month()))
        }
        PeriodBoundary::FirstDayOfYear => NaiveDate::from_ymd_opt(year, 1, 1),
        PeriodBoundary::LastDayOfYear => NaiveDate::from_ymd_opt(year, 12, 31),
    }
}

fn apply_offset(date: NaiveDate, amount: i32, unit: DateUnit) -> Option<NaiveDate> {
    let months = match unit {
        DateUnit::Days => return date.checked_add_signed(TimeDelta::try_days(i64::from(amount))?),
        DateUnit::Months => amount.unsigned_abs(),
        DateUnit::Years => amount.unsigned_abs().checked_mul(12)?,
    };
    if amount < 0 {
        date.checked_sub_months(Months::new(months))
    } else {
        date.checked_add_months(Months::new(months))
    }
}

pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 31,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}
