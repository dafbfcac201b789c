//! Relative date expression parser
//!
//! ```text
//! date_expr := base offset?
//! base      := boundary '(' anchor ')' | anchor
//! anchor    := ISO-date | 'index_date' | 'today' | identifier
//! offset    := ('+' | '-') digits unit
//! unit      := day | days | month | months | year | years
//! ```

use crate::combinators::{Input, PResult, identifier, to_cohort_error, ws};
use chrono::NaiveDate;
use cohort_ast::{DateAnchor, DateExpr, DateUnit, PeriodBoundary};
use cohort_diagnostics::Result;
use winnow::ascii::{Caseless, digit1};
use winnow::combinator::{alt, cut_err, delimited, opt, preceded, terminated};
use winnow::error::{StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{literal, take_while};

/// Parse a relative date expression such as `last_day_of_month(index_date) - 1 month`
pub fn parse_date_expression(source: &str) -> Result<DateExpr> {
    delimited(ws, date_expression, ws)
        .parse(source)
        .map_err(|e| to_cohort_error(e, source))
}

fn date_expression(input: &mut Input<'_>) -> PResult<DateExpr> {
    let mut expr = base(input)?;
    if let Some((amount, unit)) = opt(preceded(ws, offset)).parse_next(input)? {
        expr = expr.with_offset(amount, unit);
    }
    Ok(expr)
}

fn base(input: &mut Input<'_>) -> PResult<DateExpr> {
    if let Some(date) = opt(iso_date).parse_next(input)? {
        return Ok(DateExpr::new(DateAnchor::Literal(date)));
    }

    let name = identifier
        .context(StrContext::Expected(StrContextValue::Description(
            "date, anchor or boundary function",
        )))
        .parse_next(input)?;

    match PeriodBoundary::from_function_name(name) {
        Some(boundary) => {
            let anchor = cut_err(delimited(
                (ws, '('),
                preceded(ws, anchor),
                (ws, ')'),
            ))
            .context(StrContext::Expected(StrContextValue::Description(
                "parenthesised anchor",
            )))
            .parse_next(input)?;
            Ok(DateExpr::new(anchor).with_boundary(boundary))
        }
        None => Ok(DateExpr::new(named_anchor(name))),
    }
}

fn anchor(input: &mut Input<'_>) -> PResult<DateAnchor> {
    alt((iso_date.map(DateAnchor::Literal), identifier.map(named_anchor))).parse_next(input)
}

fn named_anchor(name: &str) -> DateAnchor {
    match name {
        "index_date" => DateAnchor::IndexDate,
        "today" => DateAnchor::Today,
        other => DateAnchor::Variable(other.to_string()),
    }
}

/// `YYYY-MM-DD`; calendar-invalid dates such as `2021-02-30` are rejected
fn iso_date(input: &mut Input<'_>) -> PResult<NaiveDate> {
    (
        take_while(4, |c: char| c.is_ascii_digit()),
        '-',
        take_while(2, |c: char| c.is_ascii_digit()),
        '-',
        take_while(2, |c: char| c.is_ascii_digit()),
    )
        .verify_map(|(y, _, m, _, d): (&str, char, &str, char, &str)| {
            NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
        })
        .parse_next(input)
}

fn offset(input: &mut Input<'_>) -> PResult<(i32, DateUnit)> {
    let sign = alt(('+'.value(1i32), '-'.value(-1i32))).parse_next(input)?;
    let amount = cut_err(preceded(ws, digit1.try_map(str::parse::<i32>)))
        .context(StrContext::Expected(StrContextValue::Description("offset amount")))
        .parse_next(input)?;
    let unit = cut_err(preceded(ws, unit))
        .context(StrContext::Expected(StrContextValue::Description(
            "day, month or year",
        )))
        .parse_next(input)?;
    Ok((sign * amount, unit))
}

fn unit(input: &mut Input<'_>) -> PResult<DateUnit> {
    terminated(
        alt((
            literal(Caseless("day")).value(DateUnit::Days),
            literal(Caseless("month")).value(DateUnit::Months),
            literal(Caseless("year")).value(DateUnit::Years),
        )),
        opt(alt(('s', 'S'))),
    )
    .parse_next(input)
}
