//! Tests for relative date expressions

use chrono::NaiveDate;
use cohort_ast::{DateAnchor, DateExpr, DateUnit, PeriodBoundary};
use cohort_parser::parse_date_expression;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[rstest]
#[case("index_date", DateExpr::index_date())]
#[case("today", DateExpr::new(DateAnchor::Today))]
#[case("2015-01-01", DateExpr::new(DateAnchor::Literal(date(2015, 1, 1))))]
#[case(
    "last_day_of_month(index_date)",
    DateExpr::index_date().with_boundary(PeriodBoundary::LastDayOfMonth)
)]
#[case(
    "first_day_of_month(index_date) - 1 day",
    DateExpr::index_date()
        .with_boundary(PeriodBoundary::FirstDayOfMonth)
        .with_offset(-1, DateUnit::Days)
)]
#[case(
    "index_date + 2 years",
    DateExpr::index_date().with_offset(2, DateUnit::Years)
)]
#[case(
    "  first_day_of_year( 2020-06-15 ) -3 Months ",
    DateExpr::new(DateAnchor::Literal(date(2020, 6, 15)))
        .with_boundary(PeriodBoundary::FirstDayOfYear)
        .with_offset(-3, DateUnit::Months)
)]
#[case(
    "prostate_ca_date",
    DateExpr::new(DateAnchor::Variable("prostate_ca_date".into()))
)]
fn test_date_expressions(#[case] input: &str, #[case] expected: DateExpr) {
    assert_eq!(parse_date_expression(input).unwrap(), expected);
}

#[rstest]
#[case("")]
#[case("2021-13-01")]
#[case("2021-02-29")]
#[case("21-01-01")]
#[case("last_day_of_month index_date")]
#[case("last_day_of_month(index_date")]
#[case("index_date - day")]
#[case("index_date - 1 fortnight")]
#[case("index_date + 1 day + 1 day")]
fn test_rejected(#[case] input: &str) {
    let err = parse_date_expression(input).unwrap_err();
    assert!(err.code().is_parse_error(), "unexpected error {:?}", err);
}

#[test]
fn test_display_matches_source_form() {
    let expr = parse_date_expression("first_day_of_month(index_date) - 1 days").unwrap();
    assert_eq!(expr.to_string(), "first_day_of_month(index_date) - 1 days");
}
