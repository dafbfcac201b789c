//! Tests for rule expression evaluation
//!
//! Covers:
//! - Comparison coercion between text, numbers and dates
//! - False-on-missing semantics
//! - Arithmetic and constant folding

use chrono::NaiveDate;
use cohort_diagnostics::{COH0103, COH0104};
use cohort_eval::{CompiledExpression, ResolvedVars, Value};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn vars() -> ResolvedVars {
    [
        ("age", Value::number(70)),
        ("sex", Value::text("M")),
        ("eth", Value::text("1")),
        ("prostate_ca", Value::Bool(true)),
        ("died", Value::Bool(false)),
        ("imd", Value::number(12300)),
        ("dx_date", Value::Date(NaiveDate::from_ymd_opt(2019, 3, 1).unwrap())),
        ("bmi", Value::Missing),
    ]
    .into_iter()
    .collect()
}

fn eval(source: &str) -> Value {
    CompiledExpression::compile("test", source)
        .unwrap_or_else(|e| panic!("'{}' did not compile: {}", source, e))
        .evaluate(&vars())
}

#[rstest]
#[case("age >= 18 AND age <= 120 AND sex = \"M\" AND prostate_ca", true)]
#[case("age >= 65 AND age < 75", true)]
#[case("NOT died", true)]
#[case("eth = 1", true)]
#[case("eth = '1'", true)]
#[case("eth != 2", true)]
#[case("sex = 'F' OR prostate_ca", true)]
#[case("imd >= 32844*1/5 AND imd < 32844*2/5", true)]
#[case("dx_date >= '2019-01-01'", true)]
#[case("dx_date < '2019-03-01'", false)]
#[case("prostate_ca = 1", true)]
#[case("died = 0", true)]
fn test_rules(#[case] source: &str, #[case] expected: bool) {
    assert_eq!(eval(source), Value::Bool(expected), "{}", source);
}

#[rstest]
#[case("bmi > 30", false)]
#[case("bmi <= 30", false)]
#[case("bmi = bmi", false)]
#[case("bmi != 30", false)]
#[case("undeclared_here", false)]
#[case("NOT bmi", true)]
#[case("bmi OR prostate_ca", true)]
#[case("bmi AND prostate_ca", false)]
fn test_missing_values(#[case] source: &str, #[case] expected: bool) {
    assert_eq!(eval(source).is_truthy(), expected, "{}", source);
}

#[rstest]
#[case("age + 5", Value::number(75))]
#[case("imd / 100", Value::number(123))]
#[case("-age", Value::number(-70))]
#[case("bmi * 2", Value::Missing)]
#[case("age / (imd - 12300)", Value::Missing)]
#[case("sex + 1", Value::Missing)]
fn test_arithmetic(#[case] source: &str, #[case] expected: Value) {
    assert_eq!(eval(source), expected, "{}", source);
}

#[test]
fn test_constant_division_by_zero_rejected() {
    let err = CompiledExpression::compile("imd_q1", "imd < 32844/0").unwrap_err();
    assert_eq!(err.code(), COH0104);
    assert!(err.is_config_error());
}

#[test]
fn test_constant_text_arithmetic_rejected() {
    let err = CompiledExpression::compile("bad", "'a' + 1 > 0").unwrap_err();
    assert_eq!(err.code(), COH0103);
}

#[test]
fn test_references_in_order() {
    let compiled =
        CompiledExpression::compile("population", "registered AND NOT died AND age >= 18").unwrap();
    assert_eq!(compiled.references(), ["registered", "died", "age"].map(String::from));
}
