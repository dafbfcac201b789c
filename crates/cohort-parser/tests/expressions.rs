//! Tests for the rule expression grammar
//!
//! Covers:
//! - Precedence of NOT, comparisons, AND and OR
//! - Arithmetic on numeric literals
//! - Literals and case-insensitive keywords
//! - Error locations

use cohort_ast::{BinaryOp, Expression, Literal, UnaryOp};
use cohort_diagnostics::CohortError;
use cohort_parser::parse_expression;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn parse_expr(input: &str) -> Expression {
    parse_expression(input).unwrap_or_else(|e| panic!("Failed to parse '{}': {}", input, e))
}

fn assert_binary_op(expr: &Expression) -> (&Expression, BinaryOp, &Expression) {
    match expr {
        Expression::BinaryOp(b) => (&b.left, b.op, &b.right),
        other => panic!("Expected binary operation, got {:?}", other),
    }
}

// === Precedence ===

#[rstest]
#[case("a OR b AND c", "(a OR (b AND c))")]
#[case("a AND b OR c", "((a AND b) OR c)")]
#[case("NOT a AND b", "((NOT a) AND b)")]
#[case("NOT x = 1", "((NOT x) = 1)")]
#[case("NOT (x = 1)", "(NOT (x = 1))")]
#[case("age >= 65 AND age < 75", "((age >= 65) AND (age < 75))")]
#[case("1 + 2 * 3", "(1 + (2 * 3))")]
#[case("(1 + 2) * 3", "((1 + 2) * 3)")]
#[case("10 - 4 - 3", "((10 - 4) - 3)")]
#[case("-imd < 0", "((-imd) < 0)")]
fn test_precedence(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(parse_expr(input).to_string(), expected);
}

#[rstest]
#[case("x = 1", BinaryOp::Equal)]
#[case("x == 1", BinaryOp::Equal)]
#[case("x != 1", BinaryOp::NotEqual)]
#[case("x <> 1", BinaryOp::NotEqual)]
#[case("x < 1", BinaryOp::Less)]
#[case("x <= 1", BinaryOp::LessOrEqual)]
#[case("x > 1", BinaryOp::Greater)]
#[case("x >= 1", BinaryOp::GreaterOrEqual)]
#[case("x>=1", BinaryOp::GreaterOrEqual)]
fn test_comparison_operators(#[case] input: &str, #[case] expected: BinaryOp) {
    let expr = parse_expr(input);
    let (_, op, _) = assert_binary_op(&expr);
    assert_eq!(op, expected);
}

#[test]
fn test_population_rule() {
    let expr = parse_expr(
        r#"
        (age >=18 AND age <= 120) AND
        (NOT died) AND
        (sex = 'M') AND
        prostate_ca
        "#,
    );
    assert_eq!(
        expr.referenced_variables(),
        vec!["age", "died", "sex", "prostate_ca"]
    );
}

#[test]
fn test_quintile_cut_points() {
    let expr = parse_expr("imd >= 0 AND imd < 32844*1/5");
    let (_, op, right) = assert_binary_op(&expr);
    assert_eq!(op, BinaryOp::And);
    let (_, _, bound) = assert_binary_op(right);
    assert!(bound.is_constant());
}

// === Literals ===

#[rstest]
#[case("TRUE", Literal::Boolean(true))]
#[case("false", Literal::Boolean(false))]
#[case("42", Literal::number(42))]
#[case("\"M\"", Literal::string("M"))]
#[case("'unclassified'", Literal::string("unclassified"))]
fn test_literals(#[case] input: &str, #[case] expected: Literal) {
    assert_eq!(parse_expr(input), Expression::literal(expected));
}

#[test]
fn test_keywords_case_insensitive() {
    assert_eq!(parse_expr("a and not b").to_string(), "(a AND (NOT b))");
    assert_eq!(parse_expr("a Or b").to_string(), "(a OR b)");
}

#[test]
fn test_identifier_with_keyword_prefix() {
    assert_eq!(parse_expr("order_date"), Expression::variable("order_date"));
    assert_eq!(parse_expr("notable"), Expression::variable("notable"));
}

#[test]
fn test_double_not() {
    let expr = parse_expr("NOT NOT a");
    match expr {
        Expression::UnaryOp(u) => {
            assert_eq!(u.op, UnaryOp::Not);
            assert_eq!(u.operand.to_string(), "(NOT a)");
        }
        other => panic!("Expected unary operation, got {:?}", other),
    }
}

// === Errors ===

#[rstest]
#[case("")]
#[case("age >=")]
#[case("(age > 1")]
#[case("a AND")]
#[case("a b")]
#[case("age > 1 > 2")]
#[case("\"unterminated")]
fn test_rejected(#[case] input: &str) {
    let err = parse_expression(input).unwrap_err();
    assert!(err.code().is_parse_error(), "unexpected error {:?}", err);
}

#[test]
fn test_error_location() {
    match parse_expression("age >= 18 AND ?") {
        Err(CohortError::Parse { location, .. }) => {
            let location = location.expect("parse errors carry a location");
            assert_eq!(location.line, 1);
            assert_eq!(location.offset, 14);
        }
        other => panic!("Expected parse error, got {:?}", other),
    }
}
