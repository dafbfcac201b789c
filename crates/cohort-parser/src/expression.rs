//! Expression parser using recursive descent with precedence climbing
//!
//! Precedence, lowest first:
//!
//! | level | operators                      |
//! |-------|--------------------------------|
//! | 1     | `OR`                           |
//! | 2     | `AND`                          |
//! | 3     | `=` `!=` `<` `<=` `>` `>=`     |
//! | 4     | prefix `NOT`                   |
//! | 5     | `+` `-`                        |
//! | 6     | `*` `/`                        |
//! | 7     | prefix `-`                     |
//!
//! `NOT` binds tighter than comparisons, so `NOT a = b` reads `(NOT a) = b`.
//! Comparisons do not chain.

use crate::combinators::{
    Input, PResult, identifier, keyword, number, padded_keyword, string_literal, to_cohort_error,
    ws,
};
use cohort_ast::{BinaryOp, Expression, Literal, UnaryOp};
use cohort_diagnostics::Result;
use winnow::combinator::{alt, cut_err, delimited, opt, preceded};
use winnow::error::{StrContext, StrContextValue};
use winnow::prelude::*;

/// Parse a complete rule expression
pub fn parse_expression(source: &str) -> Result<Expression> {
    delimited(ws, expression, ws)
        .parse(source)
        .map_err(|e| to_cohort_error(e, source))
}

pub(crate) fn expression(input: &mut Input<'_>) -> PResult<Expression> {
    or_expression(input)
}

fn or_expression(input: &mut Input<'_>) -> PResult<Expression> {
    let mut left = and_expression(input)?;

    while opt(padded_keyword("or")).parse_next(input)?.is_some() {
        let right = cut_err(and_expression).parse_next(input)?;
        left = Expression::binary(left, BinaryOp::Or, right);
    }

    Ok(left)
}

fn and_expression(input: &mut Input<'_>) -> PResult<Expression> {
    let mut left = comparison_expression(input)?;

    while opt(padded_keyword("and")).parse_next(input)?.is_some() {
        let right = cut_err(comparison_expression).parse_next(input)?;
        left = Expression::binary(left, BinaryOp::And, right);
    }

    Ok(left)
}

fn comparison_operator(input: &mut Input<'_>) -> PResult<BinaryOp> {
    // Two-character operators first so `>=` is not read as `>`
    alt((
        ">=".value(BinaryOp::GreaterOrEqual),
        "<=".value(BinaryOp::LessOrEqual),
        "!=".value(BinaryOp::NotEqual),
        "<>".value(BinaryOp::NotEqual),
        "==".value(BinaryOp::Equal),
        "=".value(BinaryOp::Equal),
        "<".value(BinaryOp::Less),
        ">".value(BinaryOp::Greater),
    ))
    .parse_next(input)
}

fn comparison_expression(input: &mut Input<'_>) -> PResult<Expression> {
    let left = not_expression(input)?;

    match opt(preceded(ws, comparison_operator)).parse_next(input)? {
        Some(op) => {
            let right = cut_err(not_expression).parse_next(input)?;
            Ok(Expression::binary(left, op, right))
        }
        None => Ok(left),
    }
}

fn not_expression(input: &mut Input<'_>) -> PResult<Expression> {
    if opt(padded_keyword("not")).parse_next(input)?.is_some() {
        let operand = cut_err(not_expression).parse_next(input)?;
        return Ok(Expression::unary(UnaryOp::Not, operand));
    }
    additive_expression(input)
}

fn additive_expression(input: &mut Input<'_>) -> PResult<Expression> {
    let mut left = multiplicative_expression(input)?;

    loop {
        let op = opt(preceded(
            ws,
            alt(('+'.value(BinaryOp::Add), '-'.value(BinaryOp::Subtract))),
        ))
        .parse_next(input)?;

        match op {
            Some(op) => {
                let right = cut_err(multiplicative_expression).parse_next(input)?;
                left = Expression::binary(left, op, right);
            }
            None => break,
        }
    }

    Ok(left)
}

fn multiplicative_expression(input: &mut Input<'_>) -> PResult<Expression> {
    let mut left = unary_expression(input)?;

    loop {
        let op = opt(preceded(
            ws,
            alt(('*'.value(BinaryOp::Multiply), '/'.value(BinaryOp::Divide))),
        ))
        .parse_next(input)?;

        match op {
            Some(op) => {
                let right = cut_err(unary_expression).parse_next(input)?;
                left = Expression::binary(left, op, right);
            }
            None => break,
        }
    }

    Ok(left)
}

fn unary_expression(input: &mut Input<'_>) -> PResult<Expression> {
    if opt(preceded(ws, '-')).parse_next(input)?.is_some() {
        let operand = cut_err(unary_expression).parse_next(input)?;
        return Ok(Expression::unary(UnaryOp::Negate, operand));
    }
    primary_expression(input)
}

fn primary_expression(input: &mut Input<'_>) -> PResult<Expression> {
    preceded(
        ws,
        alt((
            parenthesized,
            number.map(|n| Expression::literal(Literal::Number(n))),
            string_literal.map(|s| Expression::literal(Literal::string(s))),
            keyword("true").value(Expression::literal(Literal::Boolean(true))),
            keyword("false").value(Expression::literal(Literal::Boolean(false))),
            identifier.map(Expression::variable),
        )),
    )
    .context(StrContext::Expected(StrContextValue::Description(
        "variable, literal or '('",
    )))
    .parse_next(input)
}

fn parenthesized(input: &mut Input<'_>) -> PResult<Expression> {
    delimited(
        '(',
        expression,
        cut_err(preceded(ws, ')')).context(StrContext::Expected(StrContextValue::CharLiteral(')'))),
    )
    .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bare_reference() {
        assert_eq!(parse_expression("  prostate_ca ").unwrap(), Expression::variable("prostate_ca"));
    }

    #[test]
    fn test_not_binds_tighter_than_and() {
        let expr = parse_expression("registered AND NOT has_died").unwrap();
        assert_eq!(expr.to_string(), "(registered AND (NOT has_died))");
    }

    #[test]
    fn test_arithmetic_constant() {
        let expr = parse_expression("imd >= 32844*1/5").unwrap();
        assert_eq!(expr.to_string(), "(imd >= ((32844 * 1) / 5))");
    }

    #[test]
    fn test_error_offset() {
        let err = parse_expression("age >= ").unwrap_err();
        assert!(err.is_config_error());
    }
}
