//! Rule expression compilation and interpretation
//!
//! Compilation parses the source, folds constant arithmetic in exact decimal
//! arithmetic and records the referenced variables. A division whose divisor folds to
//! zero is rejected here, before any patient is evaluated.
//!
//! Evaluation never fails. Missing operands follow the false-on-missing rule:
//!
//! - a comparison with a missing side is `false`
//! - a missing value is falsy in `AND`, `OR` and `NOT`, so `NOT missing` is `true`
//! - arithmetic with a missing side, or dividing by a runtime zero, is missing

use crate::context::ResolvedVars;
use crate::value::Value;
use cohort_ast::{BinaryOp, Expression, Literal, UnaryOp};
use cohort_diagnostics::{CohortError, Result};
use cohort_parser::parse_expression;
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// A parsed, folded rule expression
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    source: String,
    expr: Expression,
    references: Vec<String>,
}

impl CompiledExpression {
    /// Compile the expression declared for `owner`
    pub fn compile(owner: &str, source: &str) -> Result<Self> {
        let expr = parse_expression(source).map_err(|e| e.in_variable(owner))?;
        Self::from_expression(owner, source, expr)
    }

    pub fn from_expression(owner: &str, source: &str, expr: Expression) -> Result<Self> {
        let expr = fold(expr).map_err(|fault| match fault {
            FoldError::DivisionByZero => CohortError::division_by_zero(owner, source.trim()),
            FoldError::Invalid(message) => CohortError::expression_compile(
                owner,
                format!("{} in '{}'", message, source.trim()),
            ),
        })?;
        let references = expr
            .referenced_variables()
            .into_iter()
            .map(str::to_string)
            .collect();
        Ok(Self {
            source: source.to_string(),
            expr,
            references,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expression(&self) -> &Expression {
        &self.expr
    }

    /// Referenced variable names in order of first appearance
    pub fn references(&self) -> &[String] {
        &self.references
    }

    pub fn evaluate(&self, vars: &ResolvedVars) -> Value {
        evaluate(&self.expr, vars)
    }

    pub fn is_satisfied(&self, vars: &ResolvedVars) -> bool {
        self.evaluate(vars).is_truthy()
    }
}

enum FoldError {
    DivisionByZero,
    Invalid(String),
}

fn literal_number(expr: &Expression) -> Option<Decimal> {
    match expr {
        Expression::Literal(Literal::Number(n)) => Some(*n),
        _ => None,
    }
}

/// Replace constant arithmetic sub-trees with their value
fn fold(expr: Expression) -> std::result::Result<Expression, FoldError> {
    match expr {
        Expression::BinaryOp(b) => {
            let left = fold(*b.left)?;
            let right = fold(*b.right)?;

            if b.op == BinaryOp::Divide && literal_number(&right).is_some_and(|d| d.is_zero()) {
                return Err(FoldError::DivisionByZero);
            }
            if !b.op.is_arithmetic() || !left.is_constant() || !right.is_constant() {
                return Ok(Expression::binary(left, b.op, right));
            }

            let (Some(l), Some(r)) = (literal_number(&left), literal_number(&right)) else {
                return Err(FoldError::Invalid(format!(
                    "non-numeric operand to '{}'",
                    b.op
                )));
            };
            let value = arithmetic(b.op, l, r)
                .ok_or_else(|| FoldError::Invalid("arithmetic overflow".to_string()))?;
            Ok(Expression::literal(Literal::Number(value)))
        }
        Expression::UnaryOp(u) => {
            let operand = fold(*u.operand)?;
            match (u.op, literal_number(&operand)) {
                (UnaryOp::Negate, Some(n)) => Ok(Expression::literal(Literal::Number(-n))),
                (UnaryOp::Negate, None) if operand.is_constant() => Err(FoldError::Invalid(
                    "non-numeric operand to unary '-'".to_string(),
                )),
                _ => Ok(Expression::unary(u.op, operand)),
            }
        }
        other => Ok(other),
    }
}

fn arithmetic(op: BinaryOp, l: Decimal, r: Decimal) -> Option<Decimal> {
    match op {
        BinaryOp::Add => l.checked_add(r),
        BinaryOp::Subtract => l.checked_sub(r),
        BinaryOp::Multiply => l.checked_mul(r),
        BinaryOp::Divide => l.checked_div(r),
        _ => None,
    }
}

fn compare(op: BinaryOp, ordering: Option<Ordering>) -> bool {
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        BinaryOp::Equal => ordering == Ordering::Equal,
        BinaryOp::NotEqual => ordering != Ordering::Equal,
        BinaryOp::Less => ordering == Ordering::Less,
        BinaryOp::LessOrEqual => ordering != Ordering::Greater,
        BinaryOp::Greater => ordering == Ordering::Greater,
        BinaryOp::GreaterOrEqual => ordering != Ordering::Less,
        _ => false,
    }
}

/// Interpret an expression against resolved values
pub fn evaluate(expr: &Expression, vars: &ResolvedVars) -> Value {
    match expr {
        Expression::Literal(lit) => Value::from(lit),
        Expression::VariableRef(r) => vars.get(&r.name).clone(),
        Expression::UnaryOp(u) => {
            let operand = evaluate(&u.operand, vars);
            match u.op {
                UnaryOp::Not => Value::Bool(!operand.is_truthy()),
                UnaryOp::Negate => operand
                    .as_number()
                    .map_or(Value::Missing, |n| Value::Number(-n)),
            }
        }
        Expression::BinaryOp(b) => match b.op {
            BinaryOp::And => Value::Bool(
                evaluate(&b.left, vars).is_truthy() && evaluate(&b.right, vars).is_truthy(),
            ),
            BinaryOp::Or => Value::Bool(
                evaluate(&b.left, vars).is_truthy() || evaluate(&b.right, vars).is_truthy(),
            ),
            op if op.is_comparison() => {
                let left = evaluate(&b.left, vars);
                let right = evaluate(&b.right, vars);
                Value::Bool(compare(op, left.compare(&right)))
            }
            op => {
                let left = evaluate(&b.left, vars).as_number();
                let right = evaluate(&b.right, vars).as_number();
                left.zip(right)
                    .and_then(|(l, r)| arithmetic(op, l, r))
                    .map_or(Value::Missing, Value::Number)
            }
        },
    }
}
