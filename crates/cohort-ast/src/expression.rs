//! Expression AST nodes for the rule language
//!
//! The language is deliberately small: variable references, literals, comparisons,
//! boolean connectives and arithmetic. It covers categorisation rules such as
//! `age >= 65 AND age < 75` and population filters such as
//! `registered AND NOT has_died AND sex = "M"`.

use crate::{BinaryOp, BoxExpr, Literal, UnaryOp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// All rule-language expression types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Literal value (boolean, number, string)
    Literal(Literal),
    /// Reference to a declared variable
    VariableRef(VariableRef),
    /// Binary operation
    BinaryOp(BinaryOpExpr),
    /// Unary operation
    UnaryOp(UnaryOpExpr),
}

/// Reference to a declared variable by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryOpExpr {
    pub left: BoxExpr,
    pub op: BinaryOp,
    pub right: BoxExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryOpExpr {
    pub op: UnaryOp,
    pub operand: BoxExpr,
}

impl Expression {
    pub fn literal(literal: Literal) -> Self {
        Self::Literal(literal)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::VariableRef(VariableRef { name: name.into() })
    }

    pub fn binary(left: Expression, op: BinaryOp, right: Expression) -> Self {
        Self::BinaryOp(BinaryOpExpr {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    pub fn unary(op: UnaryOp, operand: Expression) -> Self {
        Self::UnaryOp(UnaryOpExpr {
            op,
            operand: Box::new(operand),
        })
    }

    /// True when no variable is referenced anywhere in the tree
    pub fn is_constant(&self) -> bool {
        match self {
            Expression::Literal(_) => true,
            Expression::VariableRef(_) => false,
            Expression::BinaryOp(b) => b.left.is_constant() && b.right.is_constant(),
            Expression::UnaryOp(u) => u.operand.is_constant(),
        }
    }

    /// Names of referenced variables, deduplicated, in order of first appearance
    pub fn referenced_variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expression::Literal(_) => {}
            Expression::VariableRef(r) => {
                if !names.contains(&r.name.as_str()) {
                    names.push(&r.name);
                }
            }
            Expression::BinaryOp(b) => {
                b.left.collect_references(names);
                b.right.collect_references(names);
            }
            Expression::UnaryOp(u) => u.operand.collect_references(names),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(lit) => write!(f, "{}", lit),
            Expression::VariableRef(r) => f.write_str(&r.name),
            Expression::BinaryOp(b) => write!(f, "({} {} {})", b.left, b.op, b.right),
            Expression::UnaryOp(u) => match u.op {
                UnaryOp::Not => write!(f, "(NOT {})", u.operand),
                UnaryOp::Negate => write!(f, "(-{})", u.operand),
            },
        }
    }
}
