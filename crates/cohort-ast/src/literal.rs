//! Literal AST nodes

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal value in a rule expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Boolean literal (TRUE/FALSE)
    Boolean(bool),
    /// Exact decimal number; integers are decimals with scale zero
    Number(Decimal),
    /// String literal, single or double quoted in source
    String(String),
}

impl Literal {
    pub fn number(value: impl Into<Decimal>) -> Self {
        Self::Number(value.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Boolean(true) => f.write_str("TRUE"),
            Literal::Boolean(false) => f.write_str("FALSE"),
            Literal::Number(n) => write!(f, "{}", n.normalize()),
            Literal::String(s) => write!(f, "\"{}\"", s),
        }
    }
}
