//! Rule-language parsers using Winnow
//!
//! Two small grammars are embedded in study declarations as free-form strings:
//!
//! - boolean/arithmetic expressions (`age >= 65 AND age < 75`), parsed by recursive
//!   descent with one function per precedence level
//! - relative dates (`first_day_of_month(index_date) - 1 day`)
//!
//! Both entry points consume the whole input and report the byte offset of the
//! first unexpected token.

mod combinators;
mod date;
mod expression;

pub use date::parse_date_expression;
pub use expression::parse_expression;

pub use combinators::is_keyword;
