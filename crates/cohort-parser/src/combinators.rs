//! Common parser combinators shared by both grammars

use cohort_diagnostics::CohortError;
use rust_decimal::Decimal;
use std::str::FromStr;
use winnow::ascii::{Caseless, digit1, multispace0};
use winnow::combinator::{alt, delimited, not, opt, terminated};
use winnow::error::{ContextError, ErrMode, ParseError};
use winnow::ModalResult;
use winnow::prelude::*;
use winnow::token::{literal, one_of, take_till, take_while};

pub(crate) type Input<'a> = &'a str;

pub(crate) type PResult<O> = ModalResult<O, ContextError>;

/// Reserved words of the expression language (case-insensitive)
pub fn is_keyword(s: &str) -> bool {
    matches!(
        s.to_ascii_uppercase().as_str(),
        "AND" | "OR" | "NOT" | "TRUE" | "FALSE"
    )
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Skip whitespace, including newlines inside triple-quoted rule blocks
pub(crate) fn ws(input: &mut Input<'_>) -> PResult<()> {
    multispace0.void().parse_next(input)
}

/// Match a keyword case-insensitively, not followed by an identifier character
pub(crate) fn keyword<'a>(
    kw: &'static str,
) -> impl Parser<Input<'a>, &'a str, ErrMode<ContextError>> {
    terminated(literal(Caseless(kw)), not(one_of(is_ident_char)))
}

/// Keyword preceded by optional whitespace
pub(crate) fn padded_keyword<'a>(
    kw: &'static str,
) -> impl Parser<Input<'a>, &'a str, ErrMode<ContextError>> {
    (ws, keyword(kw)).map(|(_, k)| k)
}

/// Identifier: a letter or underscore followed by letters, digits or underscores.
/// Keywords are rejected.
pub(crate) fn identifier<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., is_ident_char),
    )
        .take()
        .verify(|s: &str| !is_keyword(s))
        .parse_next(input)
}

/// Unsigned decimal number: `18`, `32844`, `0.5`
pub(crate) fn number(input: &mut Input<'_>) -> PResult<Decimal> {
    (digit1, opt(('.', digit1)))
        .take()
        .try_map(Decimal::from_str)
        .parse_next(input)
}

/// String literal, double- or single-quoted, without escapes
pub(crate) fn string_literal<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    alt((
        delimited('"', take_till(0.., '"'), '"'),
        delimited('\'', take_till(0.., '\''), '\''),
    ))
    .parse_next(input)
}

/// Convert a winnow failure into a located parse error
pub(crate) fn to_cohort_error(err: ParseError<Input<'_>, ContextError>, source: &str) -> CohortError {
    let offset = err.offset();
    let context = err.inner().to_string();
    let mut message = match source[offset..].chars().next() {
        Some(ch) => format!("Unexpected '{}'", ch),
        None => "Unexpected end of input".to_string(),
    };
    if !context.is_empty() {
        message = format!("{}: {}", message, context);
    }
    CohortError::parse_at_offset(message, source, offset)
}
