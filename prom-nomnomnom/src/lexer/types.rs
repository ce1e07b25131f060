#[allow(unused)]
use tracing::{debug, error, info, span, trace, warn, Instrument, Level};

use nom::{
    branch::alt,
    bytes::complete::{escaped, tag, tag_no_case, take_while, take_while1},
    character::complete::{one_of, satisfy},
    combinator::{eof, map, not, opt, peek, recognize, value},
    error::ErrorKind,
    number::complete::double,
    sequence::{pair, preceded, terminated},
    IResult, Parser,
};

use crate::parser::{MetricNumber, ParseError};

/// Failure produced while tokenizing a line.
///
/// `input` is the unconsumed tail of the line at the point of failure, `reason`
/// is filled in by [`malformed`] once the grammar has committed to a shape.
#[derive(Clone, Debug, PartialEq)]
pub struct LexError<'a> {
    pub input: &'a str,
    pub reason: Option<ParseError>,
}

impl<'a> LexError<'a> {
    fn or_reason(self, reason: &ParseError) -> Self {
        Self {
            reason: self.reason.or_else(|| Some(reason.clone())),
            ..self
        }
    }
}

impl<'a> nom::error::ParseError<&'a str> for LexError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        Self {
            input,
            reason: None,
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

/// Commit to `parser`: any failure becomes a [`nom::Err::Failure`] tagged with `reason`,
/// unless a more specific reason was attached further down.
pub(super) fn malformed<'a, O, F>(
    reason: ParseError,
    mut parser: F,
) -> impl FnMut(&'a str) -> IResult<&'a str, O, LexError<'a>>
where
    F: Parser<&'a str, O, LexError<'a>>,
{
    move |input: &'a str| {
        parser.parse(input).map_err(|e| match e {
            nom::Err::Error(e) | nom::Err::Failure(e) => nom::Err::Failure(e.or_reason(&reason)),
            incomplete => incomplete,
        })
    }
}

/// ```abnf
/// ; Any unicode character, except newline, double quote, and backslash
/// normal-char = %x00-09 / %x0B-21 / %x23-5B / %x5D-10FFFF
/// ```
fn is_normal_char(c: char) -> bool {
    !matches!(c, '\n' | '"' | '\\')
}

/// Recognize single "normal_char"
pub(super) fn normal_char<'a>(input: &'a str) -> IResult<&'a str, char, LexError<'a>> {
    satisfy(is_normal_char)(input)
}

/// Recognize a sequence of one or more "normal char"
pub(super) fn normal_char1<'a>(input: &'a str) -> IResult<&'a str, &'a str, LexError<'a>> {
    nom::InputTakeAtPosition::split_at_position1_complete(
        &input,
        |item| !is_normal_char(item),
        ErrorKind::AlphaNumeric,
    )
}

/// A run of whitespace between tokens.  Any length counts as a single separator.
pub(super) fn whitespace1<'a>(input: &'a str) -> IResult<&'a str, &'a str, LexError<'a>> {
    take_while1(char::is_whitespace)(input)
}

pub(super) fn whitespace0<'a>(input: &'a str) -> IResult<&'a str, &'a str, LexError<'a>> {
    take_while(char::is_whitespace)(input)
}

/// Succeeds without consuming anything when the current token has ended.
pub(super) fn token_end<'a>(input: &'a str) -> IResult<&'a str, &'a str, LexError<'a>> {
    peek(alt((whitespace1, eof)))(input)
}

/// A directive keyword (`HELP`, `TYPE`) and the whitespace that must follow it.
pub(super) fn keyword<'a>(
    word: &'static str,
) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str, LexError<'a>> {
    move |input: &'a str| terminated(tag(word), whitespace1)(input)
}

/// ```abnf
/// escaped-string = *escaped-char
///
/// escaped-char = normal-char
/// escaped-char =/ BS ("n" / DQUOTE / BS)
/// escaped-char =/ BS normal-char
/// ```
pub(super) fn escaped_string1<'a>(input: &'a str) -> IResult<&'a str, &'a str, LexError<'a>> {
    escaped(normal_char1, '\\', alt((one_of(r#""\"#), normal_char)))(input)
}

/// ```abnf
/// metricname = metricname-initial-char 0*metricname-char
///
/// metricname-char = metricname-initial-char / DIGIT
/// metricname-initial-char = ALPHA / "_" / ":"
/// ```
#[tracing::instrument]
pub(super) fn metric_name1<'a>(input: &'a str) -> IResult<&'a str, &'a str, LexError<'a>> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_' || c == ':'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == ':'),
    ))(input)
}

/// ```abnf
/// label-name = label-name-initial-char *label-name-char
///
/// label-name-char = label-name-initial-char / DIGIT
/// label-name-initial-char = ALPHA / "_"
/// ```
#[tracing::instrument]
pub(super) fn label_name1<'a>(input: &'a str) -> IResult<&'a str, &'a str, LexError<'a>> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

/// A plain decimal integer that fills the whole token
fn integer<'a>(input: &'a str) -> IResult<&'a str, i64, LexError<'a>> {
    terminated(nom::character::complete::i64, token_end)(input)
}

/// Special values are only accepted as `Inf`, `+Inf`, `-Inf` and `NaN`.
fn floatlike<'a>(input: &'a str) -> IResult<&'a str, f64, LexError<'a>> {
    terminated(
        alt((
            value(f64::NAN, tag("NaN")),
            value(f64::NEG_INFINITY, tag("-Inf")),
            value(f64::INFINITY, preceded(opt(tag("+")), tag("Inf"))),
            preceded(
                not(alt((
                    tag_no_case("nan"),
                    preceded(opt(one_of("+-")), tag_no_case("inf")),
                ))),
                double,
            ),
        )),
        token_end,
    )(input)
}

/// The sample value.  Integers that fit an `i64` keep their integer-ness.
pub(super) fn number<'a>(input: &'a str) -> IResult<&'a str, MetricNumber, LexError<'a>> {
    alt((
        map(integer, MetricNumber::Integer),
        map(floatlike, MetricNumber::Float),
    ))(input)
}

/// Milliseconds since the epoch, possibly negative
pub(super) fn timestamp<'a>(input: &'a str) -> IResult<&'a str, i64, LexError<'a>> {
    integer(input)
}

#[cfg(feature = "trailing_comma")]
pub(super) fn trailing_separator<'a>(
    input: &'a str,
) -> IResult<&'a str, Option<&'a str>, LexError<'a>> {
    opt(list_separator)(input)
}

#[cfg(not(feature = "trailing_comma"))]
pub(super) fn trailing_separator<'a>(
    input: &'a str,
) -> IResult<&'a str, Option<&'a str>, LexError<'a>> {
    Ok((input, None))
}

/// The comma between labels, with any whitespace around it
pub(super) fn list_separator<'a>(input: &'a str) -> IResult<&'a str, &'a str, LexError<'a>> {
    recognize(pair(whitespace0, pair(tag(","), whitespace0)))(input)
}
