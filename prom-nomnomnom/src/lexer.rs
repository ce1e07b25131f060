#[allow(unused)]
use tracing::{debug, error, info, span, trace, warn, Instrument, Level};

use nom::{
    branch::alt,
    bytes::complete::tag,
    combinator::{cond, eof, map, opt, peek, rest, value},
    multi::separated_list0,
    sequence::{preceded, terminated, tuple},
    IResult,
};

use crate::parser::{MetricNumber, ParseError};

mod types;
use types::*;

pub use types::LexError;

/// A label exactly as written; the value is still escaped.
#[derive(Clone, Debug, PartialEq)]
pub struct Label<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sample<'a> {
    pub name: &'a str,
    pub labels: Vec<Label<'a>>,
    pub number: MetricNumber,
    pub timestamp: Option<i64>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MetricDescriptor<'a> {
    Type {
        metric_name: &'a str,
        metric_type: &'a str,
    },
    Help {
        metric_name: &'a str,
        help_text: &'a str,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum MetricToken<'a> {
    Blank,
    Comment(&'a str),
    Descriptor(MetricDescriptor<'a>),
    Metric(Sample<'a>),
}

impl<'a> Label<'a> {
    /// ```abnf
    /// label = label-name *SP "=" *SP DQUOTE escaped-string DQUOTE
    /// ```
    #[tracing::instrument]
    fn nom(input: &'a str) -> IResult<&'a str, Self, LexError<'a>> {
        let (input, name) = label_name1(input)?;
        let (input, _) = malformed(
            ParseError::MissingEquals,
            tuple((whitespace0, tag("="), whitespace0)),
        )(input)?;
        let (input, value) = malformed(
            ParseError::UnquotedLabelValue,
            preceded(tag(r#"""#), opt(escaped_string1)),
        )(input)?;
        let (input, _) = malformed(ParseError::UnterminatedLabelValue, tag(r#"""#))(input)?;

        let value = value.unwrap_or_default();
        trace!(name, value);
        Ok((input, Self { name, value }))
    }

    /// ```abnf
    /// labels = "{" [label *("," label) [","]] "}"
    /// ```
    fn nom_block(input: &'a str) -> IResult<&'a str, Vec<Self>, LexError<'a>> {
        let (input, _) = tag("{")(input)?;
        let (input, labels) =
            separated_list0(list_separator, preceded(whitespace0, Self::nom))(input)?;
        // A trailing comma has to follow a label; `{,}` is not an empty block.
        let (input, _) = cond(!labels.is_empty(), trailing_separator)(input)?;
        let (input, _) =
            malformed(ParseError::BadLabelBlock, preceded(whitespace0, tag("}")))(input)?;

        Ok((input, labels))
    }
}

impl<'a> Sample<'a> {
    /// ```abnf
    /// sample = metricname [*SP labels] 1*SP number [1*SP timestamp]
    /// ```
    fn nom(input: &'a str) -> IResult<&'a str, Self, LexError<'a>> {
        let (input, name) = malformed(
            ParseError::BadMetricName,
            terminated(metric_name1, peek(alt((whitespace1, tag("{"), eof)))),
        )(input)?;
        let (input, labels) = opt(preceded(whitespace0, Label::nom_block))(input)?;
        let (input, number) = malformed(ParseError::BadValue, preceded(whitespace1, number))(input)?;
        let (input, timestamp) = opt(preceded(
            whitespace1,
            malformed(ParseError::BadTimestamp, timestamp),
        ))(input)?;
        let (input, _) = malformed(ParseError::TrailingContent, eof)(input)?;

        Ok((
            input,
            Self {
                name,
                labels: labels.unwrap_or_default(),
                number,
                timestamp,
            },
        ))
    }
}

impl<'a> MetricDescriptor<'a> {
    /// ```abnf
    /// metric-descriptor = HASH *SP type 1*SP metricname 1*SP metric-type
    /// ```
    fn nom_type_descriptor(input: &'a str) -> IResult<&'a str, Self, LexError<'a>> {
        let (input, metric_name) = malformed(
            ParseError::BadMetricName,
            terminated(metric_name1, token_end),
        )(input)?;
        let (input, metric_type) = malformed(
            ParseError::MissingType,
            preceded(
                whitespace1,
                nom::bytes::complete::take_till1(char::is_whitespace),
            ),
        )(input)?;
        let (input, _) = malformed(ParseError::TrailingContent, eof)(input)?;

        Ok((
            input,
            Self::Type {
                metric_name,
                metric_type,
            },
        ))
    }

    /// ```abnf
    /// metric-descriptor =/ HASH *SP help 1*SP metricname [1*SP escaped-string]
    /// ```
    fn nom_help_descriptor(input: &'a str) -> IResult<&'a str, Self, LexError<'a>> {
        let (input, metric_name) = malformed(
            ParseError::BadMetricName,
            terminated(metric_name1, token_end),
        )(input)?;
        let (input, help_text) = alt((eof, preceded(whitespace1, rest)))(input)?;

        Ok((
            input,
            Self::Help {
                metric_name,
                help_text,
            },
        ))
    }
}

impl<'a> MetricToken<'a> {
    /// A line starting with `#`: a HELP or TYPE directive, or else free text.
    fn nom_hash(input: &'a str) -> IResult<&'a str, Self, LexError<'a>> {
        let (input, _) = tag::<_, _, LexError<'a>>("#")(input)?;
        let input = input.trim_start();

        alt((
            map(
                preceded(keyword("HELP"), MetricDescriptor::nom_help_descriptor),
                Self::Descriptor,
            ),
            map(
                preceded(keyword("TYPE"), MetricDescriptor::nom_type_descriptor),
                Self::Descriptor,
            ),
            map(rest, Self::Comment),
        ))(input)
    }
}

/// Tokenizes a single line of an exposition document.
///
/// Leading and trailing whitespace is dropped before the line is classified.  On
/// failure the returned [`LexError`] points into `input`.
#[tracing::instrument]
pub fn line<'a>(input: &'a str) -> Result<MetricToken<'a>, LexError<'a>> {
    let trimmed = input.trim();

    let token = alt((
        value(MetricToken::Blank, eof),
        MetricToken::nom_hash,
        map(Sample::nom, MetricToken::Metric),
    ))(trimmed)
    .map(|(_, token)| token)
    .map_err(|e| match e {
        nom::Err::Error(e) | nom::Err::Failure(e) => e,
        nom::Err::Incomplete(_) => LexError {
            input: trimmed,
            reason: None,
        },
    })?;

    debug!(?token);
    Ok(token)
}
