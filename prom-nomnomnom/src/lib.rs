//! `prom-nomnomnom` parses and writes the Prometheus text exposition format
//!
//! One line at a time.
//!
//! ```
//! use prom_nomnomnom::{parse_line, Record};
//!
//! let record = parse_line(r#"http_requests_total{method="post",code="200"} 1027 1395066363000"#).unwrap();
//! match record {
//!     Record::Metric(sample) => {
//!         assert_eq!(sample.labels.get("code"), Some("200"));
//!         assert_eq!(sample.number.as_f64(), 1027.0);
//!         assert_eq!(sample.timestamp, Some(1395066363000));
//!     }
//!     other => panic!("not a sample: {:?}", other),
//! }
//! ```

#[allow(unused)]
use tracing::{debug, error, info, span, trace, warn, Instrument, Level};

use itertools::{Either, Itertools};
use nom::Offset;

/// Tokenizes a single exposition line
pub mod lexer;

/// Turns tokens into [`Record`]s and holds the types handed back to callers.
pub mod parser;

/// Writes records back out as exposition lines.
pub mod format;


pub use format::{format_comment, format_help, format_metric, format_metric_type, format_number};
pub use parser::{
    Label, LabelSet, MalformedLine, MetricNumber, MetricType, ParseError, Record, Sample,
};

/// What [`parse_text`] does with a malformed line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Give up on the whole document at the first malformed line.
    FailFast,
    /// Skip malformed lines and collect them in [`Document::errors`].
    #[default]
    SkipAndReport,
}

/// The outcome of [`parse_text`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document<'a> {
    /// Records in document order, one per well-formed line
    pub records: Vec<Record<'a>>,
    /// Lines that were skipped.  Always empty with [`ErrorPolicy::FailFast`].
    pub errors: Vec<MalformedLine>,
}

/// Parses one line of an exposition document.
///
/// Blank lines and comments always parse.  Anything else either matches the grammar
/// completely or yields a [`MalformedLine`] pointing at the problem.
#[tracing::instrument]
pub fn parse_line(line: &str) -> Result<Record<'_>, MalformedLine> {
    lexer::line(line)
        .map_err(|e| (e.reason.unwrap_or(ParseError::Unknown), e.input))
        .and_then(Record::from_token)
        .map_err(|(reason, at)| MalformedLine {
            reason,
            line: line.to_string(),
            line_number: 1,
            offset: line.offset(at),
        })
}

/// Lazily parses a document, yielding one item per line.
///
/// Lines end at `\n` or `\r\n`; a terminator at the very end does not start another line.
pub fn records<'a>(data: &'a str) -> impl Iterator<Item = Result<Record<'a>, MalformedLine>> + 'a {
    data.lines().enumerate().map(|(index, line)| {
        parse_line(line).map_err(|e| MalformedLine {
            line_number: index + 1,
            ..e
        })
    })
}

/// Parses a whole document.
///
/// With [`ErrorPolicy::FailFast`] the first malformed line is returned as the error.  With
/// [`ErrorPolicy::SkipAndReport`] every malformed line is logged and reported in
/// [`Document::errors`] and the rest of the document is still returned.
#[tracing::instrument(skip(data))]
pub fn parse_text(data: &str, policy: ErrorPolicy) -> Result<Document<'_>, MalformedLine> {
    match policy {
        ErrorPolicy::FailFast => Ok(Document {
            records: records(data).collect::<Result<_, _>>()?,
            errors: vec![],
        }),
        ErrorPolicy::SkipAndReport => {
            let (records, errors): (Vec<_>, Vec<_>) =
                records(data).partition_map(|record| match record {
                    Ok(record) => Either::Left(record),
                    Err(e) => {
                        warn!(%e, "skipping malformed line");
                        Either::Right(e)
                    }
                });
            Ok(Document { records, errors })
        }
    }
}
