#[allow(unused)]
use tracing::{debug, error, info, span, trace, warn, Instrument, Level};

use std::{borrow::Cow, fmt, str::FromStr};

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{ser::SerializeMap, Serializer};
use serde_derive::Serialize;

use crate::lexer;

lazy_static! {
    // Escapes understood inside a label value
    static ref LABEL_UNESCAPE_RE: Regex = Regex::new(r#"(\\[n"\\])"#).unwrap();

    // HELP text only escapes backslash and newline
    static ref HELP_UNESCAPE_RE: Regex = Regex::new(r#"(\\[n\\])"#).unwrap();
}

/// Why a line could not be parsed
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum ParseError {
    #[error("invalid metric name")]
    BadMetricName,

    #[error("expected «,» or «}}» in label block")]
    BadLabelBlock,

    #[error("expected «=» after label name")]
    MissingEquals,

    #[error("label value must be quoted")]
    UnquotedLabelValue,

    #[error("unterminated label value")]
    UnterminatedLabelValue,

    #[error("duplicate label name «{0}»")]
    DuplicateLabel(String),

    #[error("invalid sample value")]
    BadValue,

    #[error("invalid timestamp")]
    BadTimestamp,

    #[error("missing TYPE keyword")]
    MissingType,

    #[error("unrecognized TYPE keyword «{0}»")]
    UnknownType(String),

    #[error("unexpected content after the end of the line")]
    TrailingContent,

    #[error("unknown error")]
    Unknown,
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// A line that could not be parsed, with enough context to report it.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
#[error("line {line_number}, offset {offset}: {reason}: {line:?}")]
pub struct MalformedLine {
    pub reason: ParseError,
    /// The offending line as it was passed in
    pub line: String,
    /// 1-based.  Lines parsed on their own are line 1.
    pub line_number: usize,
    /// Byte offset into `line` where the problem starts
    pub offset: usize,
}

/// One parsed line of an exposition document
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Record<'a> {
    /// Empty or whitespace-only line
    Blank,
    /// Free text after a `#`
    Comment(&'a str),
    /// `# HELP <metric_name> <help_text>`
    Help {
        metric_name: &'a str,
        help_text: Cow<'a, str>,
    },
    /// `# TYPE <metric_name> <metric_type>`
    MetricType {
        metric_name: &'a str,
        metric_type: MetricType,
    },
    /// A sample line
    Metric(Sample<'a>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Sample<'a> {
    pub name: &'a str,
    pub labels: LabelSet<'a>,
    pub number: MetricNumber,
    /// Milliseconds since the Unix epoch
    pub timestamp: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Label<'a> {
    pub name: Cow<'a, str>,
    pub value: Cow<'a, str>,
}

/// Labels in the order they were written or inserted.  Names are unique.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelSet<'a> {
    labels: Vec<Label<'a>>,
}

/// A sample value.  Integers are kept apart from floats so that `1027` is written back as
/// `1027` and not `1027.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricNumber {
    Float(f64),
    Integer(i64),
}

/// The type announced by a `# TYPE` line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum MetricType {
    /// Counters measure discrete events.
    Counter,
    /// Gauges are current measurements, such as bytes of memory currently used or the number of items in a queue.
    Gauge,
    /// Histograms measure distributions of discrete events.
    Histogram,
    /// Summaries also measure distributions of discrete events.
    Summary,
    /// No type information.
    Untyped,
}

impl<'a> Record<'a> {
    /// Converts a token into a record, unescaping strings and checking labels.  On failure
    /// the slice points at the offending part of the line.
    pub(crate) fn from_token(
        token: lexer::MetricToken<'a>,
    ) -> std::result::Result<Self, (ParseError, &'a str)> {
        Ok(match token {
            lexer::MetricToken::Blank => Self::Blank,
            lexer::MetricToken::Comment(text) => Self::Comment(text),
            lexer::MetricToken::Descriptor(lexer::MetricDescriptor::Help {
                metric_name,
                help_text,
            }) => Self::Help {
                metric_name,
                help_text: unescape_help(help_text),
            },
            lexer::MetricToken::Descriptor(lexer::MetricDescriptor::Type {
                metric_name,
                metric_type,
            }) => Self::MetricType {
                metric_name,
                metric_type: metric_type.parse().map_err(|e| (e, metric_type))?,
            },
            lexer::MetricToken::Metric(sample) => Self::Metric(Sample::from_token(sample)?),
        })
    }
}

impl<'a> Sample<'a> {
    fn from_token(l: lexer::Sample<'a>) -> std::result::Result<Self, (ParseError, &'a str)> {
        let labels = l
            .labels
            .into_iter()
            .try_fold(LabelSet::new(), |mut acc, label| {
                acc.insert(label.name, unescape_label_value(label.value))
                    .map_err(|e| (e, label.name))?;
                Ok::<_, (ParseError, &'a str)>(acc)
            })?;

        Ok(Self {
            name: l.name,
            labels,
            number: l.number,
            timestamp: l.timestamp,
        })
    }
}

impl<'a> LabelSet<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from name/value pairs, failing on the first repeated name.
    pub fn try_from_iter<I, N, V>(iter: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<Cow<'a, str>>,
        V: Into<Cow<'a, str>>,
    {
        iter.into_iter().try_fold(Self::new(), |acc, (name, value)| acc.with(name, value))
    }

    /// Appends a label.  A name that is already present is a [`ParseError::DuplicateLabel`].
    pub fn insert<N, V>(&mut self, name: N, value: V) -> Result<()>
    where
        N: Into<Cow<'a, str>>,
        V: Into<Cow<'a, str>>,
    {
        let name = name.into();
        if self.contains_key(&name) {
            return Err(ParseError::DuplicateLabel(name.into_owned()));
        }

        self.labels.push(Label {
            name,
            value: value.into(),
        });
        Ok(())
    }

    pub fn with<N, V>(mut self, name: N, value: V) -> Result<Self>
    where
        N: Into<Cow<'a, str>>,
        V: Into<Cow<'a, str>>,
    {
        self.insert(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|label| label.name == name)
            .map(|label| label.value.as_ref())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label<'a>> {
        self.labels.iter()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<'a, 'b> IntoIterator for &'b LabelSet<'a> {
    type Item = &'b Label<'a>;
    type IntoIter = std::slice::Iter<'b, Label<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> serde::Serialize for LabelSet<'a> {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = s.serialize_map(Some(self.labels.len()))?;
        for label in self.labels.iter() {
            map.serialize_entry(&label.name, &label.value)?;
        }
        map.end()
    }
}

impl MetricNumber {
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Float(n) => *n,
            Self::Integer(n) => *n as f64,
        }
    }
}

impl From<f64> for MetricNumber {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<f32> for MetricNumber {
    fn from(n: f32) -> Self {
        Self::Float(n.into())
    }
}

impl From<i64> for MetricNumber {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for MetricNumber {
    fn from(n: i32) -> Self {
        Self::Integer(n.into())
    }
}

impl From<u32> for MetricNumber {
    fn from(n: u32) -> Self {
        Self::Integer(n.into())
    }
}

impl serde::Serialize for MetricNumber {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Float(n) => {
                if n.is_nan() {
                    s.serialize_str("NaN")
                } else if n.is_infinite() && n.is_sign_positive() {
                    s.serialize_str("+Inf")
                } else if n.is_infinite() && n.is_sign_negative() {
                    s.serialize_str("-Inf")
                } else {
                    s.serialize_f64(*n)
                }
            }
            Self::Integer(n) => s.serialize_i64(*n),
        }
    }
}

impl MetricType {
    /// The keyword used on a `# TYPE` line
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
            Self::Summary => "summary",
            Self::Untyped => "untyped",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricType {
    type Err = ParseError;

    /// Keywords are matched without regard to case.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "counter" => Ok(Self::Counter),
            "gauge" => Ok(Self::Gauge),
            "histogram" => Ok(Self::Histogram),
            "summary" => Ok(Self::Summary),
            "untyped" => Ok(Self::Untyped),
            _ => Err(ParseError::UnknownType(s.to_string())),
        }
    }
}

fn unescape_label_value(input: &str) -> Cow<'_, str> {
    LABEL_UNESCAPE_RE.replace_all(input, |caps: &Captures| match &caps[0] {
        r"\n" => "\n",
        r#"\""# => r#"""#,
        _ => r"\",
    })
}

fn unescape_help(input: &str) -> Cow<'_, str> {
    HELP_UNESCAPE_RE.replace_all(input, |caps: &Captures| match &caps[0] {
        r"\n" => "\n",
        _ => r"\",
    })
}
