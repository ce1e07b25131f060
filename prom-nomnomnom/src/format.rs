#[allow(unused)]
use tracing::{debug, error, info, span, trace, warn, Instrument, Level};

use std::{borrow::Cow, fmt};

use itertools::Itertools;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::parser::{LabelSet, MetricNumber, MetricType, Record};

lazy_static! {
    // Characters that must be escaped inside a label value
    static ref LABEL_ESCAPE_RE: Regex = Regex::new(r#"[\\"\n]"#).unwrap();

    // Characters that must be escaped in HELP text
    static ref HELP_ESCAPE_RE: Regex = Regex::new(r"[\\\n]").unwrap();
}

/// Escapes `\`, `"` and newline for use between the quotes of a label value.
pub fn escape_label_value(value: &str) -> Cow<'_, str> {
    LABEL_ESCAPE_RE.replace_all(value, |caps: &Captures| match &caps[0] {
        "\n" => r"\n",
        r#"""# => r#"\""#,
        _ => r"\\",
    })
}

/// Escapes `\` and newline.  Double quotes are left alone in HELP text.
pub fn escape_help_text(text: &str) -> Cow<'_, str> {
    HELP_ESCAPE_RE.replace_all(text, |caps: &Captures| match &caps[0] {
        "\n" => r"\n",
        _ => r"\\",
    })
}

pub fn format_comment(text: &str) -> String {
    format!("# {}", text)
}

pub fn format_help(metric_name: &str, help_text: &str) -> String {
    format!("# HELP {} {}", metric_name, escape_help_text(help_text))
}

pub fn format_metric_type(metric_name: &str, metric_type: MetricType) -> String {
    format!("# TYPE {} {}", metric_name, metric_type.as_str())
}

/// Renders a sample value.
///
/// Integers are written as integers; floats use the shortest representation that parses back
/// to the same value, so `12.47` stays `12.47`.  Magnitudes outside `1e-4..1e21` switch to
/// exponent notation with a signed exponent, e.g. `1e+300`.
pub fn format_number(number: MetricNumber) -> String {
    match number {
        MetricNumber::Integer(n) => n.to_string(),
        MetricNumber::Float(n) if n.is_nan() => "NaN".to_string(),
        MetricNumber::Float(n) if n.is_infinite() && n.is_sign_positive() => "+Inf".to_string(),
        MetricNumber::Float(n) if n.is_infinite() => "-Inf".to_string(),
        MetricNumber::Float(n) if n != 0. && !(1e-4..1e21).contains(&n.abs()) => {
            let repr = format!("{:e}", n);
            match repr.split_once('e') {
                Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
                _ => repr,
            }
        }
        MetricNumber::Float(n) => n.to_string(),
    }
}

/// Renders a sample line.
///
/// The label block is left out entirely when `labels` is `None` or empty.  Labels are written
/// in the order of the set.
///
/// ```
/// use prom_nomnomnom::{format::format_metric, LabelSet};
///
/// let labels = LabelSet::try_from_iter([("method", "post"), ("code", "200")]).unwrap();
/// assert_eq!(
///     format_metric("http_requests_total", 1027, Some(&labels), Some(1395066363000)),
///     r#"http_requests_total{method="post",code="200"} 1027 1395066363000"#
/// );
/// assert_eq!(
///     format_metric("metric_without_timestamp_and_labels", 12.47, None, None),
///     "metric_without_timestamp_and_labels 12.47"
/// );
/// ```
pub fn format_metric<N>(
    metric_name: &str,
    number: N,
    labels: Option<&LabelSet>,
    timestamp: Option<i64>,
) -> String
where
    N: Into<MetricNumber>,
{
    let mut line = String::from(metric_name);

    if let Some(labels) = labels.filter(|labels| !labels.is_empty()) {
        line.push('{');
        line.push_str(
            &labels
                .iter()
                .map(|label| format!(r#"{}="{}""#, label.name, escape_label_value(&label.value)))
                .join(","),
        );
        line.push('}');
    }

    line.push(' ');
    line.push_str(&format_number(number.into()));

    if let Some(timestamp) = timestamp {
        line.push(' ');
        line.push_str(&timestamp.to_string());
    }

    line
}

/// Writes the record back out as a single line, without a terminator.
impl<'a> fmt::Display for Record<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Blank => Ok(()),
            Record::Comment(text) => f.write_str(&format_comment(text)),
            Record::Help {
                metric_name,
                help_text,
            } => f.write_str(&format_help(metric_name, help_text)),
            Record::MetricType {
                metric_name,
                metric_type,
            } => f.write_str(&format_metric_type(metric_name, *metric_type)),
            Record::Metric(sample) => f.write_str(&format_metric(
                sample.name,
                sample.number,
                Some(&sample.labels),
                sample.timestamp,
            )),
        }
    }
}
