use anyhow::{anyhow, Result};
use indoc::indoc;
use prom_nomnomnom::{format_metric, parse_text, ErrorPolicy, LabelSet, Record};

/// Copies every sample with an extra label, passing everything else through untouched.
fn relabel(data: &str, name: &str, value: &str) -> Result<String> {
    let document = parse_text(data, ErrorPolicy::FailFast)?;

    let lines = document
        .records
        .iter()
        .map(|record| -> Result<String> {
            match record {
                Record::Metric(sample) => {
                    let mut labels = LabelSet::new();
                    labels.insert(name, value)?;
                    for label in sample.labels.iter() {
                        labels.insert(&*label.name, &*label.value)?;
                    }

                    Ok(format_metric(
                        sample.name,
                        sample.number,
                        Some(&labels),
                        sample.timestamp,
                    ))
                }
                other => Ok(other.to_string()),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(lines.join("\n"))
}

fn main() -> Result<()> {
    let exposition = indoc! {r#"
        # HELP http_requests_total The total number of HTTP requests.
        # TYPE http_requests_total counter
        http_requests_total{method="post",code="200"} 1027 1395066363000
        http_requests_total{method="post",code="400"}    3 1395066363000

        # Minimalistic line:
        metric_without_timestamp_and_labels 12.47
    "#};

    let mut args = std::env::args();

    let progname = args.next().ok_or(anyhow!("ARGV[0] was not set??"))?;

    let (name, value) = match (args.next(), args.next()) {
        (Some(arg), _) if arg == "--help" => {
            println!("Usage: {} [<label name> <label value>]", progname);
            return Ok(());
        }
        (Some(name), Some(value)) => (name, value),
        (None, None) => ("instance".to_string(), "localhost:9100".to_string()),
        _ => return Err(anyhow!("a label needs both a name and a value")),
    };

    println!("{}", relabel(exposition, &name, &value)?);

    Ok(())
}
