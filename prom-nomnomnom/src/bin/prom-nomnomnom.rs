use anyhow::{anyhow, Result};
use clap::{ArgEnum, Parser};
use tracing_subscriber::EnvFilter;

use prom_nomnomnom::{parse_text, ErrorPolicy, Record};

#[derive(Clone, Copy, Debug, ArgEnum)]
enum Output {
    /// Rust debug representation of each record
    Debug,
    /// One JSON document per record
    Json,
    /// Each record written back out as exposition text
    Text,
}

#[derive(Debug, Parser)]
#[clap(about = "Parse a Prometheus text exposition file", version)]
struct Args {
    #[clap(short, long, required = true)]
    input: String,

    /// Stop at the first malformed line instead of skipping it
    #[clap(long)]
    fail_fast: bool,

    #[clap(short, long, arg_enum, default_value = "debug")]
    format: Output,
}

fn print_record(record: &Record, format: Output) -> Result<()> {
    match format {
        Output::Debug => println!("{:?}", record),
        Output::Json => println!("{}", serde_json::to_string(record)?),
        Output::Text => println!("{}", record),
    }

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let data = std::fs::read_to_string(&args.input)?;

    let policy = match args.fail_fast {
        true => ErrorPolicy::FailFast,
        false => ErrorPolicy::SkipAndReport,
    };

    let document = parse_text(&data, policy)?;

    for record in document.records.iter() {
        print_record(record, args.format)?;
    }

    for e in document.errors.iter() {
        eprintln!("{}", e);
    }

    match document.errors.len() {
        0 => Ok(()),
        n => Err(anyhow!("{} malformed line(s) in {}", n, args.input)),
    }
}
