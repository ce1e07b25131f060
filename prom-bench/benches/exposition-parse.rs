use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use prom_nomnomnom::{format_metric, parse_text, records, ErrorPolicy, LabelSet, Record};

const SIZES: &[usize] = &[10, 100, 1000];

/// A node-exporter-ish document with `families` metric families
fn exposition(families: usize) -> String {
    (0..families)
        .map(|i| {
            format!(
                concat!(
                    "# HELP family_{i}_total Requests handled by handler {i}.\n",
                    "# TYPE family_{i}_total counter\n",
                    "family_{i}_total{{method=\"get\",code=\"200\",path=\"/api/{i}\"}} {i} 1395066363000\n",
                    "family_{i}_total{{method=\"post\",code=\"500\",path=\"C:\\\\DIR\\\\{i}\"}} {i}.5e3\n",
                    "family_{i}_seconds +Inf\n",
                    "\n",
                ),
                i = i
            )
        })
        .collect()
}

fn parse(cr: &mut Criterion) {
    let mut group = cr.benchmark_group("parse");

    for size in SIZES {
        let data = exposition(*size);

        group.bench_with_input(BenchmarkId::new("fail_fast", size), &data, |b, data| {
            b.iter(|| parse_text(black_box(data), ErrorPolicy::FailFast).map(|d| d.records.len()))
        });

        group.bench_with_input(BenchmarkId::new("skip_and_report", size), &data, |b, data| {
            b.iter(|| {
                parse_text(black_box(data), ErrorPolicy::SkipAndReport).map(|d| d.records.len())
            })
        });

        group.bench_with_input(BenchmarkId::new("lazy", size), &data, |b, data| {
            b.iter(|| records(black_box(data)).filter(Result::is_ok).count())
        });
    }
}

fn format(cr: &mut Criterion) {
    let mut group = cr.benchmark_group("format");

    for size in SIZES {
        let data = exposition(*size);
        let document = match parse_text(&data, ErrorPolicy::FailFast) {
            Ok(document) => document,
            Err(e) => panic!("benchmark data does not parse: {}", e),
        };

        group.bench_with_input(BenchmarkId::new("records", size), &document, |b, document| {
            b.iter(|| {
                document
                    .records
                    .iter()
                    .map(|record| record.to_string().len())
                    .sum::<usize>()
            })
        });

        group.bench_with_input(BenchmarkId::new("relabel", size), &document, |b, document| {
            b.iter(|| {
                document
                    .records
                    .iter()
                    .filter_map(|record| match record {
                        Record::Metric(sample) => {
                            let labels = LabelSet::try_from_iter(
                                sample
                                    .labels
                                    .iter()
                                    .map(|l| (&*l.name, &*l.value))
                                    .chain([("instance", "localhost:9100")]),
                            )
                            .ok()?;
                            Some(format_metric(
                                sample.name,
                                sample.number,
                                Some(&labels),
                                sample.timestamp,
                            ))
                        }
                        _ => None,
                    })
                    .count()
            })
        });
    }
}

criterion_group!(exposition_benches, parse, format);
criterion_main!(exposition_benches);
