//! Criterion microbenches for label line handling and dataset conversion.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure the performance of:
//! - Single-line parsing for both encodings (parse_line)
//! - Rectangle to oriented formatting (format_line)
//! - Detection and conversion over a small on-disk dataset

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use std::fs;
use std::hint::black_box;
use std::path::Path;

use labelhub::convert::{convert_dataset, ConvertOptions};
use labelhub::detect::{detect_format, DetectOptions};
use labelhub::label::{format_line, parse_line};

const RECT_FIXTURE: &str = "0 0.5 0.5 0.4 0.4
1 0.2 0.3 0.1 0.2
2 0.75 0.25 0.3 0.1
0 0.1 0.9 0.05 0.05
";

const OBB_FIXTURE: &str = "0 0.3 0.3 0.7 0.3 0.7 0.7 0.3 0.7
1 0.15 0.2 0.25 0.2 0.25 0.4 0.15 0.4
";

fn write_dataset(root: &Path, files: usize) {
    let labels = root.join("labels");
    fs::create_dir_all(&labels).expect("create labels dir");
    for i in 0..files {
        fs::write(labels.join(format!("{i:04}.txt")), RECT_FIXTURE).expect("write label");
    }
}

/// Benchmark parsing of rectangle and oriented lines.
fn bench_parse_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_line");

    for (name, fixture) in [("rectangle", RECT_FIXTURE), ("oriented", OBB_FIXTURE)] {
        group.throughput(Throughput::Bytes(fixture.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| {
                for line in black_box(fixture).lines() {
                    black_box(parse_line(line).unwrap());
                }
            })
        });
    }

    group.finish();
}

/// Benchmark converting parsed rectangles to oriented text.
fn bench_format_oriented(c: &mut Criterion) {
    let parsed: Vec<_> = RECT_FIXTURE
        .lines()
        .map(|line| parse_line(line).unwrap().unwrap())
        .collect();

    let mut group = c.benchmark_group("format_line");
    group.throughput(Throughput::Elements(parsed.len() as u64));

    group.bench_function("rect_to_oriented", |b| {
        b.iter(|| {
            for annotation in black_box(&parsed) {
                black_box(format_line(&annotation.to_oriented()));
            }
        })
    });

    group.finish();
}

/// Benchmark detection and conversion of a 64-file dataset.
fn bench_dataset(c: &mut Criterion) {
    const FILES: usize = 64;

    let mut group = c.benchmark_group("dataset");
    group.throughput(Throughput::Elements(FILES as u64));

    let detect_root = tempfile::tempdir().expect("create temp dir");
    write_dataset(detect_root.path(), FILES);
    group.bench_function("detect_format", |b| {
        b.iter(|| black_box(detect_format(detect_root.path(), &DetectOptions::default()).unwrap()))
    });

    group.bench_function("convert_dataset", |b| {
        b.iter_batched(
            || {
                let temp = tempfile::tempdir().expect("create temp dir");
                write_dataset(temp.path(), FILES);
                temp
            },
            |temp| black_box(convert_dataset(temp.path(), &ConvertOptions::default()).unwrap()),
            BatchSize::PerIteration,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_parse_line, bench_format_oriented, bench_dataset);
criterion_main!(benches);
