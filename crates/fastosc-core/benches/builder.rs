//! Message builder benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fastosc_core::{decode, encode_message, ArgValue};

fn encode_benchmark(c: &mut Criterion) {
    let args = vec![
        ArgValue::Int(3),
        ArgValue::Float(0.75),
        ArgValue::from("volume"),
        ArgValue::Bool(true),
    ];

    c.bench_function("encode_scalar_message", |b| {
        b.iter(|| black_box(encode_message("/live/track/set/volume", &args).unwrap()))
    });
}

fn encode_nested_benchmark(c: &mut Criterion) {
    let args = vec![ArgValue::Array(
        (0..16)
            .map(|i| ArgValue::Array(vec![ArgValue::Int(i), ArgValue::Float(i as f64 / 16.0)]))
            .collect(),
    )];

    c.bench_function("encode_nested_message", |b| {
        b.iter(|| black_box(encode_message("/live/clip/get/notes", &args).unwrap()))
    });
}

fn decode_benchmark(c: &mut Criterion) {
    let frame = encode_message(
        "/live/track/set/volume",
        &[ArgValue::Int(3), ArgValue::Float(0.75)],
    )
    .unwrap();

    c.bench_function("decode_message", |b| {
        b.iter(|| black_box(decode(frame.as_bytes()).unwrap()))
    });
}

criterion_group!(benches, encode_benchmark, encode_nested_benchmark, decode_benchmark);
criterion_main!(benches);
