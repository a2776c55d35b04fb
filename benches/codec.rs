use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use phx42::{Message, MessageKind};

fn telemetry_params(count: usize) -> BTreeMap<String, String> {
    (0..count)
        .map(|i| (format!("CH{i}"), format!("{}.{}", i * 7, i)))
        .collect()
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    // Bare heartbeat, the most common outbound line.
    let chek = Message::command(MessageKind::Heartbeat);
    group.throughput(Throughput::Bytes(chek.encode().len() as u64));
    group.bench_function("encode_chek", |b| {
        b.iter(|| {
            black_box(chek.encode());
        });
    });

    // Telemetry-sized parameter list.
    let fidr = Message::command_with_params(MessageKind::FidReadings, telemetry_params(8));
    group.throughput(Throughput::Bytes(fidr.encode().len() as u64));
    group.bench_function("encode_fidr_8_params", |b| {
        b.iter(|| {
            black_box(fidr.encode());
        });
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    let chek = "YTyt CHEK\r\n";
    group.throughput(Throughput::Bytes(chek.len() as u64));
    group.bench_function("decode_chek", |b| {
        b.iter(|| {
            black_box(Message::parse(chek).unwrap());
        });
    });

    let fidr =
        Message::command_with_params(MessageKind::FidReadings, telemetry_params(8)).encode();
    group.throughput(Throughput::Bytes(fidr.len() as u64));
    group.bench_function("decode_fidr_8_params", |b| {
        b.iter(|| {
            black_box(Message::parse(&fidr).unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
