use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use verlicore::config::Limits;
use verlicore::proto::Message;

fn message_parsing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");
    let limits = Limits::default();
    let raw = "<alice> hello world|";
    group.throughput(Throughput::Bytes(raw.len() as u64));

    group.bench_function("parse_chat", |b| {
        b.iter(|| Message::parse(raw, &limits).unwrap())
    });

    group.finish();
}

fn lock_key_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("lock");
    let lock = verlicore::proto::lock::generate_lock();
    group.throughput(Throughput::Bytes(lock.len() as u64));

    group.bench_function("lock_to_key", |b| {
        b.iter(|| verlicore::proto::lock::lock_to_key(&lock))
    });

    group.finish();
}

criterion_group!(benches, message_parsing_benchmark, lock_key_benchmark);
criterion_main!(benches);
