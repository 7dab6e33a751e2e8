use std::{hint::black_box, iter::repeat_with, time::Duration};

use chrono::Utc;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fieldline::{
    buffer::Buffer, encode, BoundFields, Field, Format, Level, LogRequest, Logger, Options,
    OverflowPolicy,
};

fn random_fields(count: usize) -> Vec<Field<'static>> {
    (0..count)
        .map(|i| {
            let key = format!("k{i}");
            match i % 4 {
                0 => Field::str(key, repeat_with(fastrand::alphanumeric).take(24).collect::<String>()),
                1 => Field::int64(key, fastrand::i64(..)),
                2 => Field::float64(key, fastrand::f64()),
                _ => Field::duration(key, Duration::from_micros(fastrand::u64(..1_000_000))),
            }
        })
        .collect()
}

fn render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let options = Options::default();
    let now = Utc::now();

    for count in [0, 4, 16] {
        let fields = random_fields(count);
        let request = LogRequest::new(Level::INFO, "request served", now, &fields);
        group.throughput(Throughput::Elements(1));
        for format in [Format::Text, Format::Json] {
            let id = BenchmarkId::new(format!("{format:?}"), count);
            group.bench_with_input(id, &request, |b, request| {
                let mut buf = Buffer::with_capacity(2048);
                b.iter(|| {
                    buf.clear();
                    encode::render(&mut buf, format, request, b"", options.encoding())
                        .expect("render");
                    black_box(buf.len());
                });
            });
        }
    }
    group.finish();
}

fn deliver(c: &mut Criterion) {
    let mut group = c.benchmark_group("deliver");
    let fields = random_fields(8);

    for format in [Format::Text, Format::Json] {
        let logger = Logger::to_writer(std::io::sink(), Options::default().format(format))
            .expect("logger")
            .bind(&[Field::str("svc", "bench"), Field::int64("shard", 7)]);
        group.bench_function(BenchmarkId::new("sync", format!("{format:?}")), |b| {
            b.iter(|| logger.info("request served", black_box(&fields)));
        });
        logger.close();
    }

    let logger = Logger::to_writer(
        std::io::sink(),
        Options::default()
            .format(Format::Json)
            .async_delivery(true)
            .overflow_policy(OverflowPolicy::DropNewest),
    )
    .expect("logger");
    group.bench_function("async_drop_newest", |b| {
        b.iter(|| logger.info("request served", black_box(&fields)));
    });
    logger.close();

    let filtered = Logger::to_writer(std::io::sink(), Options::default().min_level(Level::WARN))
        .expect("logger");
    group.bench_function("filtered", |b| {
        b.iter(|| filtered.debug("never rendered", black_box(&fields)));
    });
    group.finish();
}

fn bind(c: &mut Criterion) {
    let fields = random_fields(8);
    let options = Options::default();
    let buffers = fieldline::buffer::BufferPool::default();
    c.bench_function("bind/8", |b| {
        b.iter(|| {
            BoundFields::empty()
                .bind(black_box(&fields), options.encoding(), &buffers)
                .expect("bind")
        });
    });
}

criterion_group!(benches, render, deliver, bind);
criterion_main!(benches);
