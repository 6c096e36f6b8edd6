//! Response buffer growth and streaming drain benchmark.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use curlnet::easy::{grown_capacity, ResponseBuffer, StreamingController};

fn buffer_append(c: &mut Criterion) {
    let chunk = vec![b'x'; 16 * 1024];

    c.bench_function("buffer_append_1mib_fresh", |b| {
        b.iter(|| {
            let mut buffer = ResponseBuffer::body();
            for _ in 0..64 {
                buffer.append(black_box(&chunk)).unwrap();
            }
            buffer.len()
        })
    });

    c.bench_function("buffer_append_1mib_reused", |b| {
        let mut buffer = ResponseBuffer::body();
        b.iter(|| {
            buffer.truncate();
            for _ in 0..64 {
                buffer.append(black_box(&chunk)).unwrap();
            }
            buffer.len()
        })
    });
}

fn capacity_growth(c: &mut Criterion) {
    c.bench_function("grown_capacity_large", |b| {
        b.iter(|| grown_capacity(black_box(8192), 8192, black_box(64 * 1024 * 1024 + 1)))
    });
}

fn streaming_drain(c: &mut Criterion) {
    let chunk = vec![b'y'; 4096];

    c.bench_function("streaming_drain_interleaved", |b| {
        b.iter(|| {
            let mut buffer = ResponseBuffer::body();
            let mut stream = StreamingController::new();
            stream.set_enabled(true);
            let mut total = 0;
            for _ in 0..32 {
                buffer.append(&chunk).unwrap();
                total += stream.drain(&buffer).len();
            }
            total
        })
    });
}

criterion_group!(benches, buffer_append, capacity_growth, streaming_drain);
criterion_main!(benches);
