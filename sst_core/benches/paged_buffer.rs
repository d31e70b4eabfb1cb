use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use sst_core::PagedBuffer;

const COUNT: usize = 100_000;
const PAGE_SIZE: usize = 1 << 10;

fn keys() -> Vec<Vec<u8>> {
    (0..COUNT).map(|i| format!("{:10}", i).into_bytes()).collect()
}

fn bench_write(c: &mut Criterion) {
    let keys = keys();
    let mut group = c.benchmark_group("write");
    group.throughput(Throughput::Bytes((COUNT * 10) as u64));

    group.bench_function("paged_buffer", |b| {
        b.iter(|| {
            let mut buf = PagedBuffer::new(PAGE_SIZE);
            for key in &keys {
                buf.write(key).unwrap();
            }
            black_box(buf.len())
        })
    });
    group.bench_function("vec", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(PAGE_SIZE);
            for key in &keys {
                buf.extend_from_slice(key);
            }
            black_box(buf.len())
        })
    });
    group.finish();
}

fn bench_bytes(c: &mut Criterion) {
    let keys = keys();
    let mut buf = PagedBuffer::new(PAGE_SIZE);
    for key in &keys {
        buf.write(key).unwrap();
    }
    c.bench_function("paged_buffer_bytes", |b| {
        b.iter(|| {
            let bytes = buf.bytes();
            assert_eq!(bytes.len(), COUNT * 10);
            black_box(bytes.len())
        })
    });
}

criterion_group!(benches, bench_write, bench_bytes);
criterion_main!(benches);
