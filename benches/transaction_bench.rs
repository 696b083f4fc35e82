//! Criterion benchmark untuk transactional ring buffer
//!
//! Run dengan: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use tempo::RingBuffer;

fn bench_transaction_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("transaction");
    group.throughput(Throughput::Elements(1));

    // Satu record kecil: write + commit + read + commit
    group.bench_function("write_read_cycle", |b| {
        let mut buffer: RingBuffer<u64> = RingBuffer::new();
        assert!(buffer.reserve(65536));
        let mut i = 0u64;
        b.iter(|| {
            {
                let mut wr = buffer.try_write(black_box(i)).unwrap();
                wr.append_value(black_box(i as u32));
            }
            {
                let mut rd = buffer.try_read().unwrap();
                black_box(rd.pop_value::<u32>());
            }
            i = i.wrapping_add(1);
        });
    });

    // Commit record kosong (header saja) - ongkos minimum transaksi
    group.bench_function("empty_record", |b| {
        let mut buffer: RingBuffer<u64> = RingBuffer::new();
        assert!(buffer.reserve(65536));
        b.iter(|| {
            buffer.try_write(black_box(0)).unwrap();
            buffer.try_read().unwrap();
        });
    });

    group.finish();
}

fn bench_payload_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload");

    for payload_size in [64usize, 1024, 16384].iter() {
        let payload = vec![0xA5u8; *payload_size];
        group.throughput(Throughput::Bytes(*payload_size as u64));
        group.bench_function(format!("roundtrip_{}b", payload_size), |b| {
            let mut buffer: RingBuffer<u64> = RingBuffer::new();
            assert!(buffer.reserve(65536));
            b.iter(|| {
                {
                    let mut wr = buffer.try_write(0).unwrap();
                    wr.append_bytes(black_box(&payload));
                }
                {
                    let mut rd = buffer.try_read().unwrap();
                    rd.pop_bytes(payload.len() as u32, |chunk| {
                        black_box(chunk);
                    });
                }
            });
        });
    }

    group.finish();
}

fn bench_append_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("values");

    // Banyak value kecil per record - ongkos per append/pop
    for count in [10usize, 100].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_function(format!("append_pop_{}x_u64", count), |b| {
            let mut buffer: RingBuffer<u64> = RingBuffer::new();
            assert!(buffer.reserve(65536));
            b.iter(|| {
                {
                    let mut wr = buffer.try_write(0).unwrap();
                    for i in 0..*count {
                        wr.append_value(black_box(i as u64));
                    }
                }
                {
                    let mut rd = buffer.try_read().unwrap();
                    for _ in 0..*count {
                        black_box(rd.pop_value::<u64>());
                    }
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_transaction_cycle,
    bench_payload_sizes,
    bench_append_pop
);
criterion_main!(benches);
