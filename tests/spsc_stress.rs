//! SPSC Stress Test - CRC32-verified two-thread transfer
//!
//! Producer menuang blok data random lewat buffer dalam chunk berukuran
//! acak (length prefix u32 + bytes per record); consumer melipat setiap
//! chunk ke CRC32 berjalan. Kalau hash producer == hash consumer, tidak
//! ada record yang hilang, terduplikasi, atau setengah jadi.
//!
//! Usage:
//!   cargo test --release --test spsc_stress -- --nocapture

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tempo::RingBuffer;

const DATA_SIZE: usize = 1024 * 1024; // 1 MiB
const BUFFER_CAPACITY: u32 = 16 * 1024;

/// Konvensi harness (bukan bagian dari core): length prefix dengan nilai
/// ini menandai akhir stream.
const END_OF_STREAM: u32 = 0xFFFF_FFFF;

/// PRNG kecil deterministik (LCG) - cukup untuk data test
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.0
    }
}

/// CRC32 bitwise tanpa lookup table (polynomial 0xEDB88320)
fn crc32_update(mut crc: u32, data: &[u8]) -> u32 {
    for &byte in data {
        let mut val = 0xFF & (crc ^ byte as u32);
        for _ in 0..8 {
            val = if val & 1 != 0 {
                0xEDB88320 ^ (val >> 1)
            } else {
                val >> 1
            };
        }
        crc = (crc >> 8) ^ val;
    }
    crc
}

fn crc32(data: &[u8]) -> u32 {
    crc32_update(0xFFFF_FFFF, data) ^ 0xFFFF_FFFF
}

#[test]
fn stress_crc32_roundtrip() {
    // Generate data random dan hash referensinya
    let mut rng = Lcg(0x5EED);
    let data: Vec<u8> = (0..DATA_SIZE).map(|_| rng.next() as u8).collect();
    let expected_hash = crc32(&data);

    let mut buffer: RingBuffer<u64> = RingBuffer::new();
    assert!(buffer.reserve(BUFFER_CAPACITY));
    let buffer = Arc::new(buffer);

    let failed_writes = Arc::new(AtomicU64::new(0));
    let failed_reads = Arc::new(AtomicU64::new(0));

    // Producer: chunk berukuran acak, timestamp monoton naik
    let producer = {
        let buffer = Arc::clone(&buffer);
        let failed_writes = Arc::clone(&failed_writes);
        let data = data.clone();
        thread::spawn(move || {
            let mut rng = Lcg(0xCAFE);
            let max_chunk = (buffer.capacity() / 2) as usize;
            let mut cursor = 0usize;
            let mut sequence = 0u64;

            loop {
                if cursor < data.len() {
                    let chunk_size = 1 + (rng.next() as usize % max_chunk);
                    let chunk_size = chunk_size.min(data.len() - cursor);

                    let mut ok = false;
                    if let Some(mut wr) = buffer.try_write(sequence) {
                        if wr.append_value(chunk_size as u32)
                            && wr.append_bytes(&data[cursor..cursor + chunk_size])
                        {
                            cursor += chunk_size;
                            sequence += 1;
                            ok = true;
                        } else {
                            wr.invalidate();
                        }
                    }
                    if !ok {
                        failed_writes.fetch_add(1, Ordering::Relaxed);
                    }
                } else if let Some(mut wr) = buffer.try_write(sequence) {
                    if wr.append_value(END_OF_STREAM) {
                        break; // record terakhir
                    }
                    wr.invalidate();
                }
            }
        })
    };

    // Consumer: lipat setiap chunk ke CRC berjalan, cek timestamp monoton
    let consumer = {
        let buffer = Arc::clone(&buffer);
        let failed_reads = Arc::clone(&failed_reads);
        thread::spawn(move || {
            let mut crc = 0xFFFF_FFFFu32;
            let mut last_sequence = 0u64;

            loop {
                if let Some(mut rd) = buffer.try_read() {
                    assert!(rd.timestamp() >= last_sequence, "timestamp mundur");
                    last_sequence = rd.timestamp();

                    let chunk_size = rd.pop_value::<u32>().expect("record tanpa length prefix");
                    if chunk_size == END_OF_STREAM {
                        break;
                    }
                    assert!(
                        rd.pop_bytes(chunk_size, |chunk| crc = crc32_update(crc, chunk)),
                        "payload lebih pendek dari length prefix"
                    );
                } else {
                    failed_reads.fetch_add(1, Ordering::Relaxed);
                }
            }

            crc ^ 0xFFFF_FFFF
        })
    };

    let t0 = Instant::now();
    producer.join().unwrap();
    let consumer_hash = consumer.join().unwrap();
    let elapsed = t0.elapsed();

    println!(
        "  Transferred {} KiB in {:.2} ms ({:.2} MiB/sec)",
        DATA_SIZE / 1024,
        elapsed.as_secs_f64() * 1000.0,
        DATA_SIZE as f64 / (1024.0 * 1024.0) / elapsed.as_secs_f64()
    );
    println!(
        "  Failed writes: {}  Failed reads: {}",
        failed_writes.load(Ordering::Relaxed),
        failed_reads.load(Ordering::Relaxed)
    );
    println!("  CRC32: 0x{:08X}", consumer_hash);

    assert_eq!(consumer_hash, expected_hash);
    assert_eq!(buffer.occupied(), 0);
}

#[test]
fn stress_borrowed_mmap_storage() {
    // Anonymous mapping sebagai storage pinjaman - buffer tidak pernah
    // membebaskannya, mapping dilepas oleh memmap2 saat test selesai
    let mut mapping = memmap2::MmapMut::map_anon(BUFFER_CAPACITY as usize).unwrap();

    let mut buffer: RingBuffer<u64> = RingBuffer::new();
    assert!(unsafe { buffer.adopt(mapping.as_mut_ptr(), BUFFER_CAPACITY) });
    assert!(!buffer.reserve(64)); // ownership sudah terkunci ke borrowed
    let buffer = Arc::new(buffer);

    const RECORDS: u32 = 50_000;

    let producer = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            for i in 0..RECORDS {
                loop {
                    if let Some(mut wr) = buffer.try_write(i as u64) {
                        if wr.append_value(i) && wr.append_value(i.wrapping_mul(31)) {
                            break;
                        }
                        wr.invalidate();
                    }
                    thread::yield_now();
                }
            }
        })
    };

    let consumer = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            let mut received = 0u32;
            while received < RECORDS {
                if let Some(mut rd) = buffer.try_read() {
                    assert_eq!(rd.timestamp(), received as u64);
                    assert_eq!(rd.pop_value::<u32>(), Some(received));
                    assert_eq!(rd.pop_value::<u32>(), Some(received.wrapping_mul(31)));
                    received += 1;
                } else {
                    thread::yield_now();
                }
            }
        })
    };

    producer.join().unwrap();
    consumer.join().unwrap();
    assert_eq!(buffer.occupied(), 0);

    // Mapping masih milik kita
    drop(buffer);
    mapping[0] = 0;
}
