//! Throughput Demo - CRC32-verified SPSC transfer
//!
//! Dua thread, satu buffer: producer menuang blok data random dalam
//! chunk berukuran acak, consumer menghitung CRC32 dari semua chunk yang
//! diterima. Di akhir, hash producer dan consumer harus identik.
//!
//! Format record (konvensi demo, bukan kontrak core):
//!   - u32: ukuran chunk yang menyusul
//!   - bytes chunk
//!   Record dengan ukuran 0xFFFF_FFFF menandai akhir transmisi.
//!
//! Usage:
//!   cargo run --release --example throughput -- [options]
//!
//! Options:
//!   --size <MiB>      Ukuran data yang ditransfer (default: 64)
//!   --capacity <KiB>  Kapasitas ring buffer (default: 2048)
//!   --pin             Pin producer/consumer ke core 0/1 (unix)
//!   --verbose         Progress per chunk

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tempo::RingBuffer;

const END_OF_STREAM: u32 = 0xFFFF_FFFF;

/// Get current timestamp in nanoseconds
#[inline(always)]
fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
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

/// PRNG kecil deterministik untuk data dan ukuran chunk
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.0
    }
}

/// Pin thread saat ini ke satu core (best effort)
#[cfg(target_os = "linux")]
fn pin_to_core(core: usize) {
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(core, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set);
    }
}

#[cfg(not(target_os = "linux"))]
fn pin_to_core(_core: usize) {}

struct DemoConfig {
    data_mib: usize,
    capacity_kib: u32,
    pin: bool,
    verbose: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            data_mib: 64,
            capacity_kib: 2048,
            pin: false,
            verbose: false,
        }
    }
}

fn parse_args() -> DemoConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = DemoConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--size" | "-s" => {
                if i + 1 < args.len() {
                    config.data_mib = args[i + 1].parse().unwrap_or(64);
                    i += 1;
                }
            }
            "--capacity" | "-c" => {
                if i + 1 < args.len() {
                    config.capacity_kib = args[i + 1].parse().unwrap_or(2048);
                    i += 1;
                }
            }
            "--pin" | "-p" => {
                config.pin = true;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--help" => {
                println!("Tempo Throughput Demo - CRC32-verified SPSC transfer\n");
                println!("Usage: throughput [OPTIONS]\n");
                println!("Options:");
                println!("  -s, --size <MiB>      Data size to transfer (default: 64)");
                println!("  -c, --capacity <KiB>  Ring buffer capacity (default: 2048)");
                println!("  -p, --pin             Pin threads to cores 0/1 (unix only)");
                println!("  -v, --verbose         Per-chunk progress output");
                println!("      --help            Show this help message");
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config
}

fn main() {
    let config = parse_args();
    let data_size = config.data_mib * 1024 * 1024;

    println!("🚀 Tempo Throughput Demo");
    println!("========================\n");
    println!("Configuration:");
    println!("  Data size:  {} MiB", config.data_mib);
    println!("  Capacity:   {} KiB", config.capacity_kib);
    println!();

    // Generate data random + hash referensi
    println!("Generating {} MiB of random data...", config.data_mib);
    let mut rng = Lcg(now_ns() | 1);
    let data: Vec<u8> = (0..data_size).map(|_| rng.next() as u8).collect();

    println!("Calculating reference CRC32...");
    let producer_hash = crc32_update(0xFFFF_FFFF, &data) ^ 0xFFFF_FFFF;
    println!("  CRC32 = 0x{:08X}\n", producer_hash);

    let mut buffer: RingBuffer<u64> = RingBuffer::new();
    if !buffer.reserve(config.capacity_kib * 1024) {
        eprintln!("❌ Allocation failed");
        std::process::exit(1);
    }
    println!("Buffer capacity = {} KiB", buffer.capacity() / 1024);
    let buffer = Arc::new(buffer);

    let failed_writes = Arc::new(AtomicU64::new(0));
    let failed_reads = Arc::new(AtomicU64::new(0));

    let t0 = Instant::now();

    // == Producer thread ========
    let producer = {
        let buffer = Arc::clone(&buffer);
        let failed_writes = Arc::clone(&failed_writes);
        let data = data;
        let pin = config.pin;
        let verbose = config.verbose;
        thread::spawn(move || {
            if pin {
                pin_to_core(0);
            }
            let mut rng = Lcg(0xCAFE);
            let max_chunk = (buffer.capacity() / 2) as usize;
            let mut cursor = 0usize;
            let start = Instant::now();

            loop {
                if cursor < data.len() {
                    let chunk_size = 1 + (rng.next() as usize % max_chunk);
                    let chunk_size = chunk_size.min(data.len() - cursor);

                    let mut ok = false;
                    if let Some(mut wr) = buffer.try_write(now_ns()) {
                        if wr.append_value(chunk_size as u32)
                            && wr.append_bytes(&data[cursor..cursor + chunk_size])
                        {
                            cursor += chunk_size;
                            ok = true;
                            if verbose {
                                println!("[producer] chunk {} bytes ({} sent)", chunk_size, cursor);
                            }
                        } else {
                            wr.invalidate();
                        }
                    }
                    if !ok {
                        failed_writes.fetch_add(1, Ordering::Relaxed);
                    }
                } else if let Some(mut wr) = buffer.try_write(now_ns()) {
                    if wr.append_value(END_OF_STREAM) {
                        break; // record terakhir
                    }
                    wr.invalidate();
                }
            }

            let secs = start.elapsed().as_secs_f64();
            println!(
                "[producer] done: {:.2} MiB/sec",
                data.len() as f64 / (1024.0 * 1024.0) / secs
            );
        })
    };

    // == Consumer thread ========
    let consumer = {
        let buffer = Arc::clone(&buffer);
        let failed_reads = Arc::clone(&failed_reads);
        let pin = config.pin;
        thread::spawn(move || {
            if pin {
                pin_to_core(1);
            }
            let mut crc = 0xFFFF_FFFFu32;
            let mut received = 0usize;
            let start = Instant::now();

            loop {
                if let Some(mut rd) = buffer.try_read() {
                    match rd.pop_value::<u32>() {
                        Some(END_OF_STREAM) => break,
                        Some(chunk_size) => {
                            if !rd.pop_bytes(chunk_size, |chunk| crc = crc32_update(crc, chunk)) {
                                eprintln!("[consumer] ❌ truncated record");
                                return 0;
                            }
                            received += chunk_size as usize;
                        }
                        None => {
                            eprintln!("[consumer] ❌ record without length prefix");
                            return 0;
                        }
                    }
                } else {
                    failed_reads.fetch_add(1, Ordering::Relaxed);
                }
            }

            let secs = start.elapsed().as_secs_f64();
            println!(
                "[consumer] done: {:.2} MiB/sec",
                received as f64 / (1024.0 * 1024.0) / secs
            );
            crc ^ 0xFFFF_FFFF
        })
    };

    producer.join().unwrap();
    let consumer_hash = consumer.join().unwrap();
    let elapsed = t0.elapsed();

    println!("\n📊 RESULTS");
    println!("==========");
    println!(
        "  {} (crc32 == 0x{:08X})",
        if consumer_hash == producer_hash {
            "✅ PASSED"
        } else {
            "❌ ERROR"
        },
        consumer_hash
    );
    println!(
        "  Failed writes: {}",
        failed_writes.load(Ordering::Relaxed)
    );
    println!(
        "  Failed reads:  {}",
        failed_reads.load(Ordering::Relaxed)
    );
    println!(
        "  Elapsed:       {:.2} ms ({:.2} MiB/sec end-to-end)",
        elapsed.as_secs_f64() * 1000.0,
        data_size as f64 / (1024.0 * 1024.0) / elapsed.as_secs_f64()
    );

    if consumer_hash != producer_hash {
        std::process::exit(1);
    }
}
