//! Borrowed Storage Demo - ring buffer di atas anonymous mapping
//!
//! Mode ownership kedua: buffer MEMINJAM memori eksternal lewat `adopt`
//! dan tidak pernah membebaskannya. Di sini memorinya anonymous mapping
//! dari memmap2; pemilik tetap mapping-nya.
//!
//! Usage:
//!   cargo run --release --example borrowed_mmap

use tempo::{append_many, RingBuffer};

const CAPACITY: u32 = 64 * 1024;

fn main() {
    println!("🚀 Tempo Borrowed Storage Demo");
    println!("==============================\n");

    let mut mapping = memmap2::MmapMut::map_anon(CAPACITY as usize).expect("mmap failed");
    println!("Mapped {} KiB anonymous memory", CAPACITY / 1024);

    let mut buffer: RingBuffer<u64> = RingBuffer::new();
    // SAFETY: mapping hidup lebih lama dari buffer dan tidak dipakai
    // pihak lain selama buffer hidup
    if !unsafe { buffer.adopt(mapping.as_mut_ptr(), CAPACITY) } {
        eprintln!("❌ adopt failed");
        std::process::exit(1);
    }
    println!("Adopted as ring storage (capacity = {} bytes)", buffer.capacity());

    // Ownership terkunci: reserve harus ditolak sekarang
    assert!(!buffer.reserve(1024));
    println!("reserve() correctly rejected after adopt()\n");

    // Round-trip beberapa record
    for i in 0u64..5 {
        if let Some(mut wr) = buffer.try_write(i) {
            let appended = append_many!(wr, i as u32, (i * i) as u32, i as f64);
            println!("[producer] record {} -> {} values appended", i, appended);
        }
    }
    println!("Occupied after writes: {} bytes\n", buffer.occupied());

    while let Some(mut rd) = buffer.try_read() {
        let a = rd.pop_value::<u32>().unwrap();
        let b = rd.pop_value::<u32>().unwrap();
        let c = rd.pop_value::<f64>().unwrap();
        println!(
            "[consumer] ts={} payload=({}, {}, {}) [{} bytes]",
            rd.timestamp(),
            a,
            b,
            c,
            rd.payload_len()
        );
    }

    println!("\nOccupied after reads: {} bytes", buffer.occupied());

    // Buffer dilepas; mapping masih utuh milik kita
    drop(buffer);
    mapping[0] = 0xFF;
    println!("✅ Mapping still owned by the demo after buffer drop");
}
