//! Tempo - Transactional SPSC Ring Buffer
//!
//! Arsitektur:
//! - Lock-Free: Satu atomic occupancy counter, tanpa Mutex/RwLock
//! - No-Allocation: Storage pre-allocated (atau dipinjam), tidak ada
//!   alokasi per record
//! - Transactional: Record dipublish atomik lewat commit, bisa dibatalkan
//!   lewat invalidate
//! - Timestamped: Setiap record membawa timestamp fixed-size pilihan caller
//!
//! Kontrak SPSC: tepat SATU thread producer dan SATU thread consumer per
//! buffer. Producer membuka write transaction, menuang data, lalu commit;
//! consumer membuka read transaction, mengambil data, lalu commit.
//!
//! ```no_run
//! use tempo::RingBuffer;
//!
//! let mut buffer: RingBuffer<u64> = RingBuffer::new();
//! buffer.reserve(8192);
//!
//! // Producer side
//! if let Some(mut wr) = buffer.try_write(42u64) {
//!     wr.append_value(7u32);
//! } // commit saat drop
//!
//! // Consumer side
//! if let Some(mut rd) = buffer.try_read() {
//!     let value: Option<u32> = rd.pop_value();
//!     assert_eq!(value, Some(7));
//! }; // commit saat drop
//! ```

pub mod core;

pub use crate::core::{Plain, ReadTransaction, RingBuffer, WriteTransaction};
