//! Core module: Transactional Ring Buffer
//!
//! Prinsip desain:
//! - SPSC: Satu producer, satu consumer, sinkronisasi cuma lewat satu
//!   atomic occupancy counter
//! - Zero-Allocation: Record ditulis langsung ke storage sirkular,
//!   tidak ada alokasi per record
//! - Transactional: Write/read di-scope dalam guard object yang commit
//!   saat drop (atau dibatalkan lewat invalidate)

mod plain;
mod ring_buffer;
mod storage;
mod transaction;

pub use plain::Plain;
pub use ring_buffer::RingBuffer;
pub use transaction::{ReadTransaction, WriteTransaction};
