//! Write / Read transaction guards
//!
//! Satu transaksi = satu record. Kedua tipe commit otomatis saat drop
//! kecuali sudah di-invalidate. Gagalnya satu operasi append/pop TIDAK
//! membatalkan transaksinya - hanya operasi itu yang gagal, state cursor
//! dan budget tetap utuh.
//!
//! Format record di dalam buffer (satu-satunya "wire format"):
//! ┌──────────────┬────────────────────┬─────────────────────────┐
//! │ size: u32    │ timestamp: T       │ payload (size - header) │
//! └──────────────┴────────────────────┴─────────────────────────┘
//! Field size ditulis PALING AKHIR, saat commit, supaya begitu `occupied`
//! terlihat oleh consumer, record sudah utuh di storage.

use std::mem;

use super::plain::Plain;
use super::ring_buffer::RingBuffer;

/// Header record. Copy kerja milik transaksi; bentuk serialisasinya di
/// buffer adalah size diikuti timestamp TANPA padding (lihat
/// `RingBuffer::HEADER_SIZE`, jangan pakai `size_of` struct ini).
#[derive(Clone, Copy)]
struct RecordHeader<T: Plain> {
    /// Total bytes record = header + payload. Bertambah selama append.
    size: u32,
    timestamp: T,
}

// == Write transaction ========

/// Transaksi tulis satu record: reservasi ruang, tuang payload lewat
/// append, publish saat commit (eksplisit atau saat drop).
///
/// Paling banyak SATU instance hidup per buffer; dibuat lewat
/// [`RingBuffer::try_write`].
pub struct WriteTransaction<'a, T: Plain> {
    buffer: &'a RingBuffer<T>,
    header: RecordHeader<T>,
    /// Cursor tulis di ruang sirkular
    index: u32,
    /// Budget bytes yang di-cache. Boleh basi ke arah terlalu kecil:
    /// consumer cuma bisa MEMBEBASKAN ruang, jadi re-check hanya bisa
    /// jadi lebih permisif, tidak pernah false success.
    available: u32,
    active: bool,
}

impl<'a, T: Plain> WriteTransaction<'a, T> {
    pub(crate) fn opened(
        buffer: &'a RingBuffer<T>,
        timestamp: T,
        index: u32,
        available: u32,
    ) -> Self {
        Self {
            buffer,
            header: RecordHeader {
                size: RingBuffer::<T>::HEADER_SIZE,
                timestamp,
            },
            index,
            available,
            active: true,
        }
    }

    /// Masih hidup? (false setelah commit/invalidate)
    #[inline(always)]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Bytes payload yang sudah dituang sejauh ini.
    #[inline(always)]
    pub fn payload_len(&self) -> u32 {
        self.header.size - RingBuffer::<T>::HEADER_SIZE
    }

    /// Timestamp record ini (immutable sepanjang hidup transaksi).
    #[inline(always)]
    pub fn timestamp(&self) -> T {
        self.header.timestamp
    }

    /// Cek budget untuk `size` bytes. Kalau cache tidak cukup, hitung
    /// ulang dari `occupied` sekali sebelum menyerah.
    #[inline]
    fn can_write(&mut self, size: u32) -> bool {
        if !self.active {
            return false;
        }
        if self.available < size {
            self.available =
                self.buffer.capacity() - self.buffer.occupied_acquire() - self.header.size;
            if self.available < size {
                return false;
            }
        }
        true
    }

    /// Tuang bytes mentah. Atomik per call: semua tertulis atau tidak
    /// sama sekali (dan return false tanpa mengubah state apa pun).
    pub fn append_bytes(&mut self, data: &[u8]) -> bool {
        // Tolak sebelum cast: len yang tidak muat di u32 pasti tidak muat
        // di buffer (kapasitas maks 2^31), dan cast yang truncate akan
        // meloloskan copy melewati akhir storage
        if data.len() > u32::MAX as usize {
            return false;
        }
        let size = data.len() as u32;
        if !self.can_write(size) {
            return false;
        }

        // SAFETY: can_write menjamin range [index, index+size) masih di
        // ruang yang direservasi producer
        unsafe {
            self.buffer.write_span(self.index, data);
        }
        self.index = self.buffer.index_of(self.index + size);
        self.available -= size;
        self.header.size += size;
        true
    }

    /// Tuang satu value fixed-size. Kontrak atomisitas sama dengan
    /// `append_bytes`.
    pub fn append_value<V: Plain>(&mut self, value: V) -> bool {
        let size = mem::size_of::<V>() as u32;
        if !self.can_write(size) {
            return false;
        }

        // SAFETY: sama dengan append_bytes
        unsafe {
            self.buffer.write_plain(self.index, value);
        }
        self.index = self.buffer.index_of(self.index + size);
        self.available -= size;
        self.header.size += size;
        true
    }

    /// Batalkan: tidak ada yang dipublish, `end` dan `occupied` tidak
    /// tersentuh. Bytes yang sudah sempat tertulis jadi garbage yang
    /// akan ditimpa writer berikutnya.
    pub fn invalidate(&mut self) {
        if self.active {
            self.active = false;
            self.buffer.clear_writing();
        }
    }

    /// Publish record. Field size ditulis terakhir, lalu `end` maju dan
    /// `occupied` bertambah dengan release ordering. No-op kalau sudah
    /// tidak aktif.
    pub fn commit(&mut self) {
        if !self.active {
            return;
        }

        // SAFETY: slot size field ada di [end, end+4), bagian dari ruang
        // yang direservasi saat try_write
        unsafe {
            self.buffer
                .write_plain(self.buffer.end_cursor(), self.header.size);
        }
        self.buffer.publish(self.header.size);
        self.active = false;
    }
}

impl<T: Plain> Drop for WriteTransaction<'_, T> {
    fn drop(&mut self) {
        self.commit();
    }
}

// == Read transaction ========

/// Transaksi baca satu record yang sudah dipublish. Commit (eksplisit
/// atau saat drop) membuang SELURUH record, berapa pun yang sudah
/// di-pop; invalidate meninggalkan record di tempat untuk dibaca ulang.
///
/// Paling banyak SATU instance hidup per buffer; dibuat lewat
/// [`RingBuffer::try_read`].
pub struct ReadTransaction<'a, T: Plain> {
    buffer: &'a RingBuffer<T>,
    header: RecordHeader<T>,
    /// Cursor baca di ruang sirkular
    index: u32,
    /// Bytes payload yang belum di-pop
    available: u32,
    active: bool,
}

impl<'a, T: Plain> ReadTransaction<'a, T> {
    pub(crate) fn opened(
        buffer: &'a RingBuffer<T>,
        size: u32,
        timestamp: T,
        index: u32,
        available: u32,
    ) -> Self {
        Self {
            buffer,
            header: RecordHeader { size, timestamp },
            index,
            available,
            active: true,
        }
    }

    /// Masih hidup? (false setelah commit/invalidate)
    #[inline(always)]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Total bytes payload record ini (tidak berubah selama transaksi).
    #[inline(always)]
    pub fn payload_len(&self) -> u32 {
        self.header.size - RingBuffer::<T>::HEADER_SIZE
    }

    /// Bytes payload yang belum di-pop.
    #[inline(always)]
    pub fn remaining(&self) -> u32 {
        self.available
    }

    /// Timestamp yang ditulis producer untuk record ini.
    #[inline(always)]
    pub fn timestamp(&self) -> T {
        self.header.timestamp
    }

    #[inline(always)]
    fn can_read(&self, size: u32) -> bool {
        self.active && self.available >= size
    }

    /// Pop satu value fixed-size. `None` kalau sisa payload kurang dari
    /// `size_of::<V>()` - state tidak berubah.
    pub fn pop_value<V: Plain>(&mut self) -> Option<V> {
        let size = mem::size_of::<V>() as u32;
        if !self.can_read(size) {
            return None;
        }

        // SAFETY: can_read menjamin range masih di dalam payload record
        // yang sudah dipublish
        let value = unsafe { self.buffer.read_plain::<V>(self.index) };
        self.index = self.buffer.index_of(self.index + size);
        self.available -= size;
        Some(value)
    }

    /// Pop ke storage milik caller. Kontrak sama dengan `pop_value`.
    pub fn pop_into<V: Plain>(&mut self, dest: &mut V) -> bool {
        match self.pop_value::<V>() {
            Some(value) => {
                *dest = value;
                true
            }
            None => false,
        }
    }

    /// Pop `size` bytes lewat visitor, tanpa menyalin: satu call kalau
    /// range kontigu, dua call (span ekor lalu span kepala) kalau wrap.
    /// Gagal total (false, tanpa delivery parsial) kalau sisa payload
    /// kurang dari `size`.
    pub fn pop_bytes<F: FnMut(&[u8])>(&mut self, size: u32, mut visit: F) -> bool {
        if !self.can_read(size) {
            return false;
        }

        // SAFETY: sama dengan pop_value
        unsafe {
            self.buffer.visit_span(self.index, size, &mut visit);
        }
        self.index = self.buffer.index_of(self.index + size);
        self.available -= size;
        true
    }

    /// Batalkan: `start` dan `occupied` tidak tersentuh, jadi record yang
    /// sama (utuh dari awal) akan dikembalikan oleh `try_read` berikutnya.
    pub fn invalidate(&mut self) {
        if self.active {
            self.active = false;
            self.buffer.clear_reading();
        }
    }

    /// Buang seluruh record: `start` maju sebesar `size` record dan
    /// `occupied` berkurang dengan release ordering - terlepas dari berapa
    /// bytes yang sempat di-pop. No-op kalau sudah tidak aktif.
    pub fn commit(&mut self) {
        if !self.active {
            return;
        }
        self.buffer.retire(self.header.size);
        self.active = false;
    }
}

impl<T: Plain> Drop for ReadTransaction<'_, T> {
    fn drop(&mut self) {
        self.commit();
    }
}

/// Append beberapa value berurutan, berhenti di kegagalan pertama.
/// Menghasilkan jumlah value yang sukses ter-append. Kegagalan satu
/// append TIDAK membatalkan transaksinya.
///
/// ```no_run
/// # use tempo::{append_many, RingBuffer};
/// # let mut buffer: RingBuffer<u64> = RingBuffer::new();
/// # buffer.reserve(64);
/// let mut wr = buffer.try_write(0).unwrap();
/// let appended = append_many!(wr, 1u32, 2u32, 3.5f64);
/// assert_eq!(appended, 3);
/// ```
#[macro_export]
macro_rules! append_many {
    ($wr:expr $(, $value:expr)+ $(,)?) => {{
        let mut count = 0usize;
        let mut stopped = false;
        $(
            if !stopped {
                if $wr.append_value($value) {
                    count += 1;
                } else {
                    stopped = true;
                }
            }
        )+
        let _ = stopped;
        count
    }};
}
