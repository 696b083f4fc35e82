//! Transactional SPSC Ring Buffer
//!
//! Container sirkular fixed-capacity untuk record variable-length yang
//! di-timestamp. Tidak ada Mutex: producer dan consumer masing-masing
//! memiliki cursor sendiri (`end` / `start`), dan satu-satunya state yang
//! disentuh dua thread adalah counter `occupied` (atomic).
//!
//! Protokol ordering:
//! - Commit producer = release store ke `occupied` SETELAH seluruh
//!   header+payload tertulis, jadi consumer tidak pernah melihat record
//!   setengah jadi
//! - Commit consumer = release store ke `occupied` SETELAH selesai
//!   membaca, jadi producer tidak pernah menimpa bytes yang belum dilepas

use std::cell::Cell;
use std::marker::PhantomData;
use std::mem;
use std::sync::atomic::{AtomicU32, Ordering};

use super::plain::Plain;
use super::storage::Storage;
use super::transaction::{ReadTransaction, WriteTransaction};

/// Ring buffer transaksional untuk tepat satu producer dan satu consumer.
///
/// Dibuat invalid (tanpa storage); `reserve` atau `adopt` membuatnya
/// usable. Kapasitas selalu power of 2 sehingga modulo jadi bitwise AND.
pub struct RingBuffer<T: Plain> {
    storage: Storage,
    capacity: u32,
    capacity_mask: u32,
    /// Cursor baca - HANYA dimutasi oleh consumer
    start: Cell<u32>,
    /// Cursor tulis - HANYA dimutasi oleh producer
    end: Cell<u32>,
    /// Jumlah bytes valid di antara start dan end. Satu-satunya titik
    /// sinkronisasi antar thread.
    occupied: AtomicU32,
    /// Flag transaksi in-flight. Plain Cell, bukan atomic: masing-masing
    /// hanya disentuh oleh sisi pemiliknya di bawah kontrak SPSC.
    writing: Cell<bool>,
    reading: Cell<bool>,
    _timestamp: PhantomData<T>,
}

// SAFETY: RingBuffer boleh dibagi antar thread HANYA di bawah kontrak
// SPSC: satu thread memanggil try_write (menyentuh end + writing), satu
// thread lain memanggil try_read (menyentuh start + reading), dan kedua
// sisi bertemu hanya di `occupied` yang atomic. Range storage yang
// ditulis producer ([end, end+reserved)) dan yang dibaca consumer
// ([start, start+consumed)) tidak pernah overlap karena `occupied`
// membatasi keduanya.
unsafe impl<T: Plain + Send> Send for RingBuffer<T> {}
unsafe impl<T: Plain + Send> Sync for RingBuffer<T> {}

impl<T: Plain> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Plain> RingBuffer<T> {
    /// Ukuran header record yang diserialisasi: field size (u32) diikuti
    /// timestamp, tanpa padding.
    pub const HEADER_SIZE: u32 = (mem::size_of::<u32>() + mem::size_of::<T>()) as u32;

    /// Buffer baru tanpa storage. Semua transaksi gagal sampai `reserve`
    /// atau `adopt` sukses.
    pub fn new() -> Self {
        Self {
            storage: Storage::Empty,
            capacity: 0,
            capacity_mask: 0,
            start: Cell::new(0),
            end: Cell::new(0),
            occupied: AtomicU32::new(0),
            writing: Cell::new(false),
            reading: Cell::new(false),
            _timestamp: PhantomData,
        }
    }

    /// Kapasitas minimum = ukuran header (record kosong pun butuh header).
    #[inline(always)]
    pub const fn min_capacity() -> u32 {
        Self::HEADER_SIZE
    }

    /// Alokasikan storage milik sendiri.
    ///
    /// Kapasitas aktual = max(wanted, min_capacity) dibulatkan ke atas ke
    /// power of 2. Shrink (kapasitas baru <= kapasitas sekarang) memakai
    /// ulang alokasi lama dan hanya me-reset metadata; selain itu alokasi
    /// lama dilepas dan diganti yang baru.
    /// Gagal (buffer tetap/menjadi invalid) hanya kalau allocator gagal,
    /// atau kalau `adopt` pernah dipanggil sebelumnya.
    pub fn reserve(&mut self, wanted_capacity: u32) -> bool {
        if !self.storage.is_owned() && !self.storage.is_empty() {
            return false; // sudah terlanjur adopt
        }

        let new_capacity = match wanted_capacity
            .max(Self::min_capacity())
            .checked_next_power_of_two()
        {
            Some(c) => c,
            None => return false,
        };

        let shrinking = new_capacity <= self.capacity && self.storage.can_reuse(new_capacity);
        if !shrinking {
            // Alokasi lama (kalau ada) dilepas dulu baru minta yang baru
            self.storage = Storage::Empty;
            self.storage = match Storage::allocate(new_capacity) {
                Some(s) => s,
                None => {
                    self.reset_metadata(0);
                    return false;
                }
            };
        }

        self.reset_metadata(new_capacity);
        true
    }

    /// Adopsi memori eksternal sebagai storage pinjaman.
    ///
    /// Gagal kalau `ptr` null, `capacity` bukan power of 2 atau di bawah
    /// `min_capacity`, atau kalau `reserve` pernah sukses di instance ini.
    /// Buffer TIDAK pernah membebaskan memori pinjaman.
    ///
    /// # Safety
    ///
    /// `ptr` harus valid untuk read/write sepanjang `capacity` bytes
    /// selama buffer ini hidup, dan tidak boleh diakses pihak lain selama
    /// itu.
    pub unsafe fn adopt(&mut self, ptr: *mut u8, capacity: u32) -> bool {
        if ptr.is_null() || self.storage.is_owned() {
            return false;
        }
        if !capacity.is_power_of_two() || capacity < Self::min_capacity() {
            return false;
        }

        self.storage = Storage::Borrowed { ptr };
        self.reset_metadata(capacity);
        true
    }

    /// Kapasitas dalam bytes (0 kalau belum diinisialisasi).
    #[inline(always)]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Jumlah bytes yang sedang terisi. Nilai diagnostik saja - jangan
    /// pakai ini untuk sinkronisasi, pakai protokol transaksi.
    #[inline(always)]
    pub fn occupied(&self) -> u32 {
        self.occupied.load(Ordering::Acquire)
    }

    /// Ada record yang siap dibaca? Panggil dari sisi consumer saja.
    #[inline(always)]
    pub fn has_data(&self) -> bool {
        self.occupied.load(Ordering::Acquire) > 0
    }

    /// Buffer sudah punya storage yang usable?
    #[inline(always)]
    pub fn is_valid(&self) -> bool {
        !self.storage.is_empty()
    }

    /// Buka write transaction untuk satu record baru (sisi producer).
    ///
    /// `None` kalau buffer invalid, masih ada write transaction lain yang
    /// hidup, atau ruang bebas tidak cukup bahkan untuk header saja.
    /// Timestamp langsung ditulis ke slot header; field size diisi
    /// belakangan saat commit.
    pub fn try_write(&self, timestamp: T) -> Option<WriteTransaction<'_, T>> {
        if !self.is_valid() || self.writing.get() {
            return None;
        }

        let free = self.capacity - self.occupied.load(Ordering::Acquire);
        if free < Self::HEADER_SIZE {
            return None;
        }

        self.writing.set(true);
        let end = self.end.get();

        // SAFETY: range [end, end + HEADER_SIZE) berada di ruang bebas -
        // `occupied` menjamin consumer tidak membaca ke sana
        unsafe {
            self.write_plain(self.index_of(end + mem::size_of::<u32>() as u32), timestamp);
        }

        Some(WriteTransaction::opened(
            self,
            timestamp,
            self.index_of(end + Self::HEADER_SIZE),
            free - Self::HEADER_SIZE,
        ))
    }

    /// Buka read transaction untuk record terdepan (sisi consumer).
    ///
    /// `None` kalau buffer invalid, masih ada read transaction lain yang
    /// hidup, atau buffer kosong. Acquire load pada `occupied` menjamin
    /// header+payload yang dibaca sudah lengkap.
    pub fn try_read(&self) -> Option<ReadTransaction<'_, T>> {
        if !self.is_valid() || self.reading.get() {
            return None;
        }
        if self.occupied.load(Ordering::Acquire) == 0 {
            return None;
        }

        self.reading.set(true);
        let start = self.start.get();

        // SAFETY: occupied > 0 menjamin ada record lengkap mulai di start
        let (size, timestamp) = unsafe {
            (
                self.read_plain::<u32>(start),
                self.read_plain::<T>(self.index_of(start + mem::size_of::<u32>() as u32)),
            )
        };

        Some(ReadTransaction::opened(
            self,
            size,
            timestamp,
            self.index_of(start + Self::HEADER_SIZE),
            size - Self::HEADER_SIZE,
        ))
    }

    // == Akses internal untuk transaksi ========

    #[inline(always)]
    pub(crate) fn end_cursor(&self) -> u32 {
        self.end.get()
    }

    #[inline(always)]
    pub(crate) fn occupied_acquire(&self) -> u32 {
        self.occupied.load(Ordering::Acquire)
    }

    /// Publish record: maju-kan `end`, lalu release-add ke `occupied`.
    /// Dipanggil oleh commit write SETELAH field size tertulis.
    #[inline(always)]
    pub(crate) fn publish(&self, record_size: u32) {
        self.end.set(self.index_of(self.end.get() + record_size));
        self.occupied.fetch_add(record_size, Ordering::Release);
        self.writing.set(false);
    }

    /// Buang record terdepan: maju-kan `start`, lalu release-sub dari
    /// `occupied`. Dipanggil oleh commit read.
    #[inline(always)]
    pub(crate) fn retire(&self, record_size: u32) {
        self.start.set(self.index_of(self.start.get() + record_size));
        self.occupied.fetch_sub(record_size, Ordering::Release);
        self.reading.set(false);
    }

    #[inline(always)]
    pub(crate) fn clear_writing(&self) {
        self.writing.set(false);
    }

    #[inline(always)]
    pub(crate) fn clear_reading(&self) {
        self.reading.set(false);
    }

    /// Wrap index logis ke [0, capacity).
    #[inline(always)]
    pub(crate) fn index_of(&self, index: u32) -> u32 {
        index & self.capacity_mask
    }

    // == Primitif transfer wraparound ========
    //
    // Semua akses storage lewat sini. Range logis [idx, idx+n) disalin
    // sebagai satu span kontigu, atau dipecah jadi span ekor + span kepala
    // kalau melewati ujung array.

    /// Tulis `src` mulai di offset `idx` (dengan wraparound).
    ///
    /// # Safety
    ///
    /// Caller menjamin range tersebut milik producer (ruang bebas yang
    /// sudah direservasi) dan `src.len() <= capacity`.
    pub(crate) unsafe fn write_span(&self, idx: u32, src: &[u8]) {
        let ptr = self.storage.ptr();
        let idx = idx as usize;
        let n = src.len();
        let capacity = self.capacity as usize;

        if idx + n <= capacity {
            std::ptr::copy_nonoverlapping(src.as_ptr(), ptr.add(idx), n);
        } else {
            let tail = capacity - idx;
            std::ptr::copy_nonoverlapping(src.as_ptr(), ptr.add(idx), tail);
            std::ptr::copy_nonoverlapping(src.as_ptr().add(tail), ptr, n - tail);
        }
    }

    /// Baca `dst.len()` bytes mulai di offset `idx` (dengan wraparound).
    ///
    /// # Safety
    ///
    /// Caller menjamin range tersebut berisi data record yang sudah
    /// dipublish dan `dst.len() <= capacity`.
    pub(crate) unsafe fn read_span(&self, idx: u32, dst: &mut [u8]) {
        let ptr = self.storage.ptr();
        let idx = idx as usize;
        let n = dst.len();
        let capacity = self.capacity as usize;

        if idx + n <= capacity {
            std::ptr::copy_nonoverlapping(ptr.add(idx), dst.as_mut_ptr(), n);
        } else {
            let tail = capacity - idx;
            std::ptr::copy_nonoverlapping(ptr.add(idx), dst.as_mut_ptr(), tail);
            std::ptr::copy_nonoverlapping(ptr, dst.as_mut_ptr().add(tail), n - tail);
        }
    }

    /// Tulis satu value fixed-size di offset `idx`. Kasus non-wrap memakai
    /// store langsung (unaligned), semantik sama dengan menyalin
    /// `size_of::<V>()` bytes.
    ///
    /// # Safety
    ///
    /// Kontrak sama dengan `write_span`.
    #[inline(always)]
    pub(crate) unsafe fn write_plain<V: Plain>(&self, idx: u32, value: V) {
        let size = mem::size_of::<V>() as u32;
        if idx + size <= self.capacity {
            std::ptr::write_unaligned(self.storage.ptr().add(idx as usize) as *mut V, value);
        } else {
            let bytes =
                std::slice::from_raw_parts(&value as *const V as *const u8, size as usize);
            self.write_span(idx, bytes);
        }
    }

    /// Baca satu value fixed-size dari offset `idx`. Kasus non-wrap
    /// memakai load langsung (unaligned).
    ///
    /// # Safety
    ///
    /// Kontrak sama dengan `read_span`. `V: Plain` menjamin bit pattern
    /// apa pun valid.
    #[inline(always)]
    pub(crate) unsafe fn read_plain<V: Plain>(&self, idx: u32) -> V {
        let size = mem::size_of::<V>() as u32;
        if idx + size <= self.capacity {
            std::ptr::read_unaligned(self.storage.ptr().add(idx as usize) as *const V)
        } else {
            let mut value = mem::MaybeUninit::<V>::uninit();
            let dst = std::slice::from_raw_parts_mut(value.as_mut_ptr() as *mut u8, size as usize);
            self.read_span(idx, dst);
            value.assume_init()
        }
    }

    /// Pinjamkan range [idx, idx+len) ke visitor tanpa menyalin: satu
    /// slice kalau kontigu, dua slice (ekor lalu kepala) kalau wrap.
    ///
    /// # Safety
    ///
    /// Kontrak sama dengan `read_span`. Visitor tidak boleh menyimpan
    /// slice-nya.
    pub(crate) unsafe fn visit_span<F: FnMut(&[u8])>(&self, idx: u32, len: u32, visit: &mut F) {
        let ptr = self.storage.ptr();
        let idx = idx as usize;
        let len = len as usize;
        let capacity = self.capacity as usize;

        if idx + len <= capacity {
            visit(std::slice::from_raw_parts(ptr.add(idx), len));
        } else {
            let tail = capacity - idx;
            visit(std::slice::from_raw_parts(ptr.add(idx), tail));
            visit(std::slice::from_raw_parts(ptr, len - tail));
        }
    }

    /// Reset metadata setelah (re)inisialisasi. Transaksi in-flight tidak
    /// mungkin ada: reserve/adopt butuh &mut self.
    fn reset_metadata(&mut self, capacity: u32) {
        self.capacity = capacity;
        self.capacity_mask = capacity.wrapping_sub(1);
        self.start.set(0);
        self.end.set(0);
        self.occupied.store(0, Ordering::Relaxed);
        self.writing.set(false);
        self.reading.set(false);
    }
}
