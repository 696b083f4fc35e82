//! Backing storage dengan tagged ownership
//!
//! Buffer bisa memiliki memorinya sendiri (dialokasikan lewat `reserve`,
//! dibebaskan saat drop) atau meminjam memori eksternal (lewat `adopt`,
//! TIDAK pernah dibebaskan). Mode ownership dikunci oleh inisialisasi
//! pertama yang sukses dan tidak bisa berubah setelahnya.

use std::alloc::{alloc, dealloc, Layout};

/// Backing storage dari ring buffer.
pub(crate) enum Storage {
    /// Belum ada storage - buffer invalid
    Empty,
    /// Memori milik buffer, dibebaskan saat drop.
    ///
    /// `alloc_size` adalah ukuran alokasi asli; kapasitas logis buffer
    /// boleh lebih kecil kalau `reserve` dipanggil ulang dengan ukuran
    /// yang muat di alokasi lama.
    Owned { ptr: *mut u8, alloc_size: u32 },
    /// Memori pinjaman - ownership tetap di caller. Kapasitasnya dicatat
    /// di metadata buffer, bukan di sini.
    Borrowed { ptr: *mut u8 },
}

impl Storage {
    /// Alokasi `size` bytes baru. `None` kalau allocator gagal.
    pub(crate) fn allocate(size: u32) -> Option<Storage> {
        debug_assert!(size > 0 && size.is_power_of_two());

        // SAFETY: size > 0, alignment 1 selalu valid
        let ptr = unsafe { alloc(Layout::from_size_align_unchecked(size as usize, 1)) };
        if ptr.is_null() {
            return None;
        }

        Some(Storage::Owned {
            ptr,
            alloc_size: size,
        })
    }

    /// Pointer mentah ke awal storage. Null kalau `Empty`.
    #[inline(always)]
    pub(crate) fn ptr(&self) -> *mut u8 {
        match self {
            Storage::Empty => std::ptr::null_mut(),
            Storage::Owned { ptr, .. } | Storage::Borrowed { ptr, .. } => *ptr,
        }
    }

    /// Apakah alokasi lama masih bisa dipakai ulang untuk `size` bytes?
    #[inline]
    pub(crate) fn can_reuse(&self, size: u32) -> bool {
        matches!(self, Storage::Owned { alloc_size, .. } if size <= *alloc_size)
    }

    #[inline]
    pub(crate) fn is_owned(&self) -> bool {
        matches!(self, Storage::Owned { .. })
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, Storage::Empty)
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        // Hanya varian Owned yang membebaskan memori
        if let Storage::Owned { ptr, alloc_size } = *self {
            // SAFETY: ptr berasal dari alloc dengan layout yang sama
            unsafe {
                dealloc(ptr, Layout::from_size_align_unchecked(alloc_size as usize, 1));
            }
        }
    }
}
