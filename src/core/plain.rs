//! Marker trait untuk tipe yang aman disalin byte-per-byte
//!
//! Timestamp dan value yang masuk/keluar buffer disalin mentah sebagai
//! bytes (dengan wraparound split kalau perlu). Hanya tipe fixed-size
//! tanpa pointer/padding-sensitive state yang boleh diperlakukan begitu.

/// Tipe yang representasi memorinya valid untuk di-copy mentah dari/ke
/// storage buffer.
///
/// # Safety
///
/// Implementor harus menjamin bahwa SEMUA bit pattern sepanjang
/// `size_of::<Self>()` adalah value yang valid, dan bahwa copy
/// byte-per-byte menghasilkan value yang ekuivalen. Tipe dengan
/// invariant internal (referensi, `bool`, `char`, enum dengan niche)
/// tidak memenuhi syarat ini.
pub unsafe trait Plain: Copy {}

unsafe impl Plain for u8 {}
unsafe impl Plain for u16 {}
unsafe impl Plain for u32 {}
unsafe impl Plain for u64 {}
unsafe impl Plain for u128 {}
unsafe impl Plain for usize {}
unsafe impl Plain for i8 {}
unsafe impl Plain for i16 {}
unsafe impl Plain for i32 {}
unsafe impl Plain for i64 {}
unsafe impl Plain for i128 {}
unsafe impl Plain for isize {}
unsafe impl Plain for f32 {}
unsafe impl Plain for f64 {}

// Array dari Plain juga Plain: layout-nya elemen berurutan tanpa padding.
unsafe impl<T: Plain, const N: usize> Plain for [T; N] {}
