//! Error untuk operasi push ke buffer yang penuh.

use std::fmt;

/// Buffer penuh saat push. Value yang ditolak dikembalikan ke caller.
///
/// Ini bukan kondisi fatal: caller cukup retry atau back off.
#[derive(Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("ring buffer is full")]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    /// Ambil kembali value yang gagal di-push.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Full(..)")
    }
}
