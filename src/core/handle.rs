//! Producer/Consumer handles untuk pemakaian lintas thread.
//!
//! [`RingBuffer::split`] meminjam buffer secara eksklusif dan mengembalikan
//! tepat satu [`Producer`] dan satu [`Consumer`]. Keduanya `Send` (jika
//! `T: Send`) dan setiap operasi mutasi butuh `&mut self`, jadi tidak ada
//! cara di safe code untuk punya dua producer atau dua consumer.

use super::error::Full;
use super::ring_buffer::RingBuffer;

/// Sisi producer: `push`, `emplace`, dan bulk insert.
pub struct Producer<'a, T, const N: usize> {
    ring: &'a RingBuffer<T, N>,
}

/// Sisi consumer: `pop`, `peek`, `pop_bulk`, dan `clear`.
pub struct Consumer<'a, T, const N: usize> {
    ring: &'a RingBuffer<T, N>,
}

impl<'a, T, const N: usize> Producer<'a, T, N> {
    pub(super) fn new(ring: &'a RingBuffer<T, N>) -> Self {
        Self { ring }
    }

    /// Push data ke buffer.
    ///
    /// Tidak blocking dan tidak retry: jika penuh, value dikembalikan lewat
    /// [`Full`].
    #[inline(always)]
    pub fn push(&mut self, value: T) -> Result<(), Full<T>> {
        // SAFETY: hanya ada satu Producer per split, dan `&mut self`.
        unsafe { self.ring.produce(value) }
    }

    /// Konstruksi elemen langsung di slot berikutnya jika ada tempat.
    #[inline(always)]
    pub fn emplace<F>(&mut self, f: F) -> bool
    where
        F: FnOnce() -> T,
    {
        // SAFETY: lihat `push`.
        unsafe { self.ring.produce_with(f) }
    }

    /// Konstruksi yang bisa gagal; error diteruskan tanpa mengubah buffer.
    #[inline(always)]
    pub fn try_emplace<E, F>(&mut self, f: F) -> Result<bool, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        // SAFETY: lihat `push`.
        unsafe { self.ring.try_produce_with(f) }
    }

    /// Clone item dari depan `items` sebanyak slot kosong yang tersedia.
    #[inline]
    pub fn push_bulk(&mut self, items: &[T]) -> usize
    where
        T: Clone,
    {
        // SAFETY: lihat `push`.
        unsafe { self.ring.produce_bulk(&mut items.iter().cloned()) }
    }

    #[inline]
    pub fn push_bulk_from<I>(&mut self, iter: &mut I) -> usize
    where
        I: Iterator<Item = T>,
    {
        // SAFETY: lihat `push`.
        unsafe { self.ring.produce_bulk(iter) }
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<'a, T, const N: usize> Consumer<'a, T, N> {
    pub(super) fn new(ring: &'a RingBuffer<T, N>) -> Self {
        Self { ring }
    }

    /// Pop elemen tertua ke `out`. Return `false` jika kosong.
    #[inline(always)]
    pub fn pop(&mut self, out: &mut T) -> bool {
        // SAFETY: hanya ada satu Consumer per split, dan `&mut self`.
        unsafe { self.ring.consume_into(out) }
    }

    /// Pop elemen tertua, `None` jika kosong.
    #[inline(always)]
    pub fn try_pop(&mut self) -> Option<T> {
        // SAFETY: lihat `pop`.
        unsafe { self.ring.consume() }
    }

    /// Clone elemen tertua ke `out` tanpa memajukan tail.
    #[inline]
    pub fn peek(&mut self, out: &mut T) -> bool
    where
        T: Clone,
    {
        self.peek_with(|value| out.clone_from(value)).is_some()
    }

    #[inline]
    pub fn peek_with<R, F>(&mut self, f: F) -> Option<R>
    where
        F: FnOnce(&T) -> R,
    {
        // SAFETY: lihat `pop`.
        unsafe { self.ring.inspect(f) }
    }

    /// Pop hingga `min(max_n, out.len())` elemen, tail maju sekali di akhir.
    #[inline]
    pub fn pop_bulk(&mut self, out: &mut [T], max_n: usize) -> usize {
        // SAFETY: lihat `pop`.
        unsafe { self.ring.consume_bulk(out, max_n) }
    }

    /// Buang semua elemen yang terlihat saat ini.
    #[inline]
    pub fn clear(&mut self) -> usize {
        // SAFETY: lihat `pop`.
        unsafe { self.ring.discard_all() }
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N
    }
}
