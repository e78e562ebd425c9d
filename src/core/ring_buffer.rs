//! Lock-Free Single-Producer Single-Consumer (SPSC) Ring Buffer
//!
//! Lamport queue dengan dua counter yang terus naik: `head` (posisi tulis,
//! milik producer) dan `tail` (posisi baca, milik consumer). Counter tidak
//! pernah di-wrap secara eksplisit; index slot fisik = `counter & mask`.
//!
//! Satu slot selalu dibiarkan kosong: `head == tail` berarti kosong dan
//! `head - tail == N - 1` berarti penuh. Buffer dengan `N` slot menampung
//! maksimal `N - 1` elemen.
//!
//! Tidak ada Mutex, tidak ada alokasi setelah inisialisasi.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::error::Full;
use super::handle::{Consumer, Producer};

/// Slot dalam ring buffer. Isinya hanya valid selama slot "live".
struct Slot<T> {
    data: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    const fn new() -> Self {
        Self {
            data: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

/// Padding untuk cache line isolation (64 bytes pada x86-64)
#[repr(C, align(64))]
struct CacheLinePadded<T> {
    value: T,
}

impl<T> CacheLinePadded<T> {
    const fn new(value: T) -> Self {
        Self { value }
    }
}

/// Mempublikasikan `start + done` ke counter saat di-drop.
///
/// Dipakai operasi bulk: counter hanya maju sekali di akhir, dan tetap
/// konsisten kalau `Clone`/`Drop`/iterator milik user panic di tengah jalan.
struct PublishOnDrop<'a> {
    counter: &'a AtomicUsize,
    start: usize,
    done: usize,
}

impl Drop for PublishOnDrop<'_> {
    fn drop(&mut self) {
        self.counter
            .store(self.start.wrapping_add(self.done), Ordering::Release);
    }
}

/// Lock-Free SPSC Ring Buffer dengan kapasitas `N` slot.
///
/// `N` harus power of 2 dan minimal 2; nilai lain ditolak saat compile.
///
/// Semua method publik mengambil `&mut self` sehingga aman dipakai dari satu
/// thread. Untuk dua thread, panggil [`RingBuffer::split`] dan kirim
/// [`Producer`] serta [`Consumer`] ke thread masing-masing.
///
/// `head` dan `tail` berada di cache line terpisah untuk menghindari false
/// sharing antara producer dan consumer.
#[repr(C)]
pub struct RingBuffer<T, const N: usize> {
    // Producer side
    head: CacheLinePadded<AtomicUsize>,
    // Consumer side
    tail: CacheLinePadded<AtomicUsize>,
    buffer: Box<[Slot<T>]>,
}

// SAFETY: akses `&self` ke slot hanya lewat method `unsafe` di bawah, yang
// hanya dipanggil oleh satu Producer dan satu Consumer (dijamin `split`) atau
// dari method `&mut self`. Elemen berpindah antar thread, jadi butuh `T: Send`.
unsafe impl<T: Send, const N: usize> Sync for RingBuffer<T, N> {}

impl<T, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> RingBuffer<T, N> {
    const VALID_CAPACITY: () = assert!(
        N >= 2 && N.is_power_of_two(),
        "ring buffer capacity must be a power of two and at least 2"
    );

    const MASK: usize = N.wrapping_sub(1);

    /// Membuat ring buffer baru.
    ///
    /// Alokasi hanya terjadi sekali di sini. Kapasitas yang bukan power of 2
    /// atau kurang dari 2 gagal di-compile.
    ///
    /// ```
    /// use spsc_ring::RingBuffer;
    ///
    /// let rb: RingBuffer<u8, 2> = RingBuffer::new();
    /// assert_eq!(rb.usable_capacity(), 1);
    /// ```
    ///
    /// Bukan power of 2:
    ///
    /// ```compile_fail
    /// use spsc_ring::RingBuffer;
    ///
    /// let _rb: RingBuffer<u8, 3> = RingBuffer::new();
    /// ```
    ///
    /// Kurang dari 2:
    ///
    /// ```compile_fail
    /// use spsc_ring::RingBuffer;
    ///
    /// let _rb: RingBuffer<u8, 1> = RingBuffer::new();
    /// ```
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_CAPACITY;

        let buffer: Box<[Slot<T>]> = (0..N).map(|_| Slot::new()).collect();

        log::debug!(
            "ring buffer allocated: {} slots x {} bytes",
            N,
            std::mem::size_of::<T>()
        );

        Self {
            head: CacheLinePadded::new(AtomicUsize::new(0)),
            tail: CacheLinePadded::new(AtomicUsize::new(0)),
            buffer,
        }
    }

    /// Memecah buffer menjadi handle producer dan consumer.
    ///
    /// Selama kedua handle hidup, buffer terpinjam eksklusif sehingga tidak
    /// mungkin ada producer atau consumer kedua.
    pub fn split(&mut self) -> (Producer<'_, T, N>, Consumer<'_, T, N>) {
        let ring: &Self = self;
        (Producer::new(ring), Consumer::new(ring))
    }

    /// Push data ke buffer. Mengembalikan value di dalam [`Full`] jika penuh.
    #[inline]
    pub fn push(&mut self, value: T) -> Result<(), Full<T>> {
        // SAFETY: `&mut self` menjamin tidak ada handle lain.
        unsafe { self.produce(value) }
    }

    /// Konstruksi elemen di slot berikutnya. `f` hanya dipanggil jika ada
    /// slot kosong.
    #[inline]
    pub fn emplace<F>(&mut self, f: F) -> bool
    where
        F: FnOnce() -> T,
    {
        // SAFETY: `&mut self` menjamin tidak ada handle lain.
        unsafe { self.produce_with(f) }
    }

    /// Seperti [`emplace`](Self::emplace) tapi konstruksi boleh gagal.
    ///
    /// Error dari `f` diteruskan ke caller dan `head` tidak berubah.
    #[inline]
    pub fn try_emplace<E, F>(&mut self, f: F) -> Result<bool, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        // SAFETY: `&mut self` menjamin tidak ada handle lain.
        unsafe { self.try_produce_with(f) }
    }

    /// Push sebanyak mungkin item dari depan `items`, return jumlah yang masuk.
    #[inline]
    pub fn push_bulk(&mut self, items: &[T]) -> usize
    where
        T: Clone,
    {
        // SAFETY: `&mut self` menjamin tidak ada handle lain.
        unsafe { self.produce_bulk(&mut items.iter().cloned()) }
    }

    /// Pindahkan item dari iterator sampai buffer penuh atau iterator habis.
    ///
    /// Iterator tidak pernah di-advance melebihi jumlah slot kosong.
    #[inline]
    pub fn push_bulk_from<I>(&mut self, iter: &mut I) -> usize
    where
        I: Iterator<Item = T>,
    {
        // SAFETY: `&mut self` menjamin tidak ada handle lain.
        unsafe { self.produce_bulk(iter) }
    }

    /// Pop elemen tertua ke `out`. Return `false` jika buffer kosong.
    #[inline]
    pub fn pop(&mut self, out: &mut T) -> bool {
        // SAFETY: `&mut self` menjamin tidak ada handle lain.
        unsafe { self.consume_into(out) }
    }

    /// Pop elemen tertua, `None` jika buffer kosong.
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        // SAFETY: `&mut self` menjamin tidak ada handle lain.
        unsafe { self.consume() }
    }

    /// Clone elemen tertua ke `out` tanpa menghapusnya.
    #[inline]
    pub fn peek(&mut self, out: &mut T) -> bool
    where
        T: Clone,
    {
        self.peek_with(|value| out.clone_from(value)).is_some()
    }

    /// Inspeksi elemen tertua by reference.
    #[inline]
    pub fn peek_with<R, F>(&mut self, f: F) -> Option<R>
    where
        F: FnOnce(&T) -> R,
    {
        // SAFETY: `&mut self` menjamin tidak ada handle lain.
        unsafe { self.inspect(f) }
    }

    /// Pop hingga `min(max_n, out.len())` elemen ke `out` (FIFO).
    #[inline]
    pub fn pop_bulk(&mut self, out: &mut [T], max_n: usize) -> usize {
        // SAFETY: `&mut self` menjamin tidak ada handle lain.
        unsafe { self.consume_bulk(out, max_n) }
    }

    /// Buang semua elemen, return jumlah yang dibuang.
    #[inline]
    pub fn clear(&mut self) -> usize {
        // SAFETY: `&mut self` menjamin tidak ada handle lain.
        unsafe { self.discard_all() }
    }

    /// Cek apakah buffer kosong (snapshot)
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cek apakah buffer penuh (snapshot)
    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.len() >= N - 1
    }

    /// Jumlah elemen dalam buffer (snapshot).
    ///
    /// `tail` dibaca sebelum `head` supaya selisihnya tidak pernah underflow
    /// saat thread lain sedang jalan.
    #[inline(always)]
    pub fn len(&self) -> usize {
        let tail = self.tail.value.load(Ordering::Acquire);
        let head = self.head.value.load(Ordering::Acquire);
        head.wrapping_sub(tail).min(N - 1)
    }

    /// Jumlah slot (`N`). Elemen yang bisa disimpan: `N - 1`.
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Jumlah elemen maksimal yang bisa disimpan sekaligus.
    #[inline(always)]
    pub const fn usable_capacity(&self) -> usize {
        N - 1
    }

    #[inline(always)]
    fn slot(&self, counter: usize) -> &Slot<T> {
        &self.buffer[counter & Self::MASK]
    }

    /// Pecah `count` slot mulai dari `counter` menjadi dua range kontigu:
    /// `idx..N` lalu `0..sisa`.
    #[inline(always)]
    fn segments(counter: usize, count: usize) -> (Range<usize>, Range<usize>) {
        let idx = counter & Self::MASK;
        let first = (N - idx).min(count);
        (idx..idx + first, 0..count - first)
    }

    /// Slot kosong dilihat dari producer.
    #[inline(always)]
    fn vacant(&self, head: usize) -> usize {
        let tail = self.tail.value.load(Ordering::Acquire);
        (N - 1) - head.wrapping_sub(tail)
    }

    // ---------------------------------------------------------------------
    // Producer side. Caller harus satu-satunya producer.
    // ---------------------------------------------------------------------

    #[inline(always)]
    pub(super) unsafe fn produce(&self, value: T) -> Result<(), Full<T>> {
        let head = self.head.value.load(Ordering::Relaxed);
        if self.vacant(head) == 0 {
            return Err(Full(value));
        }

        // SAFETY: slot di `head` tidak live, consumer tidak menyentuhnya.
        unsafe {
            (*self.slot(head).data.get()).write(value);
        }

        // Release: write di atas visible sebelum head di-update
        self.head
            .value
            .store(head.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    #[inline(always)]
    pub(super) unsafe fn produce_with<F>(&self, f: F) -> bool
    where
        F: FnOnce() -> T,
    {
        let head = self.head.value.load(Ordering::Relaxed);
        if self.vacant(head) == 0 {
            return false;
        }

        // Kalau `f` panic, head belum disentuh.
        let value = f();

        // SAFETY: lihat `produce`.
        unsafe {
            (*self.slot(head).data.get()).write(value);
        }
        self.head
            .value
            .store(head.wrapping_add(1), Ordering::Release);
        true
    }

    #[inline(always)]
    pub(super) unsafe fn try_produce_with<E, F>(&self, f: F) -> Result<bool, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let head = self.head.value.load(Ordering::Relaxed);
        if self.vacant(head) == 0 {
            return Ok(false);
        }

        let value = f()?;

        // SAFETY: lihat `produce`.
        unsafe {
            (*self.slot(head).data.get()).write(value);
        }
        self.head
            .value
            .store(head.wrapping_add(1), Ordering::Release);
        Ok(true)
    }

    pub(super) unsafe fn produce_bulk<I>(&self, iter: &mut I) -> usize
    where
        I: Iterator<Item = T>,
    {
        let head = self.head.value.load(Ordering::Relaxed);
        let vacant = self.vacant(head);
        if vacant == 0 {
            return 0;
        }

        let (first, second) = Self::segments(head, vacant);
        let slots = self.buffer[first].iter().chain(&self.buffer[second]);

        let mut publish = PublishOnDrop {
            counter: &self.head.value,
            start: head,
            done: 0,
        };
        // `slots` di depan: iterator user tidak di-advance setelah slot habis.
        for (slot, value) in slots.zip(iter) {
            // SAFETY: semua slot di [head, head + vacant) tidak live.
            unsafe {
                (*slot.data.get()).write(value);
            }
            publish.done += 1;
        }
        publish.done
    }

    // ---------------------------------------------------------------------
    // Consumer side. Caller harus satu-satunya consumer.
    // ---------------------------------------------------------------------

    #[inline(always)]
    pub(super) unsafe fn consume(&self) -> Option<T> {
        let tail = self.tail.value.load(Ordering::Relaxed);
        let head = self.head.value.load(Ordering::Acquire);

        if tail == head {
            return None;
        }

        // SAFETY: slot di `tail` live dan sudah dipublikasikan producer.
        let value = unsafe { (*self.slot(tail).data.get()).assume_init_read() };

        // Release: read di atas selesai sebelum slot dikembalikan ke producer
        self.tail
            .value
            .store(tail.wrapping_add(1), Ordering::Release);

        Some(value)
    }

    #[inline(always)]
    pub(super) unsafe fn consume_into(&self, out: &mut T) -> bool {
        // SAFETY: kontrak consumer diteruskan caller.
        match unsafe { self.consume() } {
            Some(value) => {
                *out = value;
                true
            }
            None => false,
        }
    }

    #[inline(always)]
    pub(super) unsafe fn inspect<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&T) -> R,
    {
        let tail = self.tail.value.load(Ordering::Relaxed);
        let head = self.head.value.load(Ordering::Acquire);

        if tail == head {
            return None;
        }

        // SAFETY: slot tetap live sampai consumer ini sendiri memajukan tail.
        let value = unsafe { (*self.slot(tail).data.get()).assume_init_ref() };
        Some(f(value))
    }

    pub(super) unsafe fn consume_bulk(&self, out: &mut [T], max_n: usize) -> usize {
        let tail = self.tail.value.load(Ordering::Relaxed);
        let head = self.head.value.load(Ordering::Acquire);

        let count = head.wrapping_sub(tail).min(max_n).min(out.len());
        if count == 0 {
            return 0;
        }

        let (first, second) = Self::segments(tail, count);
        let slots = self.buffer[first].iter().chain(&self.buffer[second]);

        let mut publish = PublishOnDrop {
            counter: &self.tail.value,
            start: tail,
            done: 0,
        };
        for (slot, dst) in slots.zip(out.iter_mut()) {
            // SAFETY: semua slot di [tail, tail + count) live.
            let value = unsafe { (*slot.data.get()).assume_init_read() };
            // Dihitung sebelum drop nilai lama di `dst`, yang bisa panic.
            publish.done += 1;
            *dst = value;
        }
        publish.done
    }

    pub(super) unsafe fn discard_all(&self) -> usize {
        let mut discarded = 0;
        // SAFETY: kontrak consumer diteruskan caller.
        while unsafe { self.consume() }.is_some() {
            discarded += 1;
        }
        discarded
    }
}

impl<T, const N: usize> Drop for RingBuffer<T, N> {
    fn drop(&mut self) {
        if !std::mem::needs_drop::<T>() {
            return;
        }
        let discarded = self.clear();
        if discarded > 0 {
            log::debug!("ring buffer dropped with {} pending elements", discarded);
        }
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    #[derive(Debug, Clone)]
    enum Op {
        Push(u64),
        Pop,
        PushBulk(Vec<u64>),
        PopBulk(usize),
        Peek,
        Clear,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => any::<u64>().prop_map(Op::Push),
            4 => Just(Op::Pop),
            1 => proptest::collection::vec(any::<u64>(), 0..12).prop_map(Op::PushBulk),
            1 => (0usize..12).prop_map(Op::PopBulk),
            1 => Just(Op::Peek),
            1 => Just(Op::Clear),
        ]
    }

    proptest! {
        /// Urutan operasi acak selalu sama dengan model VecDeque.
        #[test]
        fn matches_fifo_model(ops in proptest::collection::vec(op_strategy(), 0..400)) {
            let mut rb: RingBuffer<u64, 8> = RingBuffer::new();
            let mut model: VecDeque<u64> = VecDeque::new();

            for op in ops {
                match op {
                    Op::Push(v) => match rb.push(v) {
                        Ok(()) => model.push_back(v),
                        Err(full) => {
                            prop_assert_eq!(model.len(), 7);
                            prop_assert_eq!(full.into_inner(), v);
                        }
                    },
                    Op::Pop => prop_assert_eq!(rb.try_pop(), model.pop_front()),
                    Op::PushBulk(items) => {
                        let pushed = rb.push_bulk(&items);
                        prop_assert_eq!(pushed, items.len().min(7 - model.len()));
                        model.extend(&items[..pushed]);
                    }
                    Op::PopBulk(n) => {
                        let mut out = vec![0u64; n];
                        let popped = rb.pop_bulk(&mut out, n);
                        prop_assert_eq!(popped, n.min(model.len()));
                        let expected: Vec<u64> = model.drain(..popped).collect();
                        prop_assert_eq!(&out[..popped], &expected[..]);
                    }
                    Op::Peek => {
                        let mut out = 0;
                        let found = rb.peek(&mut out);
                        prop_assert_eq!(found, !model.is_empty());
                        if let Some(front) = model.front() {
                            prop_assert_eq!(out, *front);
                        }
                    }
                    Op::Clear => {
                        prop_assert_eq!(rb.clear(), model.len());
                        model.clear();
                    }
                }
                prop_assert_eq!(rb.len(), model.len());
                prop_assert_eq!(rb.is_full(), model.len() == 7);
                prop_assert_eq!(rb.is_empty(), model.is_empty());
            }
        }
    }
}
