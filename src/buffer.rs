use std::{
    fmt, io,
    ops::{Deref, DerefMut},
};

use parking_lot::Mutex;

/// Buffers larger than this are dropped instead of pooled.
pub const MAX_RETAINED_BUFFER: usize = 64 * 1024;
/// Field lists longer than this are dropped instead of pooled.
pub const MAX_RETAINED_FIELDS: usize = 1024;
/// Idle items kept by a pool; extra releases are dropped.
pub const DEFAULT_MAX_IDLE: usize = 256;

/// Growable byte buffer owned by one render at a time.
#[derive(Default)]
pub struct Buffer {
    bytes: Vec<u8>,
}

impl Buffer {
    /// Empty buffer with at least `capacity` bytes reserved.
    pub fn with_capacity(capacity: usize) -> Self {
        Buffer {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Allocated capacity.
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Written bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Reset length to zero, keeping capacity.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Make room for `additional` more bytes.
    ///
    /// Capacity doubles, but never grows by less than what was asked for.
    pub fn reserve(&mut self, additional: usize) {
        let free = self.bytes.capacity() - self.bytes.len();
        if additional <= free {
            return;
        }
        let need = self.bytes.len() + additional;
        let target = (self.bytes.capacity() * 2).max(need);
        self.bytes.reserve_exact(target - self.bytes.len());
    }

    /// Append one byte.
    pub fn push(&mut self, byte: u8) {
        self.reserve(1);
        self.bytes.push(byte);
    }

    /// Append a byte slice.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.bytes.extend_from_slice(bytes);
    }

    /// Append a string.
    pub fn push_str(&mut self, s: &str) {
        self.extend_from_slice(s.as_bytes());
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    /// Move out everything written after `start`.
    pub(crate) fn split_tail(&mut self, start: usize) -> Vec<u8> {
        self.bytes.split_off(start)
    }

    /// Bytes written after `start`.
    pub(crate) fn tail(&self, start: usize) -> &[u8] {
        &self.bytes[start..]
    }

    pub(crate) fn as_mut_vec(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }

    /// Copy the written bytes into an exact-size boxed slice.
    pub fn to_boxed_slice(&self) -> Box<[u8]> {
        self.bytes.as_slice().into()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.bytes.len())
            .field("capacity", &self.bytes.capacity())
            .finish()
    }
}

impl fmt::Write for Buffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

impl io::Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Items a [`Pool`] can hand out again after use.
pub trait Recycle {
    /// Capacity compared against the pool's retention ceiling.
    fn retained_capacity(&self) -> usize;

    /// Drop contents, keep allocation.
    fn recycle(&mut self);
}

impl Recycle for Buffer {
    fn retained_capacity(&self) -> usize {
        self.capacity()
    }

    fn recycle(&mut self) {
        self.clear();
    }
}

impl<T> Recycle for Vec<T> {
    fn retained_capacity(&self) -> usize {
        self.capacity()
    }

    fn recycle(&mut self) {
        self.clear();
    }
}

/// Bounded freelist.
///
/// The lock is held only to push or pop; callers never hold it while using
/// an item. Items above `max_capacity` and releases beyond `max_idle` are
/// dropped so worst-case retained memory stays bounded.
pub struct Pool<T> {
    free: Mutex<Vec<T>>,
    max_capacity: usize,
    max_idle: usize,
}

impl<T: Recycle> Pool<T> {
    /// Pool retaining at most `max_idle` items of capacity `<= max_capacity`.
    pub fn new(max_capacity: usize, max_idle: usize) -> Self {
        Pool {
            free: Mutex::new(Vec::new()),
            max_capacity,
            max_idle,
        }
    }

    /// Pop an idle item, already recycled.
    pub fn take(&self) -> Option<T> {
        self.free.lock().pop()
    }

    /// Return an item; it is dropped if oversized or the pool is full.
    pub fn give(&self, mut item: T) {
        if item.retained_capacity() > self.max_capacity {
            return;
        }
        item.recycle();
        let mut free = self.free.lock();
        if free.len() < self.max_idle {
            free.push(item);
        }
    }

    /// Number of idle items currently retained.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("max_capacity", &self.max_capacity)
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

/// Pool of render buffers.
#[derive(Debug)]
pub struct BufferPool {
    pool: Pool<Buffer>,
}

impl Default for BufferPool {
    fn default() -> Self {
        BufferPool::new(MAX_RETAINED_BUFFER, DEFAULT_MAX_IDLE)
    }
}

impl BufferPool {
    /// Pool with an explicit retention ceiling and idle limit.
    pub fn new(max_capacity: usize, max_idle: usize) -> Self {
        BufferPool {
            pool: Pool::new(max_capacity, max_idle),
        }
    }

    /// Check out an empty buffer with capacity `>= min_capacity`.
    ///
    /// The buffer goes back to the pool when the guard drops.
    pub fn acquire(&self, min_capacity: usize) -> PooledBuffer<'_> {
        let mut buf = self.pool.take().unwrap_or_default();
        buf.reserve(min_capacity);
        PooledBuffer { buf, pool: self }
    }

    /// Return a buffer explicitly.
    pub fn release(&self, buf: Buffer) {
        self.pool.give(buf);
    }

    /// Idle buffers currently retained.
    pub fn idle(&self) -> usize {
        self.pool.idle()
    }
}

/// Buffer checked out of a [`BufferPool`].
pub struct PooledBuffer<'p> {
    buf: Buffer,
    pool: &'p BufferPool,
}

impl Deref for PooledBuffer<'_> {
    type Target = Buffer;

    fn deref(&self) -> &Buffer {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Buffer {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_honours_min_capacity_and_resets_length() {
        let pool = BufferPool::default();
        {
            let mut buf = pool.acquire(128);
            assert!(buf.capacity() >= 128);
            buf.push_str("hello");
        }
        assert_eq!(pool.idle(), 1);
        let buf = pool.acquire(16);
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 128);
    }

    #[test]
    fn oversized_buffers_are_not_retained() {
        let pool = BufferPool::new(1024, 4);
        {
            let mut buf = pool.acquire(16);
            buf.extend_from_slice(&[0u8; 4096]);
        }
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn idle_count_is_bounded() {
        let pool = BufferPool::new(1024, 2);
        for _ in 0..5 {
            pool.release(Buffer::with_capacity(8));
        }
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn growth_doubles_with_floor_of_request() {
        let mut buf = Buffer::with_capacity(8);
        buf.extend_from_slice(&[1u8; 8]);
        buf.reserve(1);
        assert!(buf.capacity() >= 16);
        let before = buf.capacity();
        buf.reserve(before * 4);
        assert!(buf.capacity() >= buf.len() + before * 4);
    }

    #[test]
    fn concurrent_acquire_release() {
        let pool = std::sync::Arc::new(BufferPool::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        let mut buf = pool.acquire(64);
                        assert!(buf.is_empty());
                        buf.push(i as u8);
                        assert_eq!(buf.as_slice(), &[i as u8]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker thread");
        }
        assert!(pool.idle() <= 8);
    }

    #[test]
    fn field_lists_reuse_vec_pool() {
        let pool: Pool<Vec<u32>> = Pool::new(MAX_RETAINED_FIELDS, 4);
        let mut list = pool.take().unwrap_or_default();
        list.extend([1, 2, 3]);
        pool.give(list);
        let list = pool.take().expect("pooled list");
        assert!(list.is_empty());
        assert!(list.capacity() >= 3);
        pool.give(Vec::with_capacity(MAX_RETAINED_FIELDS + 1));
        assert_eq!(pool.idle(), 0);
    }
}
