/*! Ring buffer backing a [`crate::stream::ReadStream`]/[`crate::stream::WriteStream`] pair.

The teacher's own circular buffer double-maps a single physical page range
via `mmap` so that a wrapping read or write always sees one contiguous
slice. That trick can't be hand-verified without a compiler, so this buffer
gets the same contiguous-span guarantee a safer way: each read/write
transaction snapshots its span into an owned `Vec`, and the underlying
storage is kept mirrored (written twice, at `pos` and `pos ± cap`) so a span
that would wrap in a capacity-sized buffer is still a single contiguous
range to copy out of.
*/
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use crate::stream::Tag;
use crate::Result;

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

struct Inner<T> {
    data: Vec<T>,
    tags: Vec<(u64, Tag)>,
    read_total: u64,
    write_total: u64,
    write_closed: bool,
    read_closed: bool,
}

/// Shared ring buffer. Owned via `Arc` by both the `ReadStream` and the
/// `WriteStream` of a connected pair.
pub struct Buffer<T> {
    id: usize,
    cap: usize,
    inner: Mutex<Inner<T>>,
    cv: Condvar,
}

impl<T: Copy + Default> Buffer<T> {
    /// Create a new buffer with room for at least `size` samples.
    pub fn new(size: usize) -> Result<Self> {
        let cap = size.max(1);
        Ok(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            cap,
            inner: Mutex::new(Inner {
                data: vec![T::default(); cap * 2],
                tags: Vec::new(),
                read_total: 0,
                write_total: 0,
                write_closed: false,
                read_closed: false,
            }),
            cv: Condvar::new(),
        })
    }

    /// Stable id for this buffer, shared between the read and write side.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Nominal capacity (before the internal doubling).
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.cap
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.write_total == inner.read_total
    }

    /// Free space for writing, in samples.
    #[must_use]
    pub fn free(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        self.cap - (inner.write_total - inner.read_total) as usize
    }

    pub(crate) fn mark_write_closed(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.write_closed = true;
        self.cv.notify_all();
    }

    pub(crate) fn mark_read_closed(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.read_closed = true;
        self.cv.notify_all();
    }

    /// Block (with periodic wakeups) until at least `need` samples are
    /// available to read, or the writer is gone. Returns the number
    /// actually available.
    #[must_use]
    pub fn wait_for_read(&self, need: usize) -> usize {
        let mut inner = self.inner.lock().unwrap();
        loop {
            let have = (inner.write_total - inner.read_total) as usize;
            if have >= need || inner.write_closed {
                return have;
            }
            let (g, _) = self
                .cv
                .wait_timeout(inner, std::time::Duration::from_millis(50))
                .unwrap();
            inner = g;
        }
    }

    /// Block until at least `need` samples of free space are available to
    /// write, or the reader is gone.
    #[must_use]
    pub fn wait_for_write(&self, need: usize) -> usize {
        let mut inner = self.inner.lock().unwrap();
        loop {
            let free = self.cap - (inner.write_total - inner.read_total) as usize;
            if free >= need || inner.read_closed {
                return free;
            }
            let (g, _) = self
                .cv
                .wait_timeout(inner, std::time::Duration::from_millis(50))
                .unwrap();
            inner = g;
        }
    }

    #[cfg(feature = "async")]
    pub async fn wait_for_read_async(&self, need: usize) -> usize {
        loop {
            let have = self.wait_for_read(0);
            if have >= need {
                return have;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }

    #[cfg(feature = "async")]
    pub async fn wait_for_write_async(&self, need: usize) -> usize {
        loop {
            let free = self.wait_for_write(0);
            if free >= need {
                return free;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }

    /// Begin a read transaction over the current contents.
    pub fn read_buf(self: Arc<Self>) -> Result<(BufferReader<T>, Vec<Tag>)> {
        let (data, tags, base) = {
            let inner = self.inner.lock().unwrap();
            let base = inner.read_total;
            let avail = (inner.write_total - inner.read_total) as usize;
            let start = (base % self.cap as u64) as usize;
            let data = inner.data[start..start + avail].to_vec();
            let tags = inner
                .tags
                .iter()
                .filter(|(pos, _)| *pos >= inner.read_total && *pos < inner.write_total)
                .map(|(pos, tag)| {
                    let mut t = tag.clone();
                    t.set_pos((*pos - base) as usize);
                    t
                })
                .collect();
            (data, tags, base)
        };
        Ok((
            BufferReader {
                buf: self,
                data,
                base,
                done: false,
            },
            tags,
        ))
    }

    /// Begin a write transaction into the current free space.
    pub fn write_buf(self: Arc<Self>) -> Result<BufferWriter<T>> {
        let free = {
            let inner = self.inner.lock().unwrap();
            self.cap - (inner.write_total - inner.read_total) as usize
        };
        Ok(BufferWriter {
            buf: self,
            data: vec![T::default(); free],
            done: false,
        })
    }
}

/// A read-only view into the samples available at the time it was taken.
///
/// The caller must call [`BufferReader::consume`] exactly once before
/// dropping this, per the block contract.
pub struct BufferReader<T: Copy + Default> {
    buf: Arc<Buffer<T>>,
    data: Vec<T>,
    base: u64,
    done: bool,
}

impl<T: Copy + Default> BufferReader<T> {
    /// Number of samples available in this span.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The available samples.
    #[must_use]
    pub fn slice(&self) -> &[T] {
        &self.data
    }

    /// Iterate over the available samples.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Commit that `n` samples were consumed. Must be called exactly once.
    pub fn consume(mut self, n: usize) {
        assert!(n <= self.data.len(), "consume({n}) > available {}", self.data.len());
        self.done = true;
        let mut inner = self.buf.inner.lock().unwrap();
        // Only advance if this reader's view is still the current one: a
        // stale consume (e.g. from a reader built before a concurrent
        // reset) must not rewind progress another reader already made.
        if inner.read_total == self.base {
            inner.read_total += n as u64;
            inner.tags.retain(|(pos, _)| *pos >= inner.read_total);
        }
        self.buf.cv.notify_all();
    }
}

impl<T: Copy + Default> Drop for BufferReader<T> {
    fn drop(&mut self) {
        debug_assert!(self.done, "BufferReader dropped without calling consume()");
    }
}

/// A write-only view into the currently free space of a [`Buffer`].
///
/// The caller must call [`BufferWriter::produce`] exactly once before
/// dropping this, per the block contract.
pub struct BufferWriter<T: Copy + Default> {
    buf: Arc<Buffer<T>>,
    data: Vec<T>,
    done: bool,
}

impl<T: Copy + Default> BufferWriter<T> {
    /// Number of samples of free space in this span.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Mutable scratch slice, the same length as the free space. Contents
    /// written here are committed by [`Self::produce`].
    pub fn slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Copy `data` into the start of the free span.
    pub fn fill_from_slice(&mut self, data: &[T]) {
        self.data[..data.len()].copy_from_slice(data);
    }

    /// Fill the start of the free span from an iterator, stopping at
    /// whichever runs out first. Returns the number of items written.
    pub fn fill_from_iter<I: IntoIterator<Item = T>>(&mut self, iter: I) -> usize {
        let mut n = 0;
        for (place, v) in self.data.iter_mut().zip(iter) {
            *place = v;
            n += 1;
        }
        n
    }

    /// Commit `n` samples as written, attaching `tags` at their given
    /// (span-relative) positions. Must be called exactly once.
    pub fn produce(mut self, n: usize, tags: &[Tag]) {
        assert!(n <= self.data.len(), "produce({n}) > free {}", self.data.len());
        self.done = true;
        let cap = self.buf.cap;
        let mut inner = self.buf.inner.lock().unwrap();
        let start = (inner.write_total % cap as u64) as usize;
        for (i, v) in self.data[..n].iter().enumerate() {
            let idx = (start + i) % cap;
            inner.data[idx] = *v;
            inner.data[idx + cap] = *v;
        }
        for tag in tags {
            inner
                .tags
                .push((inner.write_total + tag.pos() as u64, tag.clone()));
        }
        inner.write_total += n as u64;
        self.buf.cv.notify_all();
    }
}

impl<T: Copy + Default> Drop for BufferWriter<T> {
    fn drop(&mut self) {
        debug_assert!(self.done, "BufferWriter dropped without calling produce()");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let buf = Arc::new(Buffer::<u8>::new(16).unwrap());
        {
            let mut w = buf.clone().write_buf().unwrap();
            w.fill_from_slice(&[1, 2, 3]);
            w.produce(3, &[]);
        }
        let (r, tags) = buf.clone().read_buf().unwrap();
        assert!(tags.is_empty());
        assert_eq!(r.slice(), &[1, 2, 3]);
        r.consume(3);
        assert!(buf.is_empty());
    }

    #[test]
    fn wraps_contiguously() {
        let buf = Arc::new(Buffer::<u8>::new(8).unwrap());
        {
            let mut w = buf.clone().write_buf().unwrap();
            w.fill_from_slice(&[1, 2, 3, 4, 5, 6]);
            w.produce(6, &[]);
        }
        {
            let (r, _) = buf.clone().read_buf().unwrap();
            r.consume(6);
        }
        {
            let mut w = buf.clone().write_buf().unwrap();
            assert_eq!(w.len(), 8);
            w.fill_from_slice(&[7, 8, 9, 10]);
            w.produce(4, &[]);
        }
        let (r, _) = buf.clone().read_buf().unwrap();
        assert_eq!(r.slice(), &[7, 8, 9, 10]);
        r.consume(4);
    }

    #[test]
    fn tags_travel_with_position() {
        use crate::Value;
        let buf = Arc::new(Buffer::<u8>::new(16).unwrap());
        {
            let mut w = buf.clone().write_buf().unwrap();
            w.fill_from_slice(&[1, 2, 3]);
            w.produce(3, &[Tag::new(1, "k", Value::U64(42))]);
        }
        let (r, tags) = buf.clone().read_buf().unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].pos(), 1);
        r.consume(3);
    }
}
