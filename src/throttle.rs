/*! Throttle: paces a stream to a target sample rate by sleeping until wall
clock catches up to the number of samples already produced, so downstream
real-time-clocked consumers (e.g. a sound card or SDR transmitter) don't get
fed faster than they can keep up with.
*/
use std::time::{Duration, Instant};

use crate::Result;
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{ReadStream, WriteStream};

/// Throttle block: gates a stream of `T` to `rate` items per second.
pub struct Throttle<T> {
    src: ReadStream<T>,
    dst: WriteStream<T>,
    rate: f64,
    max_items_per_chunk: usize,
    start: Option<Instant>,
    total_items: u64,
}

impl<T: Copy + Default> Throttle<T> {
    /// Create a new throttle block targeting `rate` items per second.
    /// `max_items_per_chunk` caps how many items are released per call, to
    /// keep the sleep interval (and so downstream latency) short.
    #[must_use]
    pub fn new(src: ReadStream<T>, rate: f64, max_items_per_chunk: usize) -> (Self, ReadStream<T>) {
        let (dst, dst_out) = WriteStream::new();
        (
            Self {
                src,
                dst,
                rate,
                max_items_per_chunk,
                start: None,
                total_items: 0,
            },
            dst_out,
        )
    }
}

impl<T> BlockName for Throttle<T> {
    fn block_name(&self) -> &str {
        "Throttle"
    }
}

impl<T: Copy + Default> Block for Throttle<T> {
    fn work(&mut self) -> Result<BlockRet> {
        let (input, tags) = self.src.read_buf()?;
        if input.is_empty() {
            return Ok(BlockRet::Noop);
        }
        let mut w = self.dst.write_buf()?;
        let chunk = input.len().min(w.len()).min(self.max_items_per_chunk.max(1));
        if chunk == 0 {
            input.consume(0);
            return Ok(BlockRet::OutputFull);
        }

        let now = Instant::now();
        let start = *self.start.get_or_insert(now);
        let target = start + Duration::from_secs_f64((self.total_items + chunk as u64) as f64 / self.rate);
        if now < target {
            std::thread::sleep(target - now);
        }

        w.slice()[..chunk].copy_from_slice(&input.slice()[..chunk]);
        let out_tags: Vec<_> = tags.into_iter().filter(|t| t.pos() < chunk).collect();
        w.produce(chunk, &out_tags);
        input.consume(chunk);
        self.total_items += chunk as u64;
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::new_stream;

    #[test]
    fn passes_items_through() -> Result<()> {
        let (src_in, src_out) = new_stream::<u8>();
        {
            let mut w = src_in.write_buf()?;
            w.fill_from_slice(&[1, 2, 3, 4]);
            w.produce(4, &[]);
        }
        let (mut b, out) = Throttle::new(src_out, 1_000_000.0, 1024);
        b.work()?;
        let (got, _) = out.read_buf()?;
        assert_eq!(got.slice(), &[1, 2, 3, 4]);
        let n = got.len();
        got.consume(n);
        Ok(())
    }
}
