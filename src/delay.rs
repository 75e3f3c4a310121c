//! Delay a stream by a fixed number of samples. Useful for syncing up streams.
use log::debug;

use crate::block::{Block, BlockEOF, BlockName, BlockRet};
use crate::stream::{ReadStream, WriteStream};
use crate::Result;

/// Delay a stream by a fixed number of samples, inserting `T::default()` at
/// the front. Can be re-delayed on the fly with [`Delay::set_delay`].
pub struct Delay<T> {
    delay: usize,
    current_delay: usize,
    skip: usize,
    src: ReadStream<T>,
    dst: WriteStream<T>,
}

impl<T: Copy + Default> Delay<T> {
    /// Create a new Delay block.
    #[must_use]
    pub fn new(src: ReadStream<T>, delay: usize) -> (Self, ReadStream<T>) {
        let (dst, dst_out) = WriteStream::new();
        (
            Self {
                delay,
                current_delay: delay,
                skip: 0,
                src,
                dst,
            },
            dst_out,
        )
    }

    /// Change the delay while running.
    ///
    /// Growing the delay inserts more zero samples; shrinking it discards
    /// that many samples from the stream instead.
    pub fn set_delay(&mut self, delay: usize) {
        if delay > self.delay {
            self.current_delay = delay - self.delay;
        } else {
            let cdskip = std::cmp::min(self.current_delay, self.delay - delay);
            self.current_delay -= cdskip;
            self.skip = (self.delay - delay) - cdskip;
        }
        self.delay = delay;
    }
}

impl<T> BlockName for Delay<T> {
    fn block_name(&self) -> &str {
        "Delay"
    }
}

impl<T> BlockEOF for Delay<T> {
    fn eof(&mut self) -> bool {
        self.current_delay == 0 && self.skip == 0 && self.src.eof()
    }
}

impl<T: Copy + Default> Block for Delay<T> {
    fn work(&mut self) -> Result<BlockRet> {
        let mut o = self.dst.write_buf()?;
        if o.is_empty() {
            return Ok(BlockRet::OutputFull);
        }
        if self.current_delay > 0 {
            let n = std::cmp::min(self.current_delay, o.len());
            for place in o.slice()[..n].iter_mut() {
                *place = T::default();
            }
            o.produce(n, &[]);
            self.current_delay -= n;
            return Ok(BlockRet::Ok);
        }

        let (i, tags) = self.src.read_buf()?;
        if self.skip > 0 {
            let n = std::cmp::min(self.skip, i.len());
            debug!("delay: skipping {n} samples");
            i.consume(n);
            self.skip -= n;
            return Ok(BlockRet::Ok);
        }
        if i.is_empty() {
            return Ok(BlockRet::Noop);
        }
        let n = std::cmp::min(i.len(), o.len());
        o.slice()[..n].copy_from_slice(&i.slice()[..n]);
        o.produce(n, &tags);
        i.consume(n);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::ReadStream as RS;
    use crate::Float;

    fn drain<T: Copy + Default>(b: &mut Delay<T>, out: &ReadStream<T>) -> Vec<T> {
        let mut v = Vec::new();
        loop {
            match b.work().unwrap() {
                BlockRet::Ok => {
                    let (r, _) = out.read_buf().unwrap();
                    v.extend(r.iter().copied());
                    let n = r.len();
                    r.consume(n);
                }
                _ => break,
            }
        }
        v
    }

    #[test]
    fn delay_zero() {
        let src: ReadStream<Float> = RS::from_slice(&[1.0, 2.0, 3.0]);
        let (mut b, out) = Delay::new(src, 0);
        assert_eq!(drain(&mut b, &out), vec![1.0f32, 2.0, 3.0]);
    }

    #[test]
    fn delay_one() {
        let src: ReadStream<Float> = RS::from_slice(&[1.0, 2.0, 3.0]);
        let (mut b, out) = Delay::new(src, 1);
        assert_eq!(drain(&mut b, &out), vec![0.0f32, 1.0, 2.0, 3.0]);
    }
}
