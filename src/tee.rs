//! Tee a stream into two copies.
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{ReadStream, WriteStream};
use crate::Result;

/// Duplicate every sample (and its tags) onto two output streams.
pub struct Tee<T: Copy> {
    src: ReadStream<T>,
    dst1: WriteStream<T>,
    dst2: WriteStream<T>,
}

impl<T: Copy> Tee<T> {
    /// Create a new Tee block.
    #[must_use]
    pub fn new(src: ReadStream<T>) -> (Self, ReadStream<T>, ReadStream<T>) {
        let (dst1, dst1_out) = WriteStream::new();
        let (dst2, dst2_out) = WriteStream::new();
        (Self { src, dst1, dst2 }, dst1_out, dst2_out)
    }
}

impl<T: Copy> BlockName for Tee<T> {
    fn block_name(&self) -> &str {
        "Tee"
    }
}
impl<T: Copy> Block for Tee<T> {
    fn work(&mut self) -> Result<BlockRet> {
        let (i, tags) = self.src.read_buf()?;
        if i.is_empty() {
            return Ok(BlockRet::Noop);
        }
        let mut o1 = self.dst1.write_buf()?;
        let mut o2 = self.dst2.write_buf()?;
        let n = std::cmp::min(i.len(), std::cmp::min(o1.len(), o2.len()));
        if n == 0 {
            return Ok(BlockRet::OutputFull);
        }
        o1.fill_from_slice(&i.slice()[..n]);
        o2.fill_from_slice(&i.slice()[..n]);
        o1.produce(n, &tags);
        o2.produce(n, &tags);
        i.consume(n);
        Ok(BlockRet::Ok)
    }
}
