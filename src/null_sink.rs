//! Discard anything written to this block.
use crate::block::{Block, BlockRet};
use crate::stream::ReadStream;
use crate::Result;

/// Discard anything written to this block.
#[derive(rustradio_macros::Block)]
#[rustradio(crate, new)]
pub struct NullSink<T>
where
    T: Copy,
{
    #[rustradio(in)]
    src: ReadStream<T>,
}

impl<T> Block for NullSink<T>
where
    T: Copy,
{
    fn work(&mut self) -> Result<BlockRet> {
        let (i, _) = self.src.read_buf()?;
        let n = i.len();
        if n == 0 {
            return Ok(BlockRet::Noop);
        }
        // While we could discard in larger batches, making NullSink more
        // efficient, that risks needlessly blocking the previous block for lack
        // of output space.
        i.consume(n);
        Ok(BlockRet::Ok)
    }
}
