//! Skip samples, then stream at full speed.
use crate::block::{Block, BlockRet};
use crate::stream::{ReadStream, WriteStream};
use crate::Result;

/// Discard the first `skip` samples, then pass the rest through unchanged.
#[derive(rustradio_macros::Block)]
#[rustradio(crate, new)]
pub struct Skip<T: Copy> {
    #[rustradio(in)]
    src: ReadStream<T>,
    #[rustradio(out)]
    dst: WriteStream<T>,
    skip: usize,
}

impl<T: Copy + std::fmt::Debug> Block for Skip<T> {
    fn work(&mut self) -> Result<BlockRet> {
        let (i, tags) = self.src.read_buf()?;
        if i.is_empty() {
            return Ok(BlockRet::Noop);
        }

        if self.skip == 0 {
            // Fast path, once skipping is done.
            let mut o = self.dst.write_buf()?;
            let len = std::cmp::min(i.len(), o.len());
            if len == 0 {
                return Ok(BlockRet::OutputFull);
            }
            o.slice()[..len].copy_from_slice(&i.slice()[..len]);
            o.produce(len, &tags);
            i.consume(len);
            return Ok(BlockRet::Ok);
        }

        let skip = std::cmp::min(self.skip, i.len());
        i.consume(skip);
        self.skip -= skip;
        Ok(BlockRet::Ok)
    }
}
