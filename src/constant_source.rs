//! Generate the same value, forever.
use crate::block::{Block, BlockRet};
use crate::stream::WriteStream;
use crate::Result;

/// Generate the same value, forever.
#[derive(rustradio_macros::Block)]
#[rustradio(crate, new)]
pub struct ConstantSource<T: Copy> {
    #[rustradio(out)]
    dst: WriteStream<T>,
    val: T,
}

impl<T> Block for ConstantSource<T>
where
    T: Copy,
{
    fn work(&mut self) -> Result<BlockRet> {
        let mut o = self.dst.write_buf()?;
        let n = o.len();
        if n == 0 {
            return Ok(BlockRet::OutputFull);
        }
        o.slice().fill(self.val);
        o.produce(n, &[]);
        Ok(BlockRet::Ok)
    }
}
