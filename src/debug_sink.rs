//! Print values to stdout, for debugging.
use crate::block::{Block, BlockRet};
use crate::stream::ReadStream;
use crate::Result;

/// Print values to stdout, for debugging.
#[derive(rustradio_macros::Block)]
#[rustradio(crate, new)]
pub struct DebugSink<T>
where
    T: Copy + std::fmt::Debug,
{
    #[rustradio(in)]
    src: ReadStream<T>,
}

impl<T> Block for DebugSink<T>
where
    T: Copy + std::fmt::Debug,
{
    fn work(&mut self) -> Result<BlockRet> {
        let (i, _) = self.src.read_buf()?;
        let n = i.len();
        if n == 0 {
            return Ok(BlockRet::Noop);
        }
        for s in i.iter() {
            println!("debug: {s:?}");
        }
        i.consume(n);
        Ok(BlockRet::Ok)
    }
}
