/*! Packet mux: concatenate one PDU from each of *N* inputs, in order, into
a single output PDU.

Used twice in the transmit chain: once to concatenate a header codeword with
its payload, and again to prefix the syncword symbols onto the shaped
payload symbols. If any input has no PDU available, no output is produced —
this block never partially emits.
*/
use crate::Result;
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{NCReadStream, NCWriteStream};

/// Concatenates one PDU per input, per output PDU, preserving input order.
pub struct PacketMux<T> {
    srcs: Vec<NCReadStream<Vec<T>>>,
    dst: NCWriteStream<Vec<T>>,
}

impl<T: Clone + Send + Sync + 'static> PacketMux<T> {
    /// Create a new packet mux over `srcs`, in concatenation order.
    #[must_use]
    pub fn new(srcs: Vec<NCReadStream<Vec<T>>>) -> (Self, NCReadStream<Vec<T>>) {
        let (dst, dst_out) = NCWriteStream::new();
        (Self { srcs, dst }, dst_out)
    }
}

impl<T> BlockName for PacketMux<T> {
    fn block_name(&self) -> &str {
        "PacketMux"
    }
}

impl<T: Clone + Send + Sync + 'static> Block for PacketMux<T> {
    fn work(&mut self) -> Result<BlockRet> {
        if self.srcs.iter().any(NCReadStream::is_empty) {
            return Ok(BlockRet::Noop);
        }
        let mut out = Vec::new();
        let mut tags = Vec::new();
        for src in &self.srcs {
            let (data, t) = src.pop().expect("checked non-empty above");
            out.extend(data);
            tags.extend(t);
        }
        self.dst.push(out, tags);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_in_order() -> Result<()> {
        let (a_in, a_out) = NCWriteStream::new();
        let (b_in, b_out) = NCWriteStream::new();
        a_in.push(vec![1u8, 2], vec![]);
        b_in.push(vec![3u8, 4, 5], vec![]);
        let (mut mux, out) = PacketMux::new(vec![a_out, b_out]);
        mux.work()?;
        let (got, _) = out.pop().unwrap();
        assert_eq!(got, vec![1, 2, 3, 4, 5]);
        Ok(())
    }

    #[test]
    fn waits_for_all_inputs() -> Result<()> {
        let (a_in, a_out) = NCWriteStream::new();
        let (_b_in, b_out) = NCWriteStream::new();
        a_in.push(vec![1u8], vec![]);
        let (mut mux, out) = PacketMux::new(vec![a_out, b_out]);
        mux.work()?;
        assert!(out.pop().is_none());
        Ok(())
    }
}
