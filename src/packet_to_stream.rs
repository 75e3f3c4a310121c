/*! Packet to stream: a gate between a tagged, bursty sample stream (each
packet marked by a leading `packet_len` tag) and a continuous downstream
consumer. While idle between packets it fills the output with zeros rather
than stalling, so real-time-clocked blocks downstream never starve; it never
zero-fills in the middle of a packet.
*/
use log::warn;

use crate::Result;
use crate::Value;
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{ReadStream, WriteStream};

/// Packet-to-stream gate block, generic over the sample type.
pub struct PacketToStream<T> {
    src: ReadStream<T>,
    dst: WriteStream<T>,
    remaining: usize,
}

impl<T: Copy + Default> PacketToStream<T> {
    /// Create a new packet-to-stream gate.
    #[must_use]
    pub fn new(src: ReadStream<T>) -> (Self, ReadStream<T>) {
        let (dst, dst_out) = WriteStream::new();
        (Self { src, dst, remaining: 0 }, dst_out)
    }
}

impl<T> BlockName for PacketToStream<T> {
    fn block_name(&self) -> &str {
        "PacketToStream"
    }
}

impl<T: Copy + Default> Block for PacketToStream<T> {
    fn work(&mut self) -> Result<BlockRet> {
        let mut w = self.dst.write_buf()?;
        let out_len = w.len();
        if out_len == 0 {
            return Ok(BlockRet::OutputFull);
        }

        let (input, tags) = self.src.read_buf()?;
        if input.is_empty() {
            if self.remaining == 0 {
                let zeros = vec![T::default(); out_len];
                w.fill_from_slice(&zeros);
                w.produce(out_len, &[]);
                return Ok(BlockRet::Ok);
            }
            return Ok(BlockRet::Pending);
        }

        if self.remaining == 0 {
            let Some(tag) = tags.iter().find(|t| t.key() == "packet_len" && t.pos() == 0) else {
                warn!("PacketToStream: input available but no packet_len tag at its head");
                input.consume(0);
                return Ok(BlockRet::Noop);
            };
            self.remaining = match tag.val() {
                Value::U64(n) => *n as usize,
                _ => {
                    warn!("PacketToStream: packet_len tag has non-integer value, dropping input");
                    input.consume(input.len());
                    return Ok(BlockRet::Noop);
                }
            };
        }

        let n = self.remaining.min(input.len()).min(out_len);
        w.slice()[..n].copy_from_slice(&input.slice()[..n]);
        w.produce(n, &[]);
        input.consume(n);
        self.remaining -= n;
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{Tag, new_stream};

    #[test]
    fn fills_zero_when_idle() -> Result<()> {
        let (_src_in, src_out) = new_stream::<u8>();
        let (mut b, out) = PacketToStream::new(src_out);
        b.work()?;
        let (got, _) = out.read_buf()?;
        assert!(got.iter().all(|&b| b == 0));
        let n = got.len();
        got.consume(n);
        Ok(())
    }

    #[test]
    fn gates_by_packet_len_tag() -> Result<()> {
        let (src_in, src_out) = new_stream::<u8>();
        {
            let mut w = src_in.write_buf()?;
            w.fill_from_slice(&[1, 2, 3]);
            w.produce(3, &[Tag::new(0, "packet_len", Value::U64(3))]);
        }
        let (mut b, out) = PacketToStream::new(src_out);
        b.work()?;
        let (got, _) = out.read_buf()?;
        assert_eq!(&got.slice()[..3], &[1, 2, 3]);
        let n = got.len();
        got.consume(n);
        Ok(())
    }
}
