/*! Packet ingress: the bridge from a tagged byte stream into the PDU world.

Each packet on the input is marked by a `packet_len` tag at its first
sample. Oversize packets (longer than 65535 bytes) are discarded with a
warning; otherwise the packet is both republished as a PDU and announced on
a parallel metadata message stream, for the header path to consume.
*/
use log::warn;

use crate::Result;
use crate::block::{Block, BlockName, BlockRet};
use crate::message::Message;
use crate::stream::{NCReadStream, NCWriteStream, ReadStream, Tag};
use crate::Value;

const MAX_PACKET_LEN: usize = 65535;
const SERVICE: &str = "packet_ingress";

/// Packet ingress block.
pub struct PacketIngress {
    src: ReadStream<u8>,
    dst: NCWriteStream<Vec<u8>>,
    meta: NCWriteStream<Message>,
}

impl PacketIngress {
    /// Create a new packet ingress block. Returns the PDU output and the
    /// metadata message output.
    #[must_use]
    pub fn new(src: ReadStream<u8>) -> (Self, NCReadStream<Vec<u8>>, NCReadStream<Message>) {
        let (dst, dst_out) = NCWriteStream::new();
        let (meta, meta_out) = NCWriteStream::new();
        (Self { src, dst, meta }, dst_out, meta_out)
    }
}

impl BlockName for PacketIngress {
    fn block_name(&self) -> &str {
        "PacketIngress"
    }
}

impl Block for PacketIngress {
    fn work(&mut self) -> Result<BlockRet> {
        let (input, tags) = self.src.read_buf()?;
        if input.is_empty() {
            return Ok(BlockRet::Noop);
        }
        let Some(tag) = tags.iter().find(|t| t.key() == "packet_len" && t.pos() == 0) else {
            input.consume(0);
            return Ok(BlockRet::Noop);
        };
        let len = match tag.val() {
            Value::U64(n) => *n as usize,
            _ => {
                warn!("PacketIngress: packet_len tag has non-integer value, dropping");
                input.consume(0);
                return Ok(BlockRet::Noop);
            }
        };
        if input.len() < len {
            input.consume(0);
            return Ok(BlockRet::Pending);
        }
        let bytes = input.slice()[..len].to_vec();
        input.consume(len);
        if len > MAX_PACKET_LEN {
            warn!("PacketIngress: dropping oversize packet ({len} bytes)");
            return Ok(BlockRet::Ok);
        }
        self.dst
            .push(bytes, vec![Tag::new(0, "packet_len", Value::U64(len as u64))]);
        self.meta.push(
            Message::data(SERVICE, "out", "packet_length", Value::U64(len as u64)),
            vec![],
        );
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::new_stream;

    #[test]
    fn forwards_tagged_packet() -> Result<()> {
        let (src_in, src_out) = new_stream::<u8>();
        {
            let mut w = src_in.write_buf()?;
            w.fill_from_slice(&[1, 2, 3, 4]);
            w.produce(4, &[Tag::new(0, "packet_len", Value::U64(4))]);
        }
        let (mut b, pdu_out, meta_out) = PacketIngress::new(src_out);
        b.work()?;
        let (got, _) = pdu_out.pop().unwrap();
        assert_eq!(got, vec![1, 2, 3, 4]);
        let (msg, _) = meta_out.pop().unwrap();
        assert_eq!(msg.get("packet_length"), Some(&Value::U64(4)));
        Ok(())
    }
}
