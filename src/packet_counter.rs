/*! Packet counter: a trivial pass-through tap that counts `packet_len` tags
seen and publishes `{ packet_count }` whenever polled. Grounded in the
external-interfaces note about "packet-count messages from counter blocks",
naming a block the framing chain alone doesn't otherwise model.
*/
use crate::Result;
use crate::Value;
use crate::block::{Block, BlockName, BlockRet};
use crate::message::Message;
use crate::stream::{NCReadStream, NCWriteStream};

const SERVICE: &str = "packet_counter";

/// Packet counter block, generic over the PDU element type.
pub struct PacketCounter<T> {
    src: NCReadStream<Vec<T>>,
    dst: NCWriteStream<Vec<T>>,
    msg: NCWriteStream<Message>,
    count: u64,
}

impl<T: Send + Sync + 'static> PacketCounter<T> {
    /// Create a new packet counter tap.
    #[must_use]
    pub fn new(src: NCReadStream<Vec<T>>) -> (Self, NCReadStream<Vec<T>>, NCReadStream<Message>) {
        let (dst, dst_out) = NCWriteStream::new();
        let (msg, msg_out) = NCWriteStream::new();
        (
            Self { src, dst, msg, count: 0 },
            dst_out,
            msg_out,
        )
    }
}

impl<T> BlockName for PacketCounter<T> {
    fn block_name(&self) -> &str {
        "PacketCounter"
    }
}

impl<T: Send + Sync + 'static> Block for PacketCounter<T> {
    fn work(&mut self) -> Result<BlockRet> {
        let Some((pdu, tags)) = self.src.pop() else {
            // Still report the running count when polled with nothing new.
            self.msg.push(
                Message::data(SERVICE, "out", "packet_count", Value::U64(self.count)),
                vec![],
            );
            return Ok(BlockRet::Noop);
        };
        self.count += 1;
        self.msg.push(
            Message::data(SERVICE, "out", "packet_count", Value::U64(self.count)),
            vec![],
        );
        self.dst.push(pdu, tags);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_each_pdu() -> Result<()> {
        let (src_in, src_out) = NCWriteStream::new();
        src_in.push(vec![1u8, 2], vec![]);
        let (mut b, pdu_out, msg_out) = PacketCounter::new(src_out);
        b.work()?;
        assert_eq!(pdu_out.pop().unwrap().0, vec![1, 2]);
        let (msg, _) = msg_out.pop().unwrap();
        assert_eq!(msg.get("packet_count"), Some(&Value::U64(1)));
        Ok(())
    }
}
