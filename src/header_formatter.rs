/*! Header formatter: builds the 4-byte packet header from per-packet
ingress metadata.

Byte layout: offset 0..1 payload length (big-endian `u16`), offset 2
packet-type code, offset 3 spare byte. See [`crate::header_parser`] for the
inverse.
*/
use crate::message::Message;
use crate::stream::{NCReadStream, NCWriteStream, Tag};
use crate::{Error, Result, Value};
use crate::block::{Block, BlockName, BlockRet};

/// Packet-type code for ordinary user data.
pub const PACKET_TYPE_USER_DATA: u8 = 0x00;
/// Fixed spare byte value.
pub const SPARE_BYTE: u8 = 0x55;

/// Build the 4-byte header for a payload of `packet_length` bytes.
pub fn format_header(packet_length: u16, packet_type: u8) -> [u8; 4] {
    let len = packet_length.to_be_bytes();
    [len[0], len[1], packet_type, SPARE_BYTE]
}

/// Header formatter block: one metadata [`Message`] in, one 4-byte header
/// PDU out, tagged with `packet_len = 4`.
pub struct HeaderFormatter {
    src: NCReadStream<Message>,
    dst: NCWriteStream<Vec<u8>>,
}

impl HeaderFormatter {
    /// Create a new header formatter block.
    #[must_use]
    pub fn new(src: NCReadStream<Message>) -> (Self, NCReadStream<Vec<u8>>) {
        let (dst, dst_out) = NCWriteStream::new();
        (Self { src, dst }, dst_out)
    }
}

impl BlockName for HeaderFormatter {
    fn block_name(&self) -> &str {
        "HeaderFormatter"
    }
}

impl Block for HeaderFormatter {
    fn work(&mut self) -> Result<BlockRet> {
        let Some((msg, tags)) = self.src.pop() else {
            return Ok(BlockRet::Noop);
        };
        let packet_length = match msg.get("packet_length") {
            Some(Value::U64(n)) => *n,
            Some(_) | None => {
                return Err(Error::Configuration(
                    "HeaderFormatter: missing packet_length".into(),
                ));
            }
        };
        if packet_length > 65535 {
            return Err(Error::Configuration(format!(
                "HeaderFormatter: packet_length {packet_length} exceeds 65535"
            )));
        }
        let header = format_header(packet_length as u16, PACKET_TYPE_USER_DATA);
        let mut tags = tags;
        tags.push(Tag::new(0, "packet_len", Value::U64(4)));
        self.dst.push(header.to_vec(), tags);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_header_bytes() {
        let h = format_header(1500, PACKET_TYPE_USER_DATA);
        assert_eq!(h, [0x05, 0xDC, 0x00, 0x55]);
    }

    #[test]
    fn errors_on_oversize_length() -> Result<()> {
        let (src_in, src_out) = NCWriteStream::new();
        src_in.push(
            Message::data("header_formatter", "in", "packet_length", Value::U64(70000)),
            vec![],
        );
        let (mut b, _out) = HeaderFormatter::new(src_out);
        assert!(b.work().is_err());
        Ok(())
    }
}
