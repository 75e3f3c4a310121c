/*! Header parser: recovers the metadata message from a decoded 4-byte
header, the inverse of [`crate::header_formatter`].
*/
use crate::block::{Block, BlockName, BlockRet};
use crate::header_formatter::PACKET_TYPE_USER_DATA;
use crate::message::Message;
use crate::stream::{NCReadStream, NCWriteStream};
use crate::{Result, Value};

const SERVICE: &str = "header_parser";

fn invalid_header_message() -> Message {
    Message::data(SERVICE, "out", "invalid_header", Value::Null)
}

/// Parse a 4-byte header, returning the metadata message. `decoder_failed`
/// mirrors the `invalid_header` tag the FEC decoder attaches on failure.
#[must_use]
pub fn parse_header(header: &[u8; 4], decoder_failed: bool) -> Message {
    if decoder_failed {
        return invalid_header_message();
    }
    let packet_length = u16::from_be_bytes([header[0], header[1]]);
    let packet_type = header[2];
    if packet_length == 0 || packet_type != PACKET_TYPE_USER_DATA {
        return invalid_header_message();
    }
    let mut data = std::collections::BTreeMap::new();
    data.insert("packet_length".to_string(), Value::U64(packet_length as u64));
    data.insert("constellation".to_string(), Value::Str("QPSK".to_string()));
    data.insert("packet_type".to_string(), Value::Str("USER_DATA".to_string()));
    Message::with_map(SERVICE, "out", data)
}

/// Header parser block: 4-byte header PDU in, one metadata [`Message`] out.
pub struct HeaderParser {
    src: NCReadStream<Vec<u8>>,
    dst: NCWriteStream<Message>,
}

impl HeaderParser {
    /// Create a new header parser block.
    #[must_use]
    pub fn new(src: NCReadStream<Vec<u8>>) -> (Self, NCReadStream<Message>) {
        let (dst, dst_out) = NCWriteStream::new();
        (Self { src, dst }, dst_out)
    }
}

impl BlockName for HeaderParser {
    fn block_name(&self) -> &str {
        "HeaderParser"
    }
}

impl Block for HeaderParser {
    fn work(&mut self) -> Result<BlockRet> {
        let Some((header, tags)) = self.src.pop() else {
            return Ok(BlockRet::Noop);
        };
        let decoder_failed = tags.iter().any(|t| t.key() == "invalid_header");
        if header.len() != 4 {
            self.dst.push(invalid_header_message(), vec![]);
            return Ok(BlockRet::Ok);
        }
        let bytes: [u8; 4] = header.try_into().unwrap();
        self.dst.push(parse_header(&bytes, decoder_failed), vec![]);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_header() {
        let msg = parse_header(&[0x05, 0xDC, 0x00, 0x55], false);
        assert_eq!(msg.get("packet_length"), Some(&Value::U64(1500)));
        assert!(!msg.contains("invalid_header"));
    }

    #[test]
    fn flags_zero_length_as_invalid() {
        let msg = parse_header(&[0x00, 0x00, 0x00, 0x55], false);
        assert!(msg.contains("invalid_header"));
    }

    #[test]
    fn flags_unknown_type_as_invalid() {
        let msg = parse_header(&[0x00, 0x10, 0x7F, 0x55], false);
        assert!(msg.contains("invalid_header"));
    }

    #[test]
    fn propagates_decoder_failure() {
        let msg = parse_header(&[0x00, 0x10, 0x00, 0x55], true);
        assert!(msg.contains("invalid_header"));
    }
}
