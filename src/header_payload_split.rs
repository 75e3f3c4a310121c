/*! Header/payload split: routes the first `header_size` symbols after a
syncword lock into one header PDU, then waits for a `payload_bits` tag
(emitted by [`crate::payload_metadata_insert`]) naming how many further
symbols belong to the payload, and collects those into one payload PDU. If
no `payload_bits` tag shows up within `header_size` symbols, the header
decode failed upstream and the splitter resets to the top of the stream,
discarding whatever header symbols it had collected.
*/
use crate::Complex;
use crate::Result;
use crate::Value;
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{NCWriteStream, ReadStream};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    Header(usize),
    AwaitingPayloadTag,
    Payload(usize),
    Idle,
}

/// Header/payload split block.
pub struct HeaderPayloadSplit {
    src: ReadStream<Complex>,
    header_dst: NCWriteStream<Vec<Complex>>,
    payload_dst: NCWriteStream<Vec<Complex>>,
    header_size: usize,
    state: State,
    header_buf: Vec<Complex>,
    payload_buf: Vec<Complex>,
}

impl HeaderPayloadSplit {
    /// Create a new header/payload split block. `header_size` is the number
    /// of header symbols per packet.
    #[must_use]
    pub fn new(
        src: ReadStream<Complex>,
        header_size: usize,
    ) -> (
        Self,
        crate::stream::NCReadStream<Vec<Complex>>,
        crate::stream::NCReadStream<Vec<Complex>>,
    ) {
        let (header_dst, header_out) = NCWriteStream::new();
        let (payload_dst, payload_out) = NCWriteStream::new();
        (
            Self {
                src,
                header_dst,
                payload_dst,
                header_size,
                state: State::Idle,
                header_buf: Vec::new(),
                payload_buf: Vec::new(),
            },
            header_out,
            payload_out,
        )
    }
}

impl BlockName for HeaderPayloadSplit {
    fn block_name(&self) -> &str {
        "HeaderPayloadSplit"
    }
}

impl Block for HeaderPayloadSplit {
    fn work(&mut self) -> Result<BlockRet> {
        let (input, tags) = self.src.read_buf()?;
        if input.is_empty() {
            return Ok(BlockRet::Noop);
        }
        let n = input.len();
        let mut payload_bits: Vec<Option<u64>> = vec![None; n];
        let mut header_starts = vec![false; n];
        for tag in &tags {
            if tag.pos() >= n {
                continue;
            }
            match tag.key() {
                "payload_bits" => {
                    if let Value::U64(bits) = tag.val() {
                        payload_bits[tag.pos()] = Some(*bits);
                    }
                }
                "header_start" => header_starts[tag.pos()] = true,
                _ => {}
            }
        }

        for i in 0..n {
            let sample = input.slice()[i];
            if header_starts[i] {
                self.state = State::Header(self.header_size);
                self.header_buf.clear();
            }
            if let State::AwaitingPayloadTag = self.state {
                match payload_bits[i] {
                    // payload_bits counts bits; two QPSK bits per symbol.
                    Some(bits) => {
                        self.state = State::Payload((bits / 2) as usize);
                        self.payload_buf.clear();
                    }
                    // Header decode failed: no payload_bits tag arrived.
                    None => self.state = State::Idle,
                }
            }
            match &mut self.state {
                State::Header(remaining) => {
                    self.header_buf.push(sample);
                    *remaining -= 1;
                    if *remaining == 0 {
                        let pdu = std::mem::take(&mut self.header_buf);
                        self.header_dst.push(pdu, vec![]);
                        self.state = State::AwaitingPayloadTag;
                    }
                }
                State::Payload(remaining) => {
                    self.payload_buf.push(sample);
                    *remaining -= 1;
                    if *remaining == 0 {
                        let pdu = std::mem::take(&mut self.payload_buf);
                        self.payload_dst.push(pdu, vec![]);
                        self.state = State::Idle;
                    }
                }
                State::AwaitingPayloadTag | State::Idle => {}
            }
        }
        input.consume(n);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{Tag, new_stream};

    #[test]
    fn routes_header_then_payload() -> Result<()> {
        let (src_in, src_out) = new_stream::<Complex>();
        {
            let mut w = src_in.write_buf()?;
            let samples = vec![Complex::new(1.0, 0.0); 10];
            w.fill_from_slice(&samples);
            w.produce(
                10,
                &[
                    Tag::new(0, "header_start", Value::Null),
                    Tag::new(4, "payload_bits", Value::U64(8)),
                ],
            );
        }
        let (mut b, header_out, payload_out) = HeaderPayloadSplit::new(src_out, 4);
        b.work()?;
        let (h, _) = header_out.pop().unwrap();
        assert_eq!(h.len(), 4);
        let (p, _) = payload_out.pop().unwrap();
        assert_eq!(p.len(), 4);
        Ok(())
    }
}
