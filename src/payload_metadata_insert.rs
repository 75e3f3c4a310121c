/*! Payload metadata insert: on each `syncword_amplitude` tag, tags the
following syncword and header symbols with their constellation, then blocks
until the parsed header message arrives to learn the payload length —
discarding the rest of the packet if the header was invalid, or tagging and
passing through exactly the payload's symbol count otherwise.
*/
use crate::Complex;
use crate::Result;
use crate::Value;
use crate::block::{Block, BlockName, BlockRet};
use crate::message::Message;
use crate::stream::{NCReadStream, ReadStream, Tag, WriteStream};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    Idle,
    Syncword(usize),
    Header(usize),
    AwaitingHeaderMessage,
    Payload(usize),
}

/// Payload metadata insert block.
pub struct PayloadMetadataInsert {
    src: ReadStream<Complex>,
    parsed_header: NCReadStream<Message>,
    dst: WriteStream<Complex>,
    syncword_size: usize,
    header_size: usize,
    state: State,
}

impl PayloadMetadataInsert {
    /// Create a new payload metadata insert block.
    #[must_use]
    pub fn new(
        src: ReadStream<Complex>,
        parsed_header: NCReadStream<Message>,
        syncword_size: usize,
        header_size: usize,
    ) -> (Self, ReadStream<Complex>) {
        let (dst, dst_out) = WriteStream::new();
        (
            Self {
                src,
                parsed_header,
                dst,
                syncword_size,
                header_size,
                state: State::Idle,
            },
            dst_out,
        )
    }
}

impl BlockName for PayloadMetadataInsert {
    fn block_name(&self) -> &str {
        "PayloadMetadataInsert"
    }
}

impl Block for PayloadMetadataInsert {
    fn work(&mut self) -> Result<BlockRet> {
        let (input, tags) = self.src.read_buf()?;
        if input.is_empty() {
            return Ok(BlockRet::Noop);
        }
        let n = input.len();
        let mut starts = vec![false; n];
        for tag in &tags {
            if tag.pos() < n && tag.key() == "syncword_amplitude" {
                starts[tag.pos()] = true;
            }
        }

        let mut out = Vec::new();
        let mut out_tags = Vec::new();
        for i in 0..n {
            let sample = input.slice()[i];
            if starts[i] {
                self.state = State::Syncword(self.syncword_size);
                out_tags.push(Tag::new(out.len(), "constellation", Value::Str("BPSK".to_string())));
            }

            if let State::AwaitingHeaderMessage = self.state {
                match self.parsed_header.pop() {
                    Some((msg, _)) if msg.contains("invalid_header") => {
                        self.state = State::Idle;
                    }
                    Some((msg, _)) => {
                        let packet_length = match msg.get("packet_length") {
                            Some(Value::U64(n)) => *n,
                            _ => 0,
                        };
                        let payload_symbols = ((packet_length + 4) * 4) as usize;
                        out_tags.push(Tag::new(out.len(), "packet_length", Value::U64(packet_length)));
                        out_tags.push(Tag::new(
                            out.len(),
                            "constellation",
                            msg.get("constellation").cloned().unwrap_or(Value::Str("QPSK".to_string())),
                        ));
                        out_tags.push(Tag::new(
                            out.len(),
                            "payload_bits",
                            Value::U64((2 * payload_symbols) as u64),
                        ));
                        self.state = State::Payload(payload_symbols);
                    }
                    None => {}
                }
            }

            match &mut self.state {
                State::Syncword(remaining) => {
                    out.push(sample);
                    *remaining -= 1;
                    if *remaining == 0 {
                        self.state = State::Header(self.header_size);
                        out_tags.push(Tag::new(out.len(), "constellation", Value::Str("QPSK".to_string())));
                        out_tags.push(Tag::new(out.len(), "header_start", Value::Null));
                    }
                }
                State::Header(remaining) => {
                    out.push(sample);
                    *remaining -= 1;
                    if *remaining == 0 {
                        self.state = State::AwaitingHeaderMessage;
                    }
                }
                State::Payload(remaining) => {
                    out.push(sample);
                    *remaining -= 1;
                    if *remaining == 0 {
                        self.state = State::Idle;
                    }
                }
                State::AwaitingHeaderMessage | State::Idle => {}
            }
        }
        input.consume(n);

        if out.is_empty() {
            return Ok(BlockRet::Pending);
        }
        let mut w = self.dst.write_buf()?;
        w.fill_from_slice(&out);
        w.produce(out.len(), &out_tags);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{NCWriteStream, new_stream};

    #[test]
    fn passes_syncword_and_header_then_waits() -> Result<()> {
        let (src_in, src_out) = new_stream::<Complex>();
        let (_meta_in, meta_out) = NCWriteStream::<Message>::new();
        {
            let mut w = src_in.write_buf()?;
            let samples = vec![Complex::new(1.0, 0.0); 6];
            w.fill_from_slice(&samples);
            w.produce(6, &[Tag::new(0, "syncword_amplitude", Value::F64(1.0))]);
        }
        let (mut b, out) = PayloadMetadataInsert::new(src_out, meta_out, 2, 2);
        b.work()?;
        let (got, got_tags) = out.read_buf()?;
        // 2 syncword + 2 header symbols pass through; payload blocks without a message.
        assert_eq!(got.len(), 4);
        assert!(got_tags.iter().any(|t| t.key() == "header_start"));
        got.consume(4);
        Ok(())
    }
}
