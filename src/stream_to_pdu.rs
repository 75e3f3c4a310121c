/*! Stream to PDU.

Turns a tagged stream into PDUs. A burst is marked in the stream by a tag
whose value is `1` where it starts and `0` where it ends.
*/
use std::collections::HashMap;

use log::{info, trace};

use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{NCWriteStream, ReadStream, Tag, TagPos};
use crate::{Result, Sample};

/// Stream to PDU block.
pub struct StreamToPdu<T> {
    src: ReadStream<T>,
    dst: NCWriteStream<Vec<T>>,
    tag: String,
    buf: Vec<T>,
    endcounter: Option<usize>,
    max_size: usize,
    tail: usize,
}

impl<T> StreamToPdu<T> {
    /// Create a new Stream-to-PDU block.
    #[must_use]
    pub fn new(
        src: ReadStream<T>,
        tag: String,
        max_size: usize,
        tail: usize,
    ) -> (Self, crate::stream::NCReadStream<Vec<T>>) {
        let (dst, dst_out) = NCWriteStream::new();
        (
            Self {
                src,
                tag,
                dst,
                buf: Vec::with_capacity(max_size),
                endcounter: None,
                max_size,
                tail,
            },
            dst_out,
        )
    }
}

fn get_tag_val_bool(tags: &HashMap<(TagPos, String), Tag>, pos: TagPos, key: &str) -> Option<bool> {
    tags.get(&(pos, key.to_string()))
        .and_then(|tag| tag.val().as_u64())
        .map(|v| v != 0)
}

impl<T> BlockName for StreamToPdu<T> {
    fn block_name(&self) -> &str {
        "StreamToPdu"
    }
}

impl<T> Block for StreamToPdu<T>
where
    T: Copy + Sample,
{
    fn work(&mut self) -> Result<BlockRet> {
        let (input, tags) = self.src.read_buf()?;
        if input.is_empty() {
            return Ok(BlockRet::Noop);
        }
        // TODO: we actually only care about one single tag, and should drop
        // the rest no matter what.
        let tags = tags
            .into_iter()
            .map(|t| ((t.pos(), t.key().to_string()), t))
            .collect::<HashMap<(TagPos, String), Tag>>();
        trace!("StreamToPdu: tags: {tags:?}");
        let n = input.len();
        for (i, sample) in input.iter().enumerate() {
            if let Some(0) = self.endcounter {
                let mut delme = Vec::with_capacity(self.max_size);
                std::mem::swap(&mut delme, &mut self.buf);
                info!(
                    "StreamToPdu> got burst of size {} samples, {} bytes",
                    delme.len(),
                    delme.len() * T::size()
                );
                self.dst.push(delme, vec![]);
                self.endcounter = None;
            }
            if let Some(c) = self.endcounter {
                self.buf.push(*sample);
                self.endcounter = Some(c - 1);
            } else if let Some(tv) = get_tag_val_bool(&tags, i as TagPos, &self.tag) {
                if !tv {
                    // End of burst.
                    self.endcounter = Some(self.tail);
                } else {
                    // Start of burst, save first sample.
                    self.buf.push(*sample);
                }
            } else if !self.buf.is_empty() {
                // Burst continuation.
                self.buf.push(*sample);
            }
            if self.buf.len() > self.max_size {
                // Too long. Discard buffer and stop saving.
                self.buf.clear();
                self.endcounter = None;
            }
        }
        input.consume(n);
        Ok(BlockRet::Ok)
    }
}
