/*! Bit unpacking: the inverse of [`crate::pack_bits::PackBits`].

Splits each `k*b`-bit input byte back into `k` successive `b`-bit values, one
per output byte. See [`crate::pack_bits`] for the shared packed-byte
convention.
*/
use crate::Result;
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{NCReadStream, NCWriteStream, Tag};

/// Which input maps to the high-order bits of the packed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// The first input of the group becomes the most-significant bits.
    Msb,
    /// The first input of the group becomes the least-significant bits.
    Lsb,
}

/// Rescale any `pkt_len`-valued tag by `num/den`, leaving other tags as-is.
/// Used whenever a block changes the number of samples representing a
/// packet without changing the packet itself.
pub(crate) fn rescale_len_tags(tags: Vec<Tag>, num: u64, den: u64) -> Vec<Tag> {
    use crate::Value;
    tags.into_iter()
        .map(|t| match t.val() {
            Value::U64(n) if t.key() == "packet_len" => {
                Tag::new(t.pos(), t.key().to_string(), Value::U64(n * num / den))
            }
            _ => t,
        })
        .collect()
}

/// Splits each `k*b`-bit input byte back into `k` successive `b`-bit values.
pub struct UnpackBits {
    src: NCReadStream<Vec<u8>>,
    dst: NCWriteStream<Vec<u8>>,
    k: usize,
    b: usize,
    endianness: Endianness,
}

impl UnpackBits {
    /// Create a new unpack block. Panics if `k * b` exceeds 8.
    #[must_use]
    pub fn new(
        src: NCReadStream<Vec<u8>>,
        k: usize,
        b: usize,
        endianness: Endianness,
    ) -> (Self, NCReadStream<Vec<u8>>) {
        assert!(k * b <= 8, "UnpackBits: k*b must fit in a byte");
        let (dst, dst_out) = NCWriteStream::new();
        (
            Self {
                src,
                dst,
                k,
                b,
                endianness,
            },
            dst_out,
        )
    }
}

impl BlockName for UnpackBits {
    fn block_name(&self) -> &str {
        "UnpackBits"
    }
}

impl Block for UnpackBits {
    fn work(&mut self) -> Result<BlockRet> {
        let Some((packet, tags)) = self.src.pop() else {
            return Ok(BlockRet::Noop);
        };
        let mask = (1u16 << self.b) - 1;
        let mut out = Vec::with_capacity(packet.len() * self.k);
        for word in packet {
            for i in 0..self.k {
                let shift = match self.endianness {
                    Endianness::Msb => (self.k - 1 - i) * self.b,
                    Endianness::Lsb => i * self.b,
                };
                out.push(((word as u16 >> shift) & mask) as u8);
            }
        }
        let tags = rescale_len_tags(tags, self.k as u64, 1);
        self.dst.push(out, tags);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_msb_splits_nibbles() -> Result<()> {
        let (src_in, src_out) = NCWriteStream::new();
        src_in.push(vec![0b1011_0010], vec![]);
        let (mut b, out) = UnpackBits::new(src_out, 2, 4, Endianness::Msb);
        b.work()?;
        let (got, _) = out.pop().unwrap();
        assert_eq!(got, vec![0b1011, 0b0010]);
        Ok(())
    }

    #[test]
    fn unpack_lsb_splits_nibbles() -> Result<()> {
        let (src_in, src_out) = NCWriteStream::new();
        src_in.push(vec![0b1011_0010], vec![]);
        let (mut b, out) = UnpackBits::new(src_out, 2, 4, Endianness::Lsb);
        b.work()?;
        let (got, _) = out.pop().unwrap();
        assert_eq!(got, vec![0b0010, 0b1011]);
        Ok(())
    }
}
