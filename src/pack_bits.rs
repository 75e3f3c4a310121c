/*! Bit packing between one-value-per-byte representations of different bit
widths.

Every sample in this chain — whether a hard bit, a 2-bit dibit, or a soft
symbol index — travels as one `u8` per byte, value in the low bits. `PackBits`
groups `k` successive `b`-bit values into a single `k*b`-bit value (still one
per output byte). [`crate::unpack_bits::UnpackBits`] is the inverse. Both
operate on whole PDUs, so a packet boundary is always also a group boundary.
*/
use log::warn;

use crate::Result;
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{NCReadStream, NCWriteStream};
use crate::unpack_bits::{rescale_len_tags, Endianness};

/// Packs `k` successive `b`-bit values (one per input byte) into a single
/// `k*b`-bit output byte. `k*b` must not exceed 8.
pub struct PackBits {
    src: NCReadStream<Vec<u8>>,
    dst: NCWriteStream<Vec<u8>>,
    k: usize,
    b: usize,
    endianness: Endianness,
}

impl PackBits {
    /// Create a new pack block. Panics if `k * b` exceeds the 8-bit word
    /// width — that is a configuration error, not a runtime condition.
    #[must_use]
    pub fn new(
        src: NCReadStream<Vec<u8>>,
        k: usize,
        b: usize,
        endianness: Endianness,
    ) -> (Self, NCReadStream<Vec<u8>>) {
        assert!(k * b <= 8, "PackBits: k*b must fit in a byte");
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

impl BlockName for PackBits {
    fn block_name(&self) -> &str {
        "PackBits"
    }
}

impl Block for PackBits {
    fn work(&mut self) -> Result<BlockRet> {
        let Some((packet, tags)) = self.src.pop() else {
            return Ok(BlockRet::Noop);
        };
        if packet.len() % self.k != 0 {
            warn!(
                "PackBits: packet length {} is not a multiple of k={}, dropping",
                packet.len(),
                self.k
            );
            return Ok(BlockRet::Ok);
        }
        let out: Vec<u8> = packet
            .chunks(self.k)
            .map(|chunk| {
                let mut word = 0u8;
                for (i, &v) in chunk.iter().enumerate() {
                    let shift = match self.endianness {
                        Endianness::Msb => (self.k - 1 - i) * self.b,
                        Endianness::Lsb => i * self.b,
                    };
                    word |= (v & ((1 << self.b) - 1)) << shift;
                }
                word
            })
            .collect();
        let tags = rescale_len_tags(tags, 1, self.k as u64);
        self.dst.push(out, tags);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unpack_bits::UnpackBits;

    #[test]
    fn pack_msb_round_trips_with_unpack() -> Result<()> {
        let (src_in, src_out) = NCWriteStream::new();
        src_in.push(vec![1, 0, 1, 1, 0, 0, 1, 0], vec![]);
        let (mut packer, packed_out) = PackBits::new(src_out, 4, 1, Endianness::Msb);
        packer.work()?;
        let (packed, _) = packed_out.pop().unwrap();
        assert_eq!(packed, vec![0b1011, 0b0010]);

        let (src_in2, src_out2) = NCWriteStream::new();
        src_in2.push(packed, vec![]);
        let (mut unpacker, unpacked_out) = UnpackBits::new(src_out2, 4, 1, Endianness::Msb);
        unpacker.work()?;
        let (unpacked, _) = unpacked_out.pop().unwrap();
        assert_eq!(unpacked, vec![1, 0, 1, 1, 0, 0, 1, 0]);
        Ok(())
    }

    #[test]
    fn rejects_non_multiple_length() -> Result<()> {
        let (src_in, src_out) = NCWriteStream::new();
        src_in.push(vec![1, 0, 1], vec![]);
        let (mut packer, out) = PackBits::new(src_out, 4, 1, Endianness::Msb);
        packer.work()?;
        assert!(out.pop().is_none());
        Ok(())
    }
}
