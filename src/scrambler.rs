/*! Additive scrambler: a Fibonacci LFSR used as a synchronous stream cipher.

Two specializations operate on the same bit sequence: byte mode XORs it into
hard bits, soft-symbol mode flips the sign of a log-likelihood ratio whenever
the LFSR bit is one. Both reset the LFSR to its seed at a configurable
boundary; for this crate that boundary is simply "the start of every PDU",
since packets already travel one-per-PDU through the framing chain.
*/
use crate::Result;
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{NCReadStream, NCWriteStream};

/// A Fibonacci LFSR bit generator.
///
/// `mask` selects which register bits are XORed together to produce the
/// feedback bit fed back in at the top of a `width`-bit shift register.
#[derive(Clone)]
pub struct Lfsr {
    reg: u32,
    seed: u32,
    mask: u32,
    width: u32,
}

impl Lfsr {
    /// Create a new LFSR. `width` is the shift-register length in bits.
    #[must_use]
    pub fn new(mask: u32, seed: u32, width: u32) -> Self {
        Self {
            reg: seed,
            seed,
            mask,
            width,
        }
    }

    /// The CCSDS 131.0-B-5 §10.4 scrambler: mask `0x4001`, seed `0x18E38`,
    /// 16-bit shift register.
    #[must_use]
    pub fn ccsds() -> Self {
        Self::new(0x4001, 0x1_8E38, 16)
    }

    /// Reset the register to its seed.
    pub fn reset(&mut self) {
        self.reg = self.seed;
    }

    /// Advance the register `n` bits without emitting them.
    pub fn advance(&mut self, n: u32) {
        for _ in 0..n {
            self.next_bit();
        }
    }

    /// Produce the next output bit (0 or 1) and advance the register.
    pub fn next_bit(&mut self) -> u8 {
        let out = (self.reg & 1) as u8;
        let fb = ((self.reg & self.mask).count_ones() & 1) as u32;
        self.reg = (self.reg >> 1) | (fb << (self.width - 1));
        out
    }
}

/// XOR `data` bit-by-bit (MSB-first within each byte) against a fresh
/// `Lfsr`, resetting it first. Self-inverse: applying it twice returns the
/// original data.
#[must_use]
pub fn scramble_bytes(lfsr: &mut Lfsr, data: &[u8]) -> Vec<u8> {
    lfsr.reset();
    data.iter()
        .map(|&byte| {
            let mut out = 0u8;
            for bit in (0..8).rev() {
                let b = (byte >> bit) & 1;
                out |= (b ^ lfsr.next_bit()) << bit;
            }
            out
        })
        .collect()
}

/// Flip the sign of each soft LLR whenever the scrambler bit is one.
#[must_use]
pub fn descramble_soft(lfsr: &mut Lfsr, llrs: &[f32]) -> Vec<f32> {
    descramble_soft_with_offset(lfsr, 0, llrs)
}

/// Like [`descramble_soft`], but starts `bit_offset` bits into the LFSR
/// sequence rather than at the seed. Lets two PDUs that are really one
/// continuous scrambled bit run — e.g. a header codeword and the payload
/// that follows it in the same transmitted frame — be descrambled as
/// separate PDUs while still seeing the LFSR state they'd have seen had
/// they been descrambled as one continuous run.
#[must_use]
pub fn descramble_soft_with_offset(lfsr: &mut Lfsr, bit_offset: u32, llrs: &[f32]) -> Vec<f32> {
    lfsr.reset();
    lfsr.advance(bit_offset);
    llrs.iter()
        .map(|&v| if lfsr.next_bit() == 1 { -v } else { v })
        .collect()
}

/// Additive scrambler block, operating on whole-byte PDUs. Resets the LFSR
/// at the start of every packet.
pub struct AdditiveScrambler {
    src: NCReadStream<Vec<u8>>,
    dst: NCWriteStream<Vec<u8>>,
    lfsr: Lfsr,
}

impl AdditiveScrambler {
    /// Create a new scrambler block using the CCSDS LFSR.
    #[must_use]
    pub fn new(src: NCReadStream<Vec<u8>>) -> (Self, NCReadStream<Vec<u8>>) {
        let (dst, dst_out) = NCWriteStream::new();
        (
            Self {
                src,
                dst,
                lfsr: Lfsr::ccsds(),
            },
            dst_out,
        )
    }
}

impl BlockName for AdditiveScrambler {
    fn block_name(&self) -> &str {
        "AdditiveScrambler"
    }
}

impl Block for AdditiveScrambler {
    fn work(&mut self) -> Result<BlockRet> {
        let Some((packet, tags)) = self.src.pop() else {
            return Ok(BlockRet::Noop);
        };
        let out = scramble_bytes(&mut self.lfsr, &packet);
        self.dst.push(out, tags);
        Ok(BlockRet::Ok)
    }
}

/// Soft-symbol descrambler block: flips LLR sign per scrambler bit.
///
/// Takes a `bit_offset`, the position in the LFSR sequence its input PDUs
/// start at. A descrambler sitting right after the frame's first bit uses
/// offset 0; one processing a PDU that continues a scrambled run started by
/// an earlier PDU (e.g. the payload following a header codeword that was
/// scrambled as part of the same continuous TX run) uses the bit length of
/// everything scrambled ahead of it, so its LFSR picks up where the
/// preceding PDU's would have left off.
pub struct SoftDescrambler {
    src: NCReadStream<Vec<f32>>,
    dst: NCWriteStream<Vec<f32>>,
    lfsr: Lfsr,
    bit_offset: u32,
}

impl SoftDescrambler {
    /// Create a new soft descrambler block using the CCSDS LFSR, starting
    /// at the seed (bit offset 0).
    #[must_use]
    pub fn new(src: NCReadStream<Vec<f32>>) -> (Self, NCReadStream<Vec<f32>>) {
        Self::with_bit_offset(src, 0)
    }

    /// Create a new soft descrambler block using the CCSDS LFSR, starting
    /// `bit_offset` bits into the sequence.
    #[must_use]
    pub fn with_bit_offset(src: NCReadStream<Vec<f32>>, bit_offset: u32) -> (Self, NCReadStream<Vec<f32>>) {
        let (dst, dst_out) = NCWriteStream::new();
        (
            Self {
                src,
                dst,
                lfsr: Lfsr::ccsds(),
                bit_offset,
            },
            dst_out,
        )
    }
}

impl BlockName for SoftDescrambler {
    fn block_name(&self) -> &str {
        "SoftDescrambler"
    }
}

impl Block for SoftDescrambler {
    fn work(&mut self) -> Result<BlockRet> {
        let Some((llrs, tags)) = self.src.pop() else {
            return Ok(BlockRet::Noop);
        };
        let out = descramble_soft_with_offset(&mut self.lfsr, self.bit_offset, &llrs);
        self.dst.push(out, tags);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scramble_is_self_inverse() {
        let mut lfsr = Lfsr::ccsds();
        let data: Vec<u8> = (0..40u16).map(|i| (i % 256) as u8).collect();
        let scrambled = scramble_bytes(&mut lfsr, &data);
        let mut lfsr2 = Lfsr::ccsds();
        let back = scramble_bytes(&mut lfsr2, &scrambled);
        assert_eq!(back, data);
    }

    #[test]
    fn reset_gives_same_sequence_every_time() {
        let mut lfsr = Lfsr::ccsds();
        let first: Vec<u8> = (0..16).map(|_| lfsr.next_bit()).collect();
        lfsr.reset();
        let second: Vec<u8> = (0..16).map(|_| lfsr.next_bit()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn descrambling_two_pdus_with_offset_matches_one_continuous_pdu() {
        // Bits 0..256 and 256..320 descrambled separately, with the second
        // PDU's descrambler offset by 256, must equal bits 0..320
        // descrambled as a single run.
        let header_bits = 256;
        let payload_bits = 64;
        let llrs: Vec<f32> = (0..header_bits + payload_bits)
            .map(|i| if i % 3 == 0 { 1.0 } else { -1.0 })
            .collect();

        let mut whole = Lfsr::ccsds();
        let want = descramble_soft(&mut whole, &llrs);

        let mut header_lfsr = Lfsr::ccsds();
        let got_header = descramble_soft_with_offset(&mut header_lfsr, 0, &llrs[..header_bits]);
        let mut payload_lfsr = Lfsr::ccsds();
        let got_payload =
            descramble_soft_with_offset(&mut payload_lfsr, header_bits as u32, &llrs[header_bits..]);

        assert_eq!(got_header, want[..header_bits]);
        assert_eq!(got_payload, want[header_bits..]);
    }
}
