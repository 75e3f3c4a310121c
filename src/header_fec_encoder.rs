/*! Header FEC encoder: a systematic (128, 32) dense-generator LDPC code
followed by a rate-1/2 repetition, for an overall rate-1/8 code protecting
the 4-byte packet header.

The 96 parity rows are a fixed dense generator baked into the design — see
[`crate::header_fec_decoder`] for the independently-specified parity-check
matrix used to decode this same code.
*/
use crate::Result;
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{NCReadStream, NCWriteStream};

pub(crate) const GENERATOR: [u32; 96] = [
    0x8ef9c844, 0x74ac6ee2, 0x3cfef71b, 0xb26263a9, 0x2dd63058, 0x007b3a60, 0x31351305, 0xeaf6ef05,
    0x05c7c06c, 0x14d54cea, 0x8b9a3a38, 0x014c7864, 0x40f8d0fc, 0x61ef3bcd, 0xce500e2b, 0x9db2e7df,
    0x011d14d6, 0x83164c42, 0x766d4372, 0xead326fe, 0x919c7bc9, 0x5d7799a4, 0xedd6d997, 0xb5d68016,
    0x75109dd2, 0x87cf174e, 0xcc479aa7, 0x1db1a3a7, 0x8c927dfd, 0x5514181d, 0x3f2d26cf, 0x4cb213a9,
    0x4f8e715f, 0x1b975d94, 0xcaceb8d4, 0x9022fdb4, 0x83d920b3, 0x9502c926, 0x24b815e6, 0xc51d5fb1,
    0xf66c4372, 0x62e3b07b, 0x7d6382a2, 0x3fe2683e, 0x26f13876, 0x7c471f48, 0x1da5b8a1, 0x6bbc09df,
    0xd6b6424e, 0xfbad49e5, 0xa00af367, 0xf3d0b974, 0x7d424b58, 0xb98860cf, 0xbd51bb43, 0x908b1c3d,
    0x414e7864, 0xe1ef3fcd, 0x75aba5ea, 0x6c79959f, 0xf5109df2, 0x5a5f45d1, 0x84a8eb0d, 0xac33be50,
    0x97b4a45c, 0x476a3987, 0x81af4c18, 0x7f18b8c2, 0xd4a68d85, 0x784a836c, 0x3b409bd9, 0x4e836589,
    0x7e625eab, 0x6e7bc9f3, 0x3a9eac8d, 0xcddc8599, 0xa117efb1, 0x498f2a4c, 0xa9f43e3d, 0x680a064d,
    0x4e82093b, 0xf75157a4, 0x50947b04, 0xad5d2c65, 0xd6cd382e, 0xbcf4047c, 0x916e95d0, 0xb00485ef,
    0xa13e0f38, 0x7ff42423, 0x20141b06, 0xde1bf63e, 0xf3ab831c, 0x049eb6ef, 0xe02623e7, 0x3cbfcfb0,
];

/// Encode a 4-byte header into a 32-byte codeword.
#[must_use]
pub fn encode(header: &[u8; 4]) -> [u8; 32] {
    let info = u32::from_be_bytes(*header);
    let mut codeword = [0u8; 32];
    codeword[..4].copy_from_slice(header);
    for k in 0..12 {
        let mut parity_bits = 0u8;
        for l in 0..8 {
            let row = GENERATOR[8 * k + l];
            let parity = (info & row).count_ones() & 1;
            parity_bits = (parity_bits << 1) | parity as u8;
        }
        codeword[4 + k] = parity_bits;
    }
    let (systematic, repeat) = codeword.split_at_mut(16);
    repeat.copy_from_slice(&systematic[..16]);
    codeword
}

/// Header FEC encoder block: 4-byte header PDU in, 32-byte codeword PDU out.
pub struct HeaderFecEncoder {
    src: NCReadStream<Vec<u8>>,
    dst: NCWriteStream<Vec<u8>>,
}

impl HeaderFecEncoder {
    /// Create a new header FEC encoder block.
    #[must_use]
    pub fn new(src: NCReadStream<Vec<u8>>) -> (Self, NCReadStream<Vec<u8>>) {
        let (dst, dst_out) = NCWriteStream::new();
        (Self { src, dst }, dst_out)
    }
}

impl BlockName for HeaderFecEncoder {
    fn block_name(&self) -> &str {
        "HeaderFecEncoder"
    }
}

impl Block for HeaderFecEncoder {
    fn work(&mut self) -> Result<BlockRet> {
        let Some((header, tags)) = self.src.pop() else {
            return Ok(BlockRet::Noop);
        };
        let bytes: [u8; 4] = match header.as_slice().try_into() {
            Ok(b) => b,
            Err(_) => {
                log::warn!("HeaderFecEncoder: expected a 4-byte header, dropping");
                return Ok(BlockRet::Ok);
            }
        };
        self.dst.push(encode(&bytes).to_vec(), tags);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_systematic_and_repeated() {
        let header = [0x12, 0x34, 0x56, 0x78];
        let codeword = encode(&header);
        assert_eq!(&codeword[..4], &header);
        assert_eq!(&codeword[..16], &codeword[16..]);
    }
}
