/*! Header FEC decoder: min-sum LDPC decoding of the code encoded by
[`crate::header_fec_encoder`].

The decoder's parity-check matrix is specified independently from the
encoder's generator table (the two are not required to be dual to each
other in this design): it is the 96-row, 128-column sparse description below,
ported from the original `alist` table as a plain list of variable indices
per check node.
*/
use crate::Result;
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{NCReadStream, NCWriteStream, Tag};

const HEADER_LLRS: usize = 256;
const LDPC_N: usize = 128;
const MAX_ITERATIONS: usize = 25;

#[rustfmt::skip]
pub(crate) const CHECKS: [&[u16]; 96] = [
    &[4, 63, 71, 98], &[30, 40, 72, 124], &[17, 56, 64, 106], &[9, 35, 81, 109],
    &[2, 55, 81, 105], &[2, 59, 78, 122], &[31, 63, 89, 115], &[29, 36, 84, 114],
    &[11, 48, 64, 103], &[19, 42, 79, 126], &[27, 54, 91, 98], &[7, 36, 79, 97],
    &[29, 45, 95, 107], &[6, 37, 74, 99], &[16, 60, 88, 107], &[9, 43, 64, 112],
    &[10, 48, 72, 113], &[11, 32, 84, 124], &[13, 58, 77, 119], &[11, 59, 90, 111],
    &[0, 21, 45, 89], &[24, 44, 89, 108], &[16, 55, 66, 99], &[8, 38, 87, 120],
    &[1, 14, 43, 88], &[1, 38, 90, 125], &[20, 46, 92, 102], &[21, 51, 94, 105],
    &[14, 44, 75, 99], &[28, 35, 91, 123], &[28, 59, 76, 102], &[27, 46, 66, 125],
    &[15, 62, 88, 104], &[24, 57, 86, 106], &[3, 47, 83, 104], &[25, 40, 79, 105],
    &[18, 57, 76, 120], &[25, 34, 86, 98], &[17, 37, 80, 116], &[22, 62, 68, 117],
    &[6, 54, 67, 121], &[14, 39, 78, 113], &[26, 42, 83, 101], &[47, 90, 100, 127],
    &[15, 35, 65, 110], &[30, 63, 70, 111], &[3, 61, 92, 119], &[58, 73, 112, 126],
    &[18, 49, 75, 117], &[53, 74, 122], &[25, 41, 85, 115], &[2, 34, 82, 117],
    &[30, 60, 93, 116], &[56, 96, 123, 127], &[10, 54, 80, 102], &[3, 36, 87, 115],
    &[8, 46, 73, 95], &[4, 47, 73, 113], &[13, 51, 74, 96], &[28, 37, 83, 124],
    &[23, 38, 67, 108], &[12, 50, 76, 114], &[10, 53, 87, 107], &[13, 42, 71, 103],
    &[1, 33, 94, 119], &[0, 26, 56, 92], &[19, 33, 82, 100], &[29, 44, 77, 127],
    &[7, 58, 91, 120], &[4, 52, 85, 122], &[22, 41, 66, 123], &[5, 45, 78, 101],
    &[20, 48, 82, 108], &[7, 51, 68, 111], &[12, 41, 93, 112], &[16, 49, 85, 106],
    &[5, 32, 65, 118], &[17, 31, 40, 95, 110], &[19, 43, 67, 118], &[5, 62, 77, 97],
    &[21, 52, 69, 125], &[9, 52, 80, 97], &[6, 57, 81, 104], &[8, 33, 70, 114],
    &[12, 34, 69, 110], &[0, 15, 50, 72], &[23, 53, 86, 126], &[27, 32, 93, 100],
    &[22, 39, 69, 121], &[20, 60, 71, 109], &[18, 61, 65, 103], &[24, 61, 68, 116],
    &[23, 50, 75, 109], &[31, 39, 84, 96], &[49, 94, 101, 121], &[26, 55, 70, 118],
];

/// Result of decoding one header codeword.
pub struct Decoded {
    /// The 4 decoded header bytes.
    pub bytes: [u8; 4],
    /// Whether every parity check was satisfied within the iteration budget.
    pub ok: bool,
}

fn pack_bits_msb(bits: &[u8]) -> [u8; 4] {
    let mut out = [0u8; 4];
    for (k, byte) in out.iter_mut().enumerate() {
        let mut b = 0u8;
        for n in 0..8 {
            b = (b << 1) | bits[8 * k + n];
        }
        *byte = b;
    }
    out
}

/// Decode 256 header LLRs (positive = bit 0 more likely) into 4 bytes.
///
/// Combines the two repetition arms by summing, runs up to
/// [`MAX_ITERATIONS`] rounds of min-sum belief propagation, and on failure
/// falls back to hard-slicing the (uncorrected) systematic LLRs.
#[must_use]
pub fn decode(llrs: &[f32; HEADER_LLRS]) -> Decoded {
    let mut llr = [0f32; LDPC_N];
    for i in 0..LDPC_N {
        llr[i] = llrs[i] + llrs[LDPC_N + i];
    }

    let mut v2c: Vec<Vec<f32>> = CHECKS
        .iter()
        .map(|vars| vars.iter().map(|&v| llr[v as usize]).collect())
        .collect();
    let mut total = llr;
    let mut ok = false;

    for _ in 0..MAX_ITERATIONS {
        let mut c2v: Vec<Vec<f32>> = Vec::with_capacity(CHECKS.len());
        for (c, vars) in CHECKS.iter().enumerate() {
            let msgs = &v2c[c];
            let mut row = vec![0f32; vars.len()];
            for i in 0..vars.len() {
                let mut sign = 1.0f32;
                let mut min_abs = f32::INFINITY;
                for (j, &m) in msgs.iter().enumerate() {
                    if j == i {
                        continue;
                    }
                    sign *= m.signum();
                    min_abs = min_abs.min(m.abs());
                }
                row[i] = sign * min_abs;
            }
            c2v.push(row);
        }

        total = llr;
        for (c, vars) in CHECKS.iter().enumerate() {
            for (i, &v) in vars.iter().enumerate() {
                total[v as usize] += c2v[c][i];
            }
        }

        let bits: Vec<u8> = total.iter().map(|&t| u8::from(t < 0.0)).collect();
        let satisfied = CHECKS.iter().all(|vars| {
            vars.iter().fold(0u8, |acc, &v| acc ^ bits[v as usize]) == 0
        });
        if satisfied {
            ok = true;
            break;
        }

        for (c, vars) in CHECKS.iter().enumerate() {
            for (i, &v) in vars.iter().enumerate() {
                v2c[c][i] = total[v as usize] - c2v[c][i];
            }
        }
    }

    if ok {
        let bits: Vec<u8> = total[..32].iter().map(|&t| u8::from(t < 0.0)).collect();
        Decoded {
            bytes: pack_bits_msb(&bits),
            ok: true,
        }
    } else {
        let bits: Vec<u8> = llr[..32].iter().map(|&t| u8::from(t < 0.0)).collect();
        Decoded {
            bytes: pack_bits_msb(&bits),
            ok: false,
        }
    }
}

/// Header FEC decoder block: 256-LLR PDU in, 4-byte header PDU out. Tags
/// the output with `invalid_header` when decoding fails.
pub struct HeaderFecDecoder {
    src: NCReadStream<Vec<f32>>,
    dst: NCWriteStream<Vec<u8>>,
}

impl HeaderFecDecoder {
    /// Create a new header FEC decoder block.
    #[must_use]
    pub fn new(src: NCReadStream<Vec<f32>>) -> (Self, NCReadStream<Vec<u8>>) {
        let (dst, dst_out) = NCWriteStream::new();
        (Self { src, dst }, dst_out)
    }
}

impl BlockName for HeaderFecDecoder {
    fn block_name(&self) -> &str {
        "HeaderFecDecoder"
    }
}

impl Block for HeaderFecDecoder {
    fn work(&mut self) -> Result<BlockRet> {
        let Some((llrs, mut tags)) = self.src.pop() else {
            return Ok(BlockRet::Noop);
        };
        if llrs.len() != HEADER_LLRS {
            log::warn!(
                "HeaderFecDecoder: expected {} LLRs, got {}, dropping",
                HEADER_LLRS,
                llrs.len()
            );
            return Ok(BlockRet::Ok);
        }
        let arr: [f32; HEADER_LLRS] = llrs.try_into().unwrap();
        let decoded = decode(&arr);
        if !decoded.ok {
            tags.push(Tag::new(0, "invalid_header", crate::Value::Null));
        }
        self.dst.push(decoded.bytes.to_vec(), tags);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header_fec_encoder::encode;

    fn bytes_to_llrs(codeword: &[u8; 32]) -> [f32; HEADER_LLRS] {
        let mut llrs = [0f32; HEADER_LLRS];
        for (i, slot) in llrs.iter_mut().enumerate() {
            let byte = codeword[i / 8];
            let bit = (byte >> (7 - (i % 8))) & 1;
            *slot = if bit == 0 { 4.0 } else { -4.0 };
        }
        llrs
    }

    #[test]
    fn decodes_clean_codeword() {
        let header = [0xDE, 0xAD, 0xBE, 0xEF];
        let codeword = encode(&header);
        let llrs = bytes_to_llrs(&codeword);
        let decoded = decode(&llrs);
        assert!(decoded.ok);
        assert_eq!(decoded.bytes, header);
    }
}
