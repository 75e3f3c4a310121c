/*! Symbol mapper: a lookup table from `k`-bit indices to constellation
points.

Each input byte holds an index in `0..2^k` (as produced by
[`crate::pack_bits::PackBits`] or directly by [`crate::unpack_bits`]); the
low `k` bits select one of the `2^k` configured output values.
*/
use log::warn;

use crate::Complex;
use crate::Result;
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{NCReadStream, NCWriteStream};

/// A lookup-table symbol mapper.
pub struct Mapper {
    src: NCReadStream<Vec<u8>>,
    dst: NCWriteStream<Vec<Complex>>,
    table: Vec<Complex>,
    k: u32,
}

impl Mapper {
    /// Create a new mapper with an explicit table. `table.len()` must be a
    /// power of two.
    #[must_use]
    pub fn new(src: NCReadStream<Vec<u8>>, table: Vec<Complex>) -> (Self, NCReadStream<Vec<Complex>>) {
        assert!(table.len().is_power_of_two(), "Mapper: table length must be a power of two");
        let k = table.len().trailing_zeros();
        let (dst, dst_out) = NCWriteStream::new();
        (Self { src, dst, table, k }, dst_out)
    }

    /// BPSK: {+1, -1}, index 0 maps to +1.
    #[must_use]
    pub fn bpsk(src: NCReadStream<Vec<u8>>) -> (Self, NCReadStream<Vec<Complex>>) {
        Self::new(src, vec![Complex::new(1.0, 0.0), Complex::new(-1.0, 0.0)])
    }

    /// QPSK: four points on the unit circle at odd multiples of pi/4, Gray
    /// coded on the low two bits.
    #[must_use]
    pub fn qpsk(src: NCReadStream<Vec<u8>>) -> (Self, NCReadStream<Vec<Complex>>) {
        let a = std::f64::consts::FRAC_1_SQRT_2 as f32;
        Self::new(
            src,
            vec![
                Complex::new(a, a),
                Complex::new(-a, a),
                Complex::new(-a, -a),
                Complex::new(a, -a),
            ],
        )
    }
}

impl BlockName for Mapper {
    fn block_name(&self) -> &str {
        "Mapper"
    }
}

impl Block for Mapper {
    fn work(&mut self) -> Result<BlockRet> {
        let Some((packet, tags)) = self.src.pop() else {
            return Ok(BlockRet::Noop);
        };
        let mask = (1u32 << self.k) - 1;
        let mut bad = false;
        let out: Vec<Complex> = packet
            .iter()
            .map(|&v| {
                let idx = (v as u32) & mask;
                if v as u32 != idx {
                    bad = true;
                }
                self.table[idx as usize]
            })
            .collect();
        if bad {
            warn!("Mapper: input value outside table range, low bits used");
        }
        self.dst.push(out, tags);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bpsk_maps_zero_one() -> Result<()> {
        let (src_in, src_out) = NCWriteStream::new();
        src_in.push(vec![0, 1, 0], vec![]);
        let (mut b, out) = Mapper::bpsk(src_out);
        b.work()?;
        let (got, _) = out.pop().unwrap();
        assert_eq!(got, vec![Complex::new(1.0, 0.0), Complex::new(-1.0, 0.0), Complex::new(1.0, 0.0)]);
        Ok(())
    }

    #[test]
    fn qpsk_has_unit_magnitude_points() -> Result<()> {
        let (src_in, src_out) = NCWriteStream::new();
        src_in.push(vec![0, 1, 2, 3], vec![]);
        let (mut b, out) = Mapper::qpsk(src_out);
        b.work()?;
        let (got, _) = out.pop().unwrap();
        assert_eq!(got.len(), 4);
        for c in got {
            assert!((c.norm() - 1.0).abs() < 1e-5);
        }
        Ok(())
    }
}
