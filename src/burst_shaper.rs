/*! Burst shaper: applies leading/trailing amplitude envelopes (e.g. a
half-sine ramp) to each packet, leaving the samples in between unchanged.
Used in non-stream (bursty) transmit mode to soften the burst edges.
*/
use log::warn;

use crate::Complex;
use crate::Result;
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{NCReadStream, NCWriteStream};

/// Burst shaper block.
pub struct BurstShaper {
    src: NCReadStream<Vec<Complex>>,
    dst: NCWriteStream<Vec<Complex>>,
    leading_shape: Vec<f32>,
    trailing_shape: Vec<f32>,
}

impl BurstShaper {
    /// Create a new burst shaper with the given leading and trailing
    /// envelopes.
    #[must_use]
    pub fn new(
        src: NCReadStream<Vec<Complex>>,
        leading_shape: Vec<f32>,
        trailing_shape: Vec<f32>,
    ) -> (Self, NCReadStream<Vec<Complex>>) {
        let (dst, dst_out) = NCWriteStream::new();
        (
            Self {
                src,
                dst,
                leading_shape,
                trailing_shape,
            },
            dst_out,
        )
    }

    /// A half-sine envelope of `len` samples, ramping 0 to 1 (for leading)
    /// or 1 to 0 (for trailing, by reversing the result).
    #[must_use]
    pub fn half_sine(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| ((i as f32 + 0.5) / len as f32 * std::f32::consts::FRAC_PI_2).sin())
            .collect()
    }
}

impl BlockName for BurstShaper {
    fn block_name(&self) -> &str {
        "BurstShaper"
    }
}

impl Block for BurstShaper {
    fn work(&mut self) -> Result<BlockRet> {
        let Some((mut packet, tags)) = self.src.pop() else {
            return Ok(BlockRet::Noop);
        };
        if packet.len() < self.leading_shape.len() + self.trailing_shape.len() {
            warn!("BurstShaper: packet shorter than the shaping envelopes, passing through unshaped");
            self.dst.push(packet, tags);
            return Ok(BlockRet::Ok);
        }
        for (s, &g) in packet.iter_mut().zip(self.leading_shape.iter()) {
            *s = *s * g;
        }
        let n = packet.len();
        for (s, &g) in packet[n - self.trailing_shape.len()..]
            .iter_mut()
            .zip(self.trailing_shape.iter())
        {
            *s = *s * g;
        }
        self.dst.push(packet, tags);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes_leading_and_trailing_edges() -> Result<()> {
        let (src_in, src_out) = NCWriteStream::new();
        let packet = vec![Complex::new(1.0, 0.0); 10];
        src_in.push(packet, vec![]);
        let leading = BurstShaper::half_sine(3);
        let mut trailing = leading.clone();
        trailing.reverse();
        let (mut b, out) = BurstShaper::new(src_out, leading.clone(), trailing.clone());
        b.work()?;
        let (got, _) = out.pop().unwrap();
        assert!((got[0].re - leading[0]).abs() < 1e-6);
        assert!((got[9].re - trailing[2]).abs() < 1e-6);
        assert!((got[5].re - 1.0).abs() < 1e-6);
        Ok(())
    }
}
