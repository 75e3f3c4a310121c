/*! Coarse frequency correction: derotates the receive stream by a frequency
estimate carried on `syncword_freq` tags from [`crate::syncword_detection`].
*/
use crate::Complex;
use crate::Float;
use crate::Result;
use crate::Value;
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{ReadStream, WriteStream};

/// Number of output samples between exponential renormalizations.
const RENORM_PERIOD: usize = 512;

/// Coarse frequency correction block.
pub struct CoarseFreq {
    src: ReadStream<Complex>,
    dst: WriteStream<Complex>,
    delay: usize,

    phase: Complex,
    step: Complex,
    pending: Option<(Float, usize)>,
    since_renorm: usize,
}

impl CoarseFreq {
    /// Create a new coarse frequency correction block. `delay` is the
    /// sample countdown, after receiving a `syncword_freq` tag, before the
    /// new frequency estimate is applied (default 0, apply immediately).
    #[must_use]
    pub fn new(src: ReadStream<Complex>, delay: usize) -> (Self, ReadStream<Complex>) {
        let (dst, dst_out) = WriteStream::new();
        (
            Self {
                src,
                dst,
                delay,
                phase: Complex::new(1.0, 0.0),
                step: Complex::new(1.0, 0.0),
                pending: None,
                since_renorm: 0,
            },
            dst_out,
        )
    }
}

impl BlockName for CoarseFreq {
    fn block_name(&self) -> &str {
        "CoarseFreq"
    }
}

impl Block for CoarseFreq {
    fn work(&mut self) -> Result<BlockRet> {
        let (input, tags) = self.src.read_buf()?;
        if input.is_empty() {
            return Ok(BlockRet::Noop);
        }
        for tag in &tags {
            if tag.key() == "syncword_freq" {
                if let Value::F64(freq) = tag.val() {
                    self.pending = Some((*freq as Float, self.delay));
                }
            }
        }

        let n = input.len();
        let mut out = Vec::with_capacity(n);
        for &sample in input.iter() {
            if let Some((freq, countdown)) = self.pending {
                if countdown == 0 {
                    let negated = Complex::new(-freq.cos(), freq.sin());
                    self.step = negated;
                    self.pending = None;
                } else {
                    self.pending = Some((freq, countdown - 1));
                }
            }

            out.push(sample * self.phase);
            self.phase = self.phase * self.step;
            self.since_renorm += 1;
            if self.since_renorm >= RENORM_PERIOD {
                let norm = self.phase.norm();
                if norm > 0.0 {
                    self.phase = self.phase / norm;
                }
                self.since_renorm = 0;
            }
        }
        input.consume(n);

        let mut w = self.dst.write_buf()?;
        w.fill_from_slice(&out);
        w.produce(out.len(), &[]);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::new_stream;

    #[test]
    fn passes_through_with_no_correction_pending() -> Result<()> {
        let (src_in, src_out) = new_stream::<Complex>();
        {
            let mut w = src_in.write_buf()?;
            w.fill_from_slice(&[Complex::new(1.0, 0.0), Complex::new(0.0, 1.0)]);
            w.produce(2, &[]);
        }
        let (mut b, out) = CoarseFreq::new(src_out, 0);
        b.work()?;
        let (got, _) = out.read_buf()?;
        assert_eq!(got.len(), 2);
        assert!((got.slice()[0].re - 1.0).abs() < 1e-6);
        got.consume(2);
        Ok(())
    }
}
