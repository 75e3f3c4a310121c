/*! Costas loop: a second-order carrier-phase PLL that derotates the symbol
stream, switching its phase-error discriminant between pilot/BPSK/QPSK
constellations on `constellation` tags, and resetting on `syncword_phase`
tags inserted by the detector.
*/
use crate::Complex;
use crate::Float;
use crate::Result;
use crate::Value;
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{ReadStream, WriteStream};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Constellation {
    Pilot,
    Bpsk,
    Qpsk,
}

/// Costas loop block.
pub struct CostasLoop {
    src: ReadStream<Complex>,
    dst: WriteStream<Complex>,

    k1: Float,
    k2: Float,
    phase: Float,
    freq: Float,
    constellation: Constellation,
}

impl CostasLoop {
    /// Create a new Costas loop with the given one-sided normalized loop
    /// bandwidth `bl_t` (`B_L * T`), e.g. 6.28e-3.
    #[must_use]
    pub fn new(src: ReadStream<Complex>, bl_t: Float) -> (Self, ReadStream<Complex>) {
        // Closed-form critically-damped (zeta = 1/sqrt(2)) second-order loop gains.
        let damping: Float = std::f32::consts::FRAC_1_SQRT_2;
        let theta = bl_t / (damping + 1.0 / (4.0 * damping));
        let k1 = 4.0 * damping * theta / (1.0 + 2.0 * damping * theta + theta * theta);
        let k2 = 4.0 * theta * theta / (1.0 + 2.0 * damping * theta + theta * theta);
        let (dst, dst_out) = WriteStream::new();
        (
            Self {
                src,
                dst,
                k1,
                k2,
                phase: 0.0,
                freq: 0.0,
                constellation: Constellation::Pilot,
            },
            dst_out,
        )
    }

    fn discriminant(&self, derotated: Complex) -> Float {
        let i = derotated.re;
        let q = derotated.im;
        match self.constellation {
            Constellation::Pilot => q,
            Constellation::Bpsk => i * q,
            Constellation::Qpsk => {
                (i.signum() * q - q.signum() * i) / std::f32::consts::SQRT_2
            }
        }
    }
}

impl BlockName for CostasLoop {
    fn block_name(&self) -> &str {
        "CostasLoop"
    }
}

impl Block for CostasLoop {
    fn work(&mut self) -> Result<BlockRet> {
        let (input, tags) = self.src.read_buf()?;
        if input.is_empty() {
            return Ok(BlockRet::Noop);
        }
        let n = input.len();
        let mut by_pos: Vec<Vec<&crate::stream::Tag>> = vec![Vec::new(); n];
        for tag in &tags {
            if tag.pos() < n {
                by_pos[tag.pos()].push(tag);
            }
        }

        let mut out = Vec::with_capacity(n);
        for (i, &sample) in input.iter().enumerate() {
            for tag in &by_pos[i] {
                match tag.key() {
                    "syncword_phase" => {
                        if let Value::F64(p) = tag.val() {
                            self.phase = *p as Float;
                        }
                        self.freq = 0.0;
                    }
                    "constellation" => {
                        if let Value::Str(c) = tag.val() {
                            self.constellation = match c.as_str() {
                                "BPSK" => Constellation::Bpsk,
                                "QPSK" => Constellation::Qpsk,
                                _ => Constellation::Pilot,
                            };
                        }
                    }
                    _ => {}
                }
            }

            let rot = Complex::new(self.phase.cos(), -self.phase.sin());
            let derotated = sample * rot;
            let error = self.discriminant(derotated);
            self.freq += self.k2 * error;
            self.phase += self.freq + self.k1 * error;
            self.phase %= std::f32::consts::TAU;

            out.push(derotated);
        }
        input.consume(n);

        let mut w = self.dst.write_buf()?;
        w.fill_from_slice(&out);
        w.produce(out.len(), &tags);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::new_stream;

    #[test]
    fn locks_bpsk_phase_to_zero() -> Result<()> {
        let (src_in, src_out) = new_stream::<Complex>();
        {
            let mut w = src_in.write_buf()?;
            // A BPSK carrier rotated by a fixed phase offset.
            let offset = 0.3_f32;
            let rot = Complex::new(offset.cos(), offset.sin());
            let samples: Vec<Complex> = (0..2000)
                .map(|i| if i % 2 == 0 { Complex::new(1.0, 0.0) } else { Complex::new(-1.0, 0.0) })
                .map(|s| s * rot)
                .collect();
            w.fill_from_slice(&samples);
            w.produce(
                samples.len(),
                &[crate::stream::Tag::new(0, "constellation", Value::Str("BPSK".to_string()))],
            );
        }
        let (mut b, out) = CostasLoop::new(src_out, 0.02);
        b.work()?;
        let (got, _) = out.read_buf()?;
        assert_eq!(got.len(), 2000);
        // After convergence the imaginary part should shrink toward zero.
        let late = got.slice()[1900];
        got.consume(2000);
        assert!(late.im.abs() < late.re.abs());
        Ok(())
    }
}
