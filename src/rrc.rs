/*! Root-raised-cosine pulse shaping: tap generation and the transmit
interpolating FIR filter built from them.
*/
use crate::Complex;
use crate::Float;
use crate::Result;
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{NCReadStream, NCWriteStream};
use crate::unpack_bits::rescale_len_tags;

/// Generate normalized root-raised-cosine taps.
///
/// `sps` is samples per symbol, `span_symbols` the filter length in symbol
/// periods (the design uses 11), and `rolloff` the excess-bandwidth factor
/// (0.35). Taps are scaled so the peak tap, which lands at the filter
/// center, equals `gain`.
#[must_use]
pub fn rrc_taps(sps: usize, span_symbols: usize, rolloff: Float, gain: Float) -> Vec<Float> {
    let n = span_symbols * sps;
    let n = if n % 2 == 0 { n + 1 } else { n };
    let center = (n / 2) as isize;
    let mut taps = vec![0.0; n];
    for (i, tap) in taps.iter_mut().enumerate() {
        let t = (i as isize - center) as Float / sps as Float;
        *tap = rrc_at(t, rolloff);
    }
    let peak = taps[center as usize];
    if peak != 0.0 {
        for tap in &mut taps {
            *tap *= gain / peak;
        }
    }
    taps
}

fn rrc_at(t: Float, beta: Float) -> Float {
    if t.abs() < 1e-8 {
        return 1.0 - beta + 4.0 * beta / std::f32::consts::PI;
    }
    let four_beta_t = 4.0 * beta * t;
    if (four_beta_t.abs() - 1.0).abs() < 1e-6 {
        let a = 1.0 + 2.0 / std::f32::consts::PI;
        let b = 1.0 - 2.0 / std::f32::consts::PI;
        return (beta / std::f32::consts::SQRT_2) * (a * (std::f32::consts::FRAC_PI_4 / beta).sin() + b * (std::f32::consts::FRAC_PI_4 / beta).cos());
    }
    let pt = std::f32::consts::PI * t;
    let num = (pt * (1.0 - beta)).sin() + four_beta_t * (pt * (1.0 + beta)).cos();
    let den = pt * (1.0 - four_beta_t * four_beta_t);
    num / den
}

/// The group delay, in samples, of an RRC filter with the given tap count.
#[must_use]
pub fn group_delay(num_taps: usize) -> usize {
    num_taps / 2
}

/// Interpolating FIR filter: for `sps` samples per input symbol, expands
/// each input sample to `sps` output samples, convolving with `taps`.
/// Operates on whole PDUs, matching the PDU-granular framing chain feeding
/// it; the packet-length tag (if present) is rescaled by `sps`.
pub struct InterpolatingFir {
    src: NCReadStream<Vec<Complex>>,
    dst: NCWriteStream<Vec<Complex>>,
    taps: Vec<Float>,
    sps: usize,
}

impl InterpolatingFir {
    /// Create a new interpolating FIR filter. `taps` is the prototype
    /// low-pass/RRC filter evaluated at the output rate; `sps` is the
    /// upsampling factor.
    #[must_use]
    pub fn new(
        src: NCReadStream<Vec<Complex>>,
        taps: Vec<Float>,
        sps: usize,
    ) -> (Self, NCReadStream<Vec<Complex>>) {
        let (dst, dst_out) = NCWriteStream::new();
        (Self { src, dst, taps, sps }, dst_out)
    }
}

impl BlockName for InterpolatingFir {
    fn block_name(&self) -> &str {
        "InterpolatingFir"
    }
}

impl Block for InterpolatingFir {
    fn work(&mut self) -> Result<BlockRet> {
        let Some((symbols, tags)) = self.src.pop() else {
            return Ok(BlockRet::Noop);
        };
        let upsampled_len = symbols.len() * self.sps;
        let mut upsampled = vec![Complex::new(0.0, 0.0); upsampled_len];
        for (i, &s) in symbols.iter().enumerate() {
            upsampled[i * self.sps] = s;
        }
        let half = self.taps.len() / 2;
        let mut out = vec![Complex::new(0.0, 0.0); upsampled_len];
        for (n, o) in out.iter_mut().enumerate() {
            let mut acc = Complex::new(0.0, 0.0);
            for (k, &tap) in self.taps.iter().enumerate() {
                let idx = n as isize + half as isize - k as isize;
                if idx >= 0 && (idx as usize) < upsampled_len {
                    acc += upsampled[idx as usize] * tap;
                }
            }
            *o = acc;
        }
        let tags = rescale_len_tags(tags, self.sps as u64, 1);
        self.dst.push(out, tags);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taps_peak_at_center_with_requested_gain() {
        let taps = rrc_taps(4, 11, 0.35, 1.0);
        let center = taps.len() / 2;
        let peak = taps[center];
        assert!((peak - 1.0).abs() < 1e-5);
        assert_eq!(taps.len() % 2, 1);
    }

    #[test]
    fn interpolation_expands_by_sps() -> Result<()> {
        let (src_in, src_out) = NCWriteStream::new();
        src_in.push(vec![Complex::new(1.0, 0.0); 8], vec![]);
        let taps = rrc_taps(4, 11, 0.35, 1.0);
        let (mut b, out) = InterpolatingFir::new(src_out, taps, 4);
        b.work()?;
        let (got, _) = out.pop().unwrap();
        assert_eq!(got.len(), 32);
        Ok(())
    }
}
