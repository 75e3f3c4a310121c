/*! Syncword detection: FFT matched-filter correlator that finds the start of
each frame in the continuous receive sample stream.

This is a simplified rendition of the original multi-frequency-hypothesis
correlator: it uses a real inverse FFT (via `rustfft`'s inverse planner)
rather than the forward-FFT-on-a-conjugated-product trick the original uses
to avoid needing one, and it resolves one sliding-window candidate at a time
rather than maintaining an unbounded set of overlapping candidates. The
detection statistics (amplitude, phase, frequency, frequency bin) and the
declaration rule (sliding peak over a `2*time_threshold+1` window, compared
against the window's other samples scaled by `power_threshold`) match the
original.
*/
use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::{Fft, FftPlanner};

use crate::Complex;
use crate::Float;
use crate::Result;
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{ReadStream, Tag, WriteStream};
use crate::Value;

/// Default FFT size for the correlator.
pub const DEFAULT_FFT_SIZE: usize = 2048;

struct HistEntry {
    sample: Complex,
    power: Float,
    corr: Complex,
    bin: i32,
    detected: bool,
}

/// Syncword detection block.
pub struct SyncwordDetection {
    src: ReadStream<Complex>,
    dst: WriteStream<Complex>,

    fft_size: usize,
    stride: usize,
    s: usize,
    freq_bins: Vec<i32>,
    h: Vec<Vec<Complex>>,
    p_sw: Float,
    time_threshold: usize,
    power_threshold: Float,
    history_size: usize,

    fft_fwd: Arc<dyn Fft<Float>>,
    fft_inv: Arc<dyn Fft<Float>>,

    history: VecDeque<HistEntry>,
    history_start: u64,
    best_idx: Option<u64>,
    best_power: Float,
    sample_count: u64,
}

impl SyncwordDetection {
    /// Build the modulated BPSK syncword (one symbol per bit, MSB first),
    /// upsampled with `taps` at `sps` samples per symbol.
    #[must_use]
    pub fn modulate_syncword(bits: u64, num_bits: u32, sps: usize, taps: &[Float]) -> Vec<Complex> {
        let symbols: Vec<Complex> = (0..num_bits)
            .map(|i| {
                let bit = (bits >> (num_bits - 1 - i)) & 1;
                if bit == 0 { Complex::new(1.0, 0.0) } else { Complex::new(-1.0, 0.0) }
            })
            .collect();
        let stuffed_len = (symbols.len() - 1) * sps + 1;
        let mut upsampled = vec![Complex::new(0.0, 0.0); stuffed_len];
        for (i, &s) in symbols.iter().enumerate() {
            upsampled[i * sps] = s;
        }
        // Full (non-centered) convolution: out[n] = sum_k upsampled[n-k] * taps[k].
        let out_len = stuffed_len + taps.len() - 1;
        let mut out = vec![Complex::new(0.0, 0.0); out_len];
        for (n, o) in out.iter_mut().enumerate() {
            let mut acc = Complex::new(0.0, 0.0);
            for (k, &tap) in taps.iter().enumerate() {
                if n >= k && (n - k) < stuffed_len {
                    acc += upsampled[n - k] * tap;
                }
            }
            *o = acc;
        }
        out
    }

    /// Create a new syncword detection block.
    ///
    /// `syncword` is the modulated reference (see [`Self::modulate_syncword`]),
    /// `min_freq_bin..=max_freq_bin` the frequency hypotheses to search (each
    /// bin is a rotation of `pi*k/s` rad/sample), `fft_size` the correlator
    /// FFT length, `time_threshold` half the peak declaration window, and
    /// `power_threshold` the ratio a candidate's neighbors must fall under.
    #[must_use]
    pub fn new(
        src: ReadStream<Complex>,
        syncword: &[Complex],
        min_freq_bin: i32,
        max_freq_bin: i32,
        fft_size: usize,
        time_threshold: usize,
        power_threshold: Float,
    ) -> (Self, ReadStream<Complex>) {
        let s = syncword.len();
        assert!(fft_size > s, "fft_size must exceed the syncword length");
        let stride = fft_size - s + 1;
        let mut planner = FftPlanner::<Float>::new();
        let fft_fwd = planner.plan_fft_forward(fft_size);
        let fft_inv = planner.plan_fft_inverse(fft_size);

        let p_sw: Float = syncword.iter().map(|c| c.norm_sqr()).sum();

        let freq_bins: Vec<i32> = (min_freq_bin..=max_freq_bin).collect();
        let h: Vec<Vec<Complex>> = freq_bins
            .iter()
            .map(|&k| {
                let mut rotated = vec![Complex::new(0.0, 0.0); fft_size];
                for (n, &sample) in syncword.iter().enumerate() {
                    let phase = -std::f32::consts::PI * k as Float * n as Float / s as Float;
                    let rot = Complex::new(phase.cos(), phase.sin());
                    rotated[n] = sample * rot;
                }
                fft_fwd.process(&mut rotated);
                rotated.iter().map(|c| c.conj()).collect()
            })
            .collect();

        let (dst, dst_out) = WriteStream::new();
        let history_size = 4 * time_threshold + fft_size.max(8);
        (
            Self {
                src,
                dst,
                fft_size,
                stride,
                s,
                freq_bins,
                h,
                p_sw,
                time_threshold,
                power_threshold,
                history_size,
                fft_fwd,
                fft_inv,
                history: VecDeque::new(),
                history_start: 0,
                best_idx: None,
                best_power: 0.0,
                sample_count: 0,
            },
            dst_out,
        )
    }

    fn resolve(&mut self, best_idx: u64) {
        let lo = best_idx.saturating_sub(self.time_threshold as u64);
        let hi = best_idx + self.time_threshold as u64;
        let best_power = self.best_power;
        let mut below = 0usize;
        let mut total = 0usize;
        for abs in lo..=hi {
            if abs == best_idx || abs < self.history_start {
                continue;
            }
            let Some(entry) = self.history.get((abs - self.history_start) as usize) else {
                continue;
            };
            total += 1;
            if entry.power < best_power / self.power_threshold {
                below += 1;
            }
        }
        if total > 0 && below * 2 >= total {
            if let Some(entry) = self.history.get_mut((best_idx - self.history_start) as usize) {
                entry.detected = true;
            }
        }
    }

    fn drain_ready(&mut self) -> (Vec<Complex>, Vec<Tag>) {
        let mut out = Vec::new();
        let mut tags = Vec::new();
        while self.history.len() > self.history_size {
            let entry = self.history.pop_front().expect("checked len above");
            self.history_start += 1;
            let pos = out.len();
            if entry.detected {
                let amplitude = entry.power.sqrt() / (self.fft_size as Float * self.p_sw.sqrt());
                tags.push(Tag::new(pos, "syncword_amplitude", Value::F64(amplitude as f64)));
                tags.push(Tag::new(pos, "syncword_phase", Value::F64(entry.corr.arg() as f64)));
                let freq = std::f32::consts::PI * entry.bin as Float / self.s as Float;
                tags.push(Tag::new(pos, "syncword_freq", Value::F64(freq as f64)));
                tags.push(Tag::new(pos, "syncword_freq_bin", Value::I64(entry.bin as i64)));
            }
            out.push(entry.sample);
        }
        (out, tags)
    }
}

impl BlockName for SyncwordDetection {
    fn block_name(&self) -> &str {
        "SyncwordDetection"
    }
}

impl Block for SyncwordDetection {
    fn work(&mut self) -> Result<BlockRet> {
        let (input, _tags) = self.src.read_buf()?;
        if input.len() < self.fft_size {
            input.consume(0);
            return Ok(BlockRet::Pending);
        }
        let window = &input.slice()[..self.fft_size];
        let mut x: Vec<Complex> = window.to_vec();
        self.fft_fwd.process(&mut x);

        let mut best_per_sample: Vec<(Float, Complex, i32)> =
            vec![(-1.0, Complex::new(0.0, 0.0), 0); self.stride];
        for (bin_idx, hk) in self.h.iter().enumerate() {
            let mut z: Vec<Complex> = x.iter().zip(hk.iter()).map(|(a, b)| *a * *b).collect();
            self.fft_inv.process(&mut z);
            for n in 0..self.stride {
                let power = z[n].norm_sqr();
                if power > best_per_sample[n].0 {
                    best_per_sample[n] = (power, z[n], self.freq_bins[bin_idx]);
                }
            }
        }

        for (n, &sample) in window.iter().take(self.stride).enumerate() {
            let (power, corr, bin) = best_per_sample[n];
            let abs_idx = self.sample_count;
            self.sample_count += 1;

            if let Some(bi) = self.best_idx {
                if abs_idx > bi + self.time_threshold as u64 {
                    self.resolve(bi);
                    self.best_idx = None;
                    self.best_power = 0.0;
                }
            }
            if self.best_idx.is_none() || power > self.best_power {
                self.best_idx = Some(abs_idx);
                self.best_power = power;
            }

            self.history.push_back(HistEntry { sample, power, corr, bin, detected: false });
        }
        input.consume(self.stride);

        let (out, tags) = self.drain_ready();
        if out.is_empty() {
            return Ok(BlockRet::Pending);
        }
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
    fn detects_modulated_syncword_in_noise_free_stream() -> Result<()> {
        let taps = crate::rrc::rrc_taps(4, 11, 0.35, 1.0);
        let syncword = SyncwordDetection::modulate_syncword(0x1ACF_FC1D, 32, 4, &taps);

        let (src_in, src_out) = new_stream::<Complex>();
        let preamble = vec![Complex::new(0.0, 0.0); 200];
        let tail = vec![Complex::new(0.0, 0.0); 4000];
        {
            let mut w = src_in.write_buf()?;
            let mut all = preamble.clone();
            all.extend(syncword.iter().copied());
            all.extend(tail.iter().copied());
            w.fill_from_slice(&all);
            w.produce(all.len(), &[]);
        }

        let (mut det, out) = SyncwordDetection::new(src_out, &syncword, -2, 2, 512, 32, 9.5);
        let mut detected = false;
        for _ in 0..40 {
            let _ = det.work();
            let (reader, tags) = out.read_buf()?;
            if tags.iter().any(|t| t.key() == "syncword_amplitude") {
                detected = true;
            }
            let n = reader.len();
            reader.consume(n);
        }
        assert!(detected, "expected a syncword detection tag somewhere in the output");
        Ok(())
    }
}
