/*! Syncword wipe-off: multiplies the syncword symbols following a detection
tag by the known bipolar syncword sequence, turning the BPSK syncword into a
pure carrier the Costas loop can lock to without a phase ambiguity.
*/
use crate::Complex;
use crate::Float;
use crate::Result;
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{ReadStream, WriteStream};

/// Syncword wipe-off block.
pub struct SyncwordWipeoff {
    src: ReadStream<Complex>,
    dst: WriteStream<Complex>,
    bipolar: Vec<Float>,
    countdown: usize,
}

impl SyncwordWipeoff {
    /// Create a new syncword wipe-off block. `bits` is the syncword value,
    /// `num_bits` its length (MSB-first), matching
    /// [`crate::syncword_detection::SyncwordDetection::modulate_syncword`]'s
    /// bit convention.
    #[must_use]
    pub fn new(src: ReadStream<Complex>, bits: u64, num_bits: u32) -> (Self, ReadStream<Complex>) {
        let bipolar: Vec<Float> = (0..num_bits)
            .map(|i| {
                let bit = (bits >> (num_bits - 1 - i)) & 1;
                if bit == 0 { 1.0 } else { -1.0 }
            })
            .collect();
        let (dst, dst_out) = WriteStream::new();
        (
            Self {
                src,
                dst,
                bipolar,
                countdown: 0,
            },
            dst_out,
        )
    }
}

impl BlockName for SyncwordWipeoff {
    fn block_name(&self) -> &str {
        "SyncwordWipeoff"
    }
}

impl Block for SyncwordWipeoff {
    fn work(&mut self) -> Result<BlockRet> {
        let (input, tags) = self.src.read_buf()?;
        if input.is_empty() {
            return Ok(BlockRet::Noop);
        }
        let n = input.len();
        let starts: Vec<usize> = tags
            .iter()
            .filter(|t| t.key() == "syncword_amplitude")
            .map(|t| t.pos())
            .collect();

        let mut out = Vec::with_capacity(n);
        for (i, &sample) in input.iter().enumerate() {
            if starts.contains(&i) {
                self.countdown = self.bipolar.len();
            }
            if self.countdown > 0 {
                let idx = self.bipolar.len() - self.countdown;
                out.push(sample * self.bipolar[idx]);
                self.countdown -= 1;
            } else {
                out.push(sample);
            }
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
    use crate::stream::{Tag, new_stream};
    use crate::Value;

    #[test]
    fn wipes_off_the_syncword_only() -> Result<()> {
        let (src_in, src_out) = new_stream::<Complex>();
        {
            let mut w = src_in.write_buf()?;
            let samples = vec![Complex::new(1.0, 0.0); 4];
            w.fill_from_slice(&samples);
            w.produce(4, &[Tag::new(0, "syncword_amplitude", Value::F64(1.0))]);
        }
        let (mut b, out) = SyncwordWipeoff::new(src_out, 0b10, 2);
        b.work()?;
        let (got, _) = out.read_buf()?;
        assert_eq!(got.len(), 4);
        assert!((got.slice()[0].re - 1.0).abs() < 1e-6);
        assert!((got.slice()[1].re - (-1.0)).abs() < 1e-6);
        assert!((got.slice()[2].re - 1.0).abs() < 1e-6);
        got.consume(4);
        Ok(())
    }
}
