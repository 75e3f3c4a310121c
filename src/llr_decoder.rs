/*! Constellation LLR decoder: converts symbols into log-likelihood ratios
for each bit, scaled by `2 / noise_sigma^2`. A positive LLR means the bit is
more likely 0. The active constellation can be switched by a `constellation`
tag on the PDU (`"BPSK"` emits one LLR per symbol from the in-phase
component; `"QPSK"` emits two, in-phase then quadrature).
*/
use log::warn;

use crate::Float;
use crate::Result;
use crate::Value;
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{NCReadStream, NCWriteStream};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Constellation {
    Bpsk,
    Qpsk,
}

/// Constellation LLR decoder block.
pub struct LlrDecoder {
    src: NCReadStream<Vec<crate::Complex>>,
    dst: NCWriteStream<Vec<Float>>,
    constellation: Constellation,
    noise_sigma: Float,
}

impl LlrDecoder {
    /// Create a new LLR decoder. `constellation` is `"BPSK"` or `"QPSK"`.
    #[must_use]
    pub fn new(
        src: NCReadStream<Vec<crate::Complex>>,
        constellation: &str,
        noise_sigma: Float,
    ) -> (Self, NCReadStream<Vec<Float>>) {
        let (dst, dst_out) = NCWriteStream::new();
        (
            Self {
                src,
                dst,
                constellation: parse_constellation(constellation),
                noise_sigma,
            },
            dst_out,
        )
    }
}

fn parse_constellation(s: &str) -> Constellation {
    match s {
        "QPSK" => Constellation::Qpsk,
        _ => Constellation::Bpsk,
    }
}

impl BlockName for LlrDecoder {
    fn block_name(&self) -> &str {
        "LlrDecoder"
    }
}

impl Block for LlrDecoder {
    fn work(&mut self) -> Result<BlockRet> {
        let Some((symbols, tags)) = self.src.pop() else {
            return Ok(BlockRet::Noop);
        };
        for tag in &tags {
            if tag.key() == "constellation" {
                if let Value::Str(c) = tag.val() {
                    self.constellation = parse_constellation(c);
                } else {
                    warn!("LlrDecoder: non-string constellation tag, ignoring");
                }
            }
        }

        let scale = 2.0 / (self.noise_sigma * self.noise_sigma);
        let mut llrs = Vec::with_capacity(symbols.len() * 2);
        for s in symbols {
            llrs.push(scale * s.re);
            if self.constellation == Constellation::Qpsk {
                llrs.push(scale * s.im);
            }
        }
        self.dst.push(llrs, tags);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Complex;

    #[test]
    fn qpsk_emits_two_llrs_per_symbol() -> Result<()> {
        let (src_in, src_out) = NCWriteStream::new();
        src_in.push(vec![Complex::new(0.5, -0.5)], vec![]);
        let (mut b, out) = LlrDecoder::new(src_out, "QPSK", 1.0);
        b.work()?;
        let (got, _) = out.pop().unwrap();
        assert_eq!(got, vec![1.0, -1.0]);
        Ok(())
    }

    #[test]
    fn bpsk_emits_one_llr_per_symbol() -> Result<()> {
        let (src_in, src_out) = NCWriteStream::new();
        src_in.push(vec![Complex::new(0.5, -0.5)], vec![]);
        let (mut b, out) = LlrDecoder::new(src_out, "BPSK", 1.0);
        b.work()?;
        let (got, _) = out.pop().unwrap();
        assert_eq!(got, vec![1.0]);
        Ok(())
    }
}
