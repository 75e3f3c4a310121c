//! Generate a pure sine wave.
use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{ReadStream, WriteStream};
use crate::{Complex, Float, Result};

/// Generate a pure complex sine wave.
pub struct SignalSourceComplex {
    dst: WriteStream<Complex>,
    amplitude: Float,
    rad_per_sample: f64,
    current: f64,
}

impl SignalSourceComplex {
    /// Create a new SignalSourceComplex block.
    #[must_use]
    pub fn new(samp_rate: Float, freq: Float, amplitude: Float) -> (Self, ReadStream<Complex>) {
        let (dst, dst_out) = WriteStream::new();
        (
            Self {
                dst,
                current: 0.0,
                amplitude,
                rad_per_sample: 2.0 * std::f64::consts::PI * (freq as f64) / (samp_rate as f64),
            },
            dst_out,
        )
    }
}

impl Iterator for SignalSourceComplex {
    type Item = Complex;
    fn next(&mut self) -> Option<Complex> {
        self.current = (self.current + self.rad_per_sample) % (2.0 * std::f64::consts::PI);
        Some(
            self.amplitude
                * Complex::new(
                    self.current.sin() as Float,
                    (self.current - std::f64::consts::PI / 2.0).sin() as Float,
                ),
        )
    }
}

impl BlockName for SignalSourceComplex {
    fn block_name(&self) -> &str {
        "SignalSourceComplex"
    }
}
impl Block for SignalSourceComplex {
    fn work(&mut self) -> Result<BlockRet> {
        let mut o = self.dst.write_buf()?;
        let n = o.len();
        if n == 0 {
            return Ok(BlockRet::OutputFull);
        }
        for (to, from) in o.slice().iter_mut().zip(self.take(n)) {
            *to = from;
        }
        o.produce(n, &[]);
        Ok(BlockRet::Ok)
    }
}

/// Generate a pure real sine wave.
pub struct SignalSourceFloat {
    dst: WriteStream<Float>,
    amplitude: Float,
    rad_per_sample: f64,
    current: f64,
}

impl SignalSourceFloat {
    /// Create a new SignalSourceFloat block.
    #[must_use]
    pub fn new(samp_rate: Float, freq: Float, amplitude: Float) -> (Self, ReadStream<Float>) {
        let (dst, dst_out) = WriteStream::new();
        (
            Self {
                dst,
                current: 0.0,
                amplitude,
                rad_per_sample: 2.0 * std::f64::consts::PI * (freq as f64) / (samp_rate as f64),
            },
            dst_out,
        )
    }
}

impl Iterator for SignalSourceFloat {
    type Item = Float;
    fn next(&mut self) -> Option<Float> {
        self.current = (self.current + self.rad_per_sample) % (2.0 * std::f64::consts::PI);
        Some(self.amplitude * self.current.sin() as Float)
    }
}

impl BlockName for SignalSourceFloat {
    fn block_name(&self) -> &str {
        "SignalSourceFloat"
    }
}
impl Block for SignalSourceFloat {
    fn work(&mut self) -> Result<BlockRet> {
        let mut o = self.dst.write_buf()?;
        let n = o.len();
        if n == 0 {
            return Ok(BlockRet::OutputFull);
        }
        for (to, from) in o.slice().iter_mut().zip(self.take(n)) {
            *to = from;
        }
        o.produce(n, &[]);
        Ok(BlockRet::Ok)
    }
}
