#![warn(missing_docs)]
/*! A framework for building software defined radio packet modems.

It's heavily inspired by [GNU Radio][gnuradio] and by [rustradio][rustradio],
on top of which this crate is built, except the block library here is
specialized to one job: framing, forward-error-correcting, modulating and
demodulating a burst packet waveform.

# Architecture overview

An application built on this crate is a graph of blocks connected by
unidirectional streams. Each block has zero or more input streams and zero or
more output streams. Signal flows from "sources" (blocks with no inputs) to
"sinks" (blocks with no outputs).

A typical transmit graph looks like:

```text
   [ Packet ingress ]
          v
 [ Header + CRC + FEC ]
          v
    [ Scrambler ]
          v
  [ Bit packing + mapper ]
          v
   [ Burst shaping, RRC ]
          v
      [ Sink / radio ]
```

and the receive graph undoes each of those steps, plus the extra
synchronization machinery (syncword correlation, coarse frequency
correction, symbol timing recovery, a Costas loop) needed to find and track
a burst in noise.

# Examples

```
use rustradio::graph::{Graph, GraphRunner};
use rustradio::blocks::{AddConst, VectorSource, DebugSink};
use rustradio::Complex;
let (src, src_out) = VectorSource::new(vec![
    Complex::new(10.0, 0.0),
    Complex::new(-20.0, 0.0),
    Complex::new(100.0, -100.0),
]);
let (add, add_out) = AddConst::new(src_out, Complex::new(1.1, 2.0));
let sink = DebugSink::new(add_out);
let mut g = Graph::new();
g.add(Box::new(src));
g.add(Box::new(add));
g.add(Box::new(sink));
g.run()?;
# Ok::<(), rustradio::Error>(())
```

[rustradio]: https://github.com/ThomasHabets/rustradio
[gnuradio]: https://www.gnuradio.org/
*/
use std::sync::atomic::AtomicUsize;

// Runtime plumbing.
pub mod block;
pub mod blocks;
pub mod circular_buffer;
pub mod graph;
pub mod message;
pub mod mtgraph;
pub mod stream;
pub mod value;

// Generic stream blocks, kept from the block library this crate is built on.
pub mod add;
pub mod add_const;
pub mod binary_slicer;
pub mod canary;
pub mod complex_to_mag2;
pub mod constant_source;
pub mod convert;
pub mod debug_sink;
pub mod delay;
pub mod file_sink;
pub mod file_source;
pub mod multiply_const;
pub mod null_sink;
pub mod pdu_to_stream;
pub mod pdu_writer;
pub mod reader_source;
pub mod signal_source;
pub mod skip;
pub mod stream_to_pdu;
pub mod strobe;
pub mod tee;
pub mod vec_to_stream;
pub mod vector_sink;
pub mod vector_source;
pub mod window;
pub mod writer_sink;

// Packet modem blocks.
pub mod crc;
pub mod crc_append;
pub mod crc_check;
pub mod scrambler;
pub mod pack_bits;
pub mod unpack_bits;
pub mod mapper;
pub mod packet_ingress;
pub mod header_formatter;
pub mod header_fec_encoder;
pub mod header_fec_decoder;
pub mod header_parser;
pub mod packet_mux;
pub mod burst_shaper;
pub mod rrc;
pub mod syncword_detection;
pub mod coarse_freq;
pub mod symbol_filter;
pub mod syncword_wipeoff;
pub mod payload_metadata_insert;
pub mod costas_loop;
pub mod header_payload_split;
pub mod llr_decoder;
pub mod packet_to_stream;
pub mod throttle;
pub mod probe_rate;
pub mod packet_counter;
pub mod pipeline;

pub use value::Value;

/// Float type used. Usually f32, but not guaranteed.
pub type Float = f32;

/// Complex (I/Q) data.
pub type Complex = num_complex::Complex<Float>;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

static NEXT_STREAM_ID: AtomicUsize = AtomicUsize::new(1);

/// Allocate a fresh, process-unique id. Used to tell streams and buffers
/// apart in logs and stats without needing to print their full address.
pub(crate) fn next_id() -> usize {
    NEXT_STREAM_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
}

/// Errors produced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A block was misconfigured: a bad parameter, an incompatible
    /// combination of settings, or a graph that can't be wired up.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A framing or FEC invariant was violated: a malformed header, a
    /// syncword that doesn't match, a CRC that fails after the decoder
    /// claims success.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A block failed to decode or parse its input.
    #[error("decode failure: {0}")]
    Decode(String),

    /// Wraps an I/O failure from a file or stream block.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A runtime invariant inside the streaming engine itself was
    /// violated (too many references to a buffer, a poisoned lock). These
    /// indicate a bug in a block, not bad input.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build an ad-hoc internal error from a message. Prefer a more
    /// specific variant where one fits.
    pub fn msg(s: impl Into<String>) -> Self {
        Error::Internal(s.into())
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Error {
        Error::Internal(format!("poisoned lock: {e}"))
    }
}

impl From<std::array::TryFromSliceError> for Error {
    fn from(e: std::array::TryFromSliceError) -> Error {
        Error::Decode(format!("{e}"))
    }
}

/// A trait all sample types must implement.
pub trait Sample {
    /// The type of the sample.
    type Type;

    /// The serialized size of one sample.
    fn size() -> usize;

    /// Parse one sample.
    fn parse(data: &[u8]) -> Result<Self::Type>;

    /// Serialize one sample.
    fn serialize(&self) -> Vec<u8>;
}

impl Sample for Complex {
    type Type = Complex;
    fn size() -> usize {
        std::mem::size_of::<Self>()
    }
    fn parse(data: &[u8]) -> Result<Self::Type> {
        if data.len() != Self::size() {
            return Err(Error::Decode("wrong size for Complex sample".into()));
        }
        let i = Float::from_le_bytes(data[0..Self::size() / 2].try_into()?);
        let q = Float::from_le_bytes(data[Self::size() / 2..].try_into()?);
        Ok(Complex::new(i, q))
    }
    fn serialize(&self) -> Vec<u8> {
        let mut ret = Vec::new();
        ret.extend(Float::to_le_bytes(self.re));
        ret.extend(Float::to_le_bytes(self.im));
        ret
    }
}

impl Sample for Float {
    type Type = Float;
    fn size() -> usize {
        std::mem::size_of::<Self>()
    }
    fn parse(data: &[u8]) -> Result<Self::Type> {
        if data.len() != Self::size() {
            return Err(Error::Decode("wrong size for Float sample".into()));
        }
        Ok(Float::from_le_bytes(data[0..Self::size()].try_into()?))
    }
    fn serialize(&self) -> Vec<u8> {
        Float::to_le_bytes(*self).to_vec()
    }
}

impl Sample for u8 {
    type Type = u8;
    fn size() -> usize {
        std::mem::size_of::<Self>()
    }
    fn parse(data: &[u8]) -> Result<Self::Type> {
        if data.len() != Self::size() {
            return Err(Error::Decode("wrong size for u8 sample".into()));
        }
        Ok(data[0])
    }
    fn serialize(&self) -> Vec<u8> {
        vec![*self]
    }
}

impl Sample for u32 {
    type Type = u32;
    fn size() -> usize {
        4
    }
    fn parse(data: &[u8]) -> Result<Self::Type> {
        if data.len() != Self::size() {
            return Err(Error::Decode("wrong size for u32 sample".into()));
        }
        Ok(u32::from_le_bytes(data[0..Self::size()].try_into()?))
    }
    fn serialize(&self) -> Vec<u8> {
        u32::to_le_bytes(*self).to_vec()
    }
}

/// Trivial trait for types that have .len().
#[allow(clippy::len_without_is_empty)]
pub trait Len {
    /// Get the length.
    fn len(&self) -> usize;
}
impl<T> Len for Vec<T> {
    fn len(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
pub mod tests {
    //! Test helper functions.
    use super::*;

    /// For testing, assert that two slices are almost equal.
    ///
    /// Floating point numbers are almost never exactly equal.
    pub fn assert_almost_equal_complex(left: &[Complex], right: &[Complex]) {
        assert_eq!(
            left.len(),
            right.len(),
            "\nleft: {:?}\nright: {:?}",
            left,
            right
        );
        for i in 0..left.len() {
            let dist = (left[i] - right[i]).norm_sqr().sqrt();
            if dist > 0.001 {
                assert_eq!(
                    left[i], right[i],
                    "\nElement {i}:\nleft: {:?}\nright: {:?}",
                    left, right
                );
            }
        }
    }

    /// For testing, assert that two slices are almost equal.
    ///
    /// Floating point numbers are almost never exactly equal.
    pub fn assert_almost_equal_float(left: &[Float], right: &[Float]) {
        assert_eq!(
            left.len(),
            right.len(),
            "\nleft: {:?}\nright: {:?}",
            left,
            right
        );
        for i in 0..left.len() {
            let dist = (left[i] - right[i]).abs();
            if dist > 0.001 {
                assert_eq!(left[i], right[i], "\nleft: {:?}\nright: {:?}", left, right);
            }
        }
    }
}
