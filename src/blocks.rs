//! Convenient mod collecting all standard library blocks for import.
pub use crate::add::Add;
pub use crate::add_const::AddConst;
pub use crate::binary_slicer::BinarySlicer;
pub use crate::burst_shaper::BurstShaper;
pub use crate::canary::Canary;
pub use crate::coarse_freq::CoarseFreq;
pub use crate::complex_to_mag2::ComplexToMag2;
pub use crate::constant_source::ConstantSource;
pub use crate::convert::{FloatToComplex, FloatToU32, Map, MapBuilder};
pub use crate::costas_loop::CostasLoop;
pub use crate::crc_append::CrcAppend;
pub use crate::crc_check::CrcCheck;
pub use crate::debug_sink::DebugSink;
pub use crate::delay::Delay;
pub use crate::file_sink::{FileSink, NoCopyFileSink};
pub use crate::file_source::FileSource;
pub use crate::header_fec_decoder::HeaderFecDecoder;
pub use crate::header_fec_encoder::HeaderFecEncoder;
pub use crate::header_formatter::HeaderFormatter;
pub use crate::header_parser::HeaderParser;
pub use crate::header_payload_split::HeaderPayloadSplit;
pub use crate::llr_decoder::LlrDecoder;
pub use crate::mapper::Mapper;
pub use crate::multiply_const::MultiplyConst;
pub use crate::null_sink::NullSink;
pub use crate::pack_bits::PackBits;
pub use crate::packet_counter::PacketCounter;
pub use crate::packet_ingress::PacketIngress;
pub use crate::packet_mux::PacketMux;
pub use crate::packet_to_stream::PacketToStream;
pub use crate::payload_metadata_insert::PayloadMetadataInsert;
pub use crate::pdu_to_stream::PduToStream;
pub use crate::pdu_writer::PduWriter;
pub use crate::probe_rate::ProbeRate;
pub use crate::reader_source::ReaderSource;
pub use crate::rrc::InterpolatingFir;
pub use crate::scrambler::{AdditiveScrambler, SoftDescrambler};
pub use crate::signal_source::{SignalSourceComplex, SignalSourceFloat};
pub use crate::skip::Skip;
pub use crate::stream_to_pdu::StreamToPdu;
pub use crate::strobe::Strobe;
pub use crate::symbol_filter::SymbolFilter;
pub use crate::syncword_detection::SyncwordDetection;
pub use crate::syncword_wipeoff::SyncwordWipeoff;
pub use crate::tee::Tee;
pub use crate::throttle::Throttle;
pub use crate::unpack_bits::UnpackBits;
pub use crate::vec_to_stream::VecToStream;
pub use crate::vector_sink::VectorSink;
pub use crate::vector_source::{Repeat, VectorSource, VectorSourceBuilder};
pub use crate::window::Window;
pub use crate::writer_sink::WriterSink;
