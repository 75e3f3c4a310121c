/*! Pipeline construction: wires the block library in this crate into the
two standard graphs for the packet-modem waveform, transmit and receive.
See the crate-level docs for the high-level picture; this module is the
concrete wiring, following the 10-step transmit chain and the
synchronization-plus-framing receive chain.

A handful of small glue blocks live here rather than in their own modules,
since they only exist to make this particular wiring work (a constant PDU
source for the syncword bits, a PDU re-tagger, and a message-channel
forwarder that closes the feedback loop from the header parser back to
[`crate::payload_metadata_insert::PayloadMetadataInsert`]).
*/
use crate::Complex;
use crate::Float;
use crate::Result;
use crate::Value;
use crate::block::{Block, BlockName, BlockRet};
use crate::blocks::{
    AdditiveScrambler, BurstShaper, CoarseFreq, CostasLoop, CrcAppend, CrcCheck,
    HeaderFecDecoder, HeaderFecEncoder, HeaderFormatter, HeaderParser, HeaderPayloadSplit,
    InterpolatingFir, LlrDecoder, Mapper, PackBits, PacketCounter, PacketIngress, PacketMux,
    PacketToStream, PayloadMetadataInsert, PduToStream, ProbeRate, SoftDescrambler, SymbolFilter,
    SyncwordDetection, SyncwordWipeoff, Tee, UnpackBits,
};
use crate::graph::GraphRunner;
use crate::message::Message;
use crate::stream::{NCReadStream, NCWriteStream, ReadStream, Tag};
use crate::unpack_bits::Endianness;

/// The 32-bit syncword named in the framing format, zero-extended to 64
/// bits (the correlator and wipe-off both want a fixed bit count, and a
/// longer sequence gives the detector more processing gain).
pub const SYNCWORD_BITS: u64 = 0x1ACF_FC1D;
/// Syncword length in bits.
pub const SYNCWORD_LEN: u32 = 64;
/// Header codeword length in QPSK symbols: 32 codeword bytes, 2 bits/symbol.
pub const HEADER_SYMBOLS: usize = 128;

/// Transmit-side tunables.
#[derive(Clone, Debug)]
pub struct TxSettings {
    /// Samples per symbol at the channel output.
    pub samples_per_symbol: usize,
    /// RRC filter span, in symbol periods.
    pub rrc_span_symbols: usize,
    /// RRC excess-bandwidth (roll-off) factor.
    pub rolloff: Float,
    /// If true, shape burst edges and zero-fill the channel between
    /// packets (bursty mode). If false, hand bursts to the channel
    /// back-to-back with no shaping or idle gating (stream mode).
    pub bursty: bool,
}

impl Default for TxSettings {
    fn default() -> Self {
        Self {
            samples_per_symbol: 4,
            rrc_span_symbols: 11,
            rolloff: 0.35,
            bursty: true,
        }
    }
}

/// Receive-side tunables.
#[derive(Clone, Debug)]
pub struct RxSettings {
    /// Samples per symbol expected on the input.
    pub samples_per_symbol: usize,
    /// RRC filter span, in symbol periods; must match the transmitter's.
    pub rrc_span_symbols: usize,
    /// RRC excess-bandwidth (roll-off) factor; must match the transmitter's.
    pub rolloff: Float,
    /// Number of polyphase arms in the symbol timing filter.
    pub symbol_filter_arms: usize,
    /// FFT length used by the syncword correlator.
    pub fft_size: usize,
    /// Half-width, in samples, of the correlator's peak declaration window.
    pub syncword_time_threshold: usize,
    /// Power ratio a candidate peak's neighbors must fall under to resolve.
    pub syncword_power_threshold: Float,
    /// Minimum frequency-offset hypothesis bin searched by the correlator.
    pub min_freq_bin: i32,
    /// Maximum frequency-offset hypothesis bin searched by the correlator.
    pub max_freq_bin: i32,
    /// Costas loop one-sided normalized loop bandwidth, `B_L * T`.
    pub costas_bandwidth: Float,
    /// Assumed noise standard deviation, for LLR scaling.
    pub noise_sigma: Float,
}

impl Default for RxSettings {
    fn default() -> Self {
        Self {
            samples_per_symbol: 4,
            rrc_span_symbols: 11,
            rolloff: 0.35,
            symbol_filter_arms: 32,
            fft_size: 1024,
            syncword_time_threshold: 50,
            syncword_power_threshold: 4.0,
            min_freq_bin: -64,
            max_freq_bin: 64,
            costas_bandwidth: 0.01,
            noise_sigma: 1.0,
        }
    }
}

/// A constant-PDU source: republishes the same payload every time there's
/// room for it downstream. Used to prefix the syncword bit pattern onto
/// every transmitted frame via [`PacketMux`].
struct ConstPduSource<T: Clone + Send + Sync + 'static> {
    dst: NCWriteStream<Vec<T>>,
    value: Vec<T>,
}

impl<T: Clone + Send + Sync + 'static> ConstPduSource<T> {
    fn new(value: Vec<T>) -> (Self, NCReadStream<Vec<T>>) {
        let (dst, dst_out) = NCWriteStream::new();
        (Self { dst, value }, dst_out)
    }
}

impl<T: Clone + Send + Sync + 'static> BlockName for ConstPduSource<T> {
    fn block_name(&self) -> &str {
        "ConstPduSource"
    }
}

impl<T: Clone + Send + Sync + 'static> Block for ConstPduSource<T> {
    fn work(&mut self) -> Result<BlockRet> {
        if self.dst.remaining() == 0 {
            return Ok(BlockRet::OutputFull);
        }
        self.dst.push(self.value.clone(), vec![]);
        Ok(BlockRet::Ok)
    }
}

/// Re-tags a PDU with a `packet_len` tag matching its own length, replacing
/// any stale tag of the same name accumulated from upstream framing. Used
/// right before the burst is announced on a continuous stream, so
/// [`PacketToStream`] can gate on the true burst length.
struct FrameLenTag<T: Clone + Send + Sync + 'static> {
    src: NCReadStream<Vec<T>>,
    dst: NCWriteStream<Vec<T>>,
}

impl<T: Clone + Send + Sync + 'static> FrameLenTag<T> {
    fn new(src: NCReadStream<Vec<T>>) -> (Self, NCReadStream<Vec<T>>) {
        let (dst, dst_out) = NCWriteStream::new();
        (Self { src, dst }, dst_out)
    }
}

impl<T: Clone + Send + Sync + 'static> BlockName for FrameLenTag<T> {
    fn block_name(&self) -> &str {
        "FrameLenTag"
    }
}

impl<T: Clone + Send + Sync + 'static> Block for FrameLenTag<T> {
    fn work(&mut self) -> Result<BlockRet> {
        let Some((pdu, tags)) = self.src.pop() else {
            return Ok(BlockRet::Noop);
        };
        let len = pdu.len() as u64;
        let mut tags: Vec<Tag> = tags.into_iter().filter(|t| t.key() != "packet_len").collect();
        tags.push(Tag::new(0, "packet_len", Value::U64(len)));
        self.dst.push(pdu, tags);
        Ok(BlockRet::Ok)
    }
}

/// Forwards messages from one message channel onto an externally owned
/// writer. Closes the feedback loop from the header parser back to
/// [`PayloadMetadataInsert`], whose `parsed_header` input has to exist
/// before the blocks that eventually produce it are built.
struct MessageForward {
    src: NCReadStream<Message>,
    dst: NCWriteStream<Message>,
}

impl MessageForward {
    fn new(src: NCReadStream<Message>, dst: NCWriteStream<Message>) -> Self {
        Self { src, dst }
    }
}

impl BlockName for MessageForward {
    fn block_name(&self) -> &str {
        "MessageForward"
    }
}

impl Block for MessageForward {
    fn work(&mut self) -> Result<BlockRet> {
        let Some((msg, tags)) = self.src.pop() else {
            return Ok(BlockRet::Noop);
        };
        self.dst.push(msg, tags);
        Ok(BlockRet::Ok)
    }
}

/// Hard-slices a PDU of soft LLRs into one bit (`0u8`/`1u8`) per input
/// value. The PDU-granular counterpart of [`crate::binary_slicer`].
struct PduSlicer {
    src: NCReadStream<Vec<Float>>,
    dst: NCWriteStream<Vec<u8>>,
}

impl PduSlicer {
    fn new(src: NCReadStream<Vec<Float>>) -> (Self, NCReadStream<Vec<u8>>) {
        let (dst, dst_out) = NCWriteStream::new();
        (Self { src, dst }, dst_out)
    }
}

impl BlockName for PduSlicer {
    fn block_name(&self) -> &str {
        "PduSlicer"
    }
}

impl Block for PduSlicer {
    fn work(&mut self) -> Result<BlockRet> {
        let Some((llrs, tags)) = self.src.pop() else {
            return Ok(BlockRet::Noop);
        };
        let bits = llrs.iter().map(|&v| if v > 0.0 { 0u8 } else { 1u8 }).collect();
        self.dst.push(bits, tags);
        Ok(BlockRet::Ok)
    }
}

fn syncword_bits() -> Vec<u8> {
    (0..SYNCWORD_LEN)
        .map(|i| ((SYNCWORD_BITS >> (SYNCWORD_LEN - 1 - i)) & 1) as u8)
        .collect()
}

/// Build the transmit graph: ingress bytes in, a continuous complex-baseband
/// sample stream out, plus a rate-telemetry message stream.
///
/// `tun_bytes` must be a tagged stream where every packet's first byte
/// carries a `packet_len` tag, as produced by a TUN/PDU source upstream of
/// this pipeline (see [`crate::packet_ingress`]).
pub fn build_tx_pipeline<G: GraphRunner>(
    graph: &mut G,
    tun_bytes: ReadStream<u8>,
    settings: &TxSettings,
) -> Result<(ReadStream<Complex>, NCReadStream<Message>)> {
    let (ingress, payload_pdu, meta) = PacketIngress::new(tun_bytes);
    graph.add(Box::new(ingress));

    let (crc_append, payload_crc) = CrcAppend::new(payload_pdu, 0);
    graph.add(Box::new(crc_append));

    let (fmt, header_bytes) = HeaderFormatter::new(meta);
    graph.add(Box::new(fmt));
    let (hdr_fec, header_codeword) = HeaderFecEncoder::new(header_bytes);
    graph.add(Box::new(hdr_fec));

    let (mux1, framed_bytes) = PacketMux::new(vec![header_codeword, payload_crc]);
    graph.add(Box::new(mux1));

    let (scrambler, scrambled) = AdditiveScrambler::new(framed_bytes);
    graph.add(Box::new(scrambler));
    let (dibits, dibits_out) = UnpackBits::new(scrambled, 4, 2, Endianness::Msb);
    graph.add(Box::new(dibits));
    let (qpsk, frame_symbols) = Mapper::qpsk(dibits_out);
    graph.add(Box::new(qpsk));

    let (sync_src, sync_bits) = ConstPduSource::new(syncword_bits());
    graph.add(Box::new(sync_src));
    let (sync_bpsk, sync_symbols) = Mapper::bpsk(sync_bits);
    graph.add(Box::new(sync_bpsk));

    let (mux2, burst_symbols) = PacketMux::new(vec![sync_symbols, frame_symbols]);
    graph.add(Box::new(mux2));

    let taps = crate::rrc::rrc_taps(settings.samples_per_symbol, settings.rrc_span_symbols, settings.rolloff, 1.0);
    let (fir, shaped) = InterpolatingFir::new(burst_symbols, taps.clone(), settings.samples_per_symbol);
    graph.add(Box::new(fir));

    let final_pdus = if settings.bursty {
        let group_delay = crate::rrc::group_delay(taps.len());
        let edge_len = (4 * settings.samples_per_symbol + group_delay).max(1);
        let leading = BurstShaper::half_sine(edge_len);
        let mut trailing = leading.clone();
        trailing.reverse();
        let (shaper, shaped2) = BurstShaper::new(shaped, leading, trailing);
        graph.add(Box::new(shaper));
        let (retag, retagged) = FrameLenTag::new(shaped2);
        graph.add(Box::new(retag));
        retagged
    } else {
        shaped
    };

    let (p2s, continuous) = PduToStream::new(final_pdus);
    graph.add(Box::new(p2s));

    let out = if settings.bursty {
        let (gate, gated) = PacketToStream::new(continuous);
        graph.add(Box::new(gate));
        gated
    } else {
        continuous
    };

    let (tee, out_main, out_probe) = Tee::new(out);
    graph.add(Box::new(tee));
    let (probe, rate_msgs) = ProbeRate::new(out_probe, std::time::Duration::from_secs(1));
    graph.add(Box::new(probe));

    Ok((out_main, rate_msgs))
}

/// Build the receive graph: a continuous complex-baseband sample stream in,
/// decoded (and CRC-verified) payload byte PDUs out, plus packet-count and
/// rate-telemetry message streams.
///
/// The transmitter scrambles the muxed header codeword and payload as one
/// continuous LFSR run. The header and payload are demodulated as separate
/// PDUs here (each needs its own FEC/LLR context), so the payload
/// descrambler is seeded `HEADER_SYMBOLS * 2` bits into the LFSR sequence
/// (the header codeword's bit length) rather than reset to the seed, so it
/// picks up exactly where the header descrambler's run would have left off.
/// See `DESIGN.md`.
pub fn build_rx_pipeline<G: GraphRunner>(
    graph: &mut G,
    rf_in: ReadStream<Complex>,
    settings: &RxSettings,
) -> Result<(NCReadStream<Vec<u8>>, NCReadStream<Message>, NCReadStream<Message>)> {
    let (tee, rf_main, rf_probe) = Tee::new(rf_in);
    graph.add(Box::new(tee));
    let (probe, rate_msgs) = ProbeRate::new(rf_probe, std::time::Duration::from_secs(1));
    graph.add(Box::new(probe));

    let taps = crate::rrc::rrc_taps(settings.samples_per_symbol, settings.rrc_span_symbols, settings.rolloff, 1.0);
    let syncword_waveform =
        SyncwordDetection::modulate_syncword(SYNCWORD_BITS, SYNCWORD_LEN, settings.samples_per_symbol, &taps);

    let (detect, detect_out) = SyncwordDetection::new(
        rf_main,
        &syncword_waveform,
        settings.min_freq_bin,
        settings.max_freq_bin,
        settings.fft_size,
        settings.syncword_time_threshold,
        settings.syncword_power_threshold,
    );
    graph.add(Box::new(detect));

    let (cfreq, cfreq_out) = CoarseFreq::new(detect_out, 0);
    graph.add(Box::new(cfreq));

    let (symfilt, symbols) = SymbolFilter::new(
        cfreq_out,
        settings.samples_per_symbol,
        settings.symbol_filter_arms,
        settings.rrc_span_symbols,
        settings.rolloff,
    );
    graph.add(Box::new(symfilt));

    let (wipeoff, wiped) = SyncwordWipeoff::new(symbols, SYNCWORD_BITS, SYNCWORD_LEN);
    graph.add(Box::new(wipeoff));

    // `parsed_header` has to exist before PayloadMetadataInsert is built,
    // even though it's ultimately produced downstream of it; see
    // `MessageForward` above.
    let (parsed_header_tx, parsed_header_rx) = NCWriteStream::new();

    let (meta_insert, meta_out) = PayloadMetadataInsert::new(
        wiped,
        parsed_header_rx,
        SYNCWORD_LEN as usize,
        HEADER_SYMBOLS,
    );
    graph.add(Box::new(meta_insert));

    let (costas, costas_out) = CostasLoop::new(meta_out, settings.costas_bandwidth);
    graph.add(Box::new(costas));

    let (split, header_syms, payload_syms) = HeaderPayloadSplit::new(costas_out, HEADER_SYMBOLS);
    graph.add(Box::new(split));

    // Header branch.
    let (header_llr, header_llrs) = LlrDecoder::new(header_syms, "QPSK", settings.noise_sigma);
    graph.add(Box::new(header_llr));
    let (header_descr, header_descr_llrs) = SoftDescrambler::new(header_llrs);
    graph.add(Box::new(header_descr));
    let (header_fec, header_decoded) = HeaderFecDecoder::new(header_descr_llrs);
    graph.add(Box::new(header_fec));
    let (header_parse, parsed_header_out) = HeaderParser::new(header_decoded);
    graph.add(Box::new(header_parse));
    graph.add(Box::new(MessageForward::new(parsed_header_out, parsed_header_tx)));

    // Payload branch.
    let (payload_llr, payload_llrs) = LlrDecoder::new(payload_syms, "QPSK", settings.noise_sigma);
    graph.add(Box::new(payload_llr));
    let (payload_descr, payload_descr_llrs) =
        SoftDescrambler::with_bit_offset(payload_llrs, HEADER_SYMBOLS as u32 * 2);
    graph.add(Box::new(payload_descr));
    let (slicer, payload_bits) = PduSlicer::new(payload_descr_llrs);
    graph.add(Box::new(slicer));
    let (pack, payload_bytes) = PackBits::new(payload_bits, 8, 1, Endianness::Msb);
    graph.add(Box::new(pack));
    let (crc, checked) = CrcCheck::new(payload_bytes, false);
    graph.add(Box::new(crc));

    let (counter, decoded, count_msgs) = PacketCounter::new(checked);
    graph.add(Box::new(counter));

    Ok((decoded, count_msgs, rate_msgs))
}
