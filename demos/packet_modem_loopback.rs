/*! Builds the transmit and receive pipelines and runs a handful of random
packets through them back to back, over an in-memory stream instead of a
real radio. Reports how many packets made it through CRC-checked, matching
the teacher's own small, single-purpose demo binaries.
*/
use clap::Parser;
use rand::Rng;

use rustradio::Result;
use rustradio::Value;
use rustradio::block::{Block, BlockName, BlockRet};
use rustradio::graph::{Graph, GraphRunner};
use rustradio::pipeline::{RxSettings, TxSettings, build_rx_pipeline, build_tx_pipeline};
use rustradio::stream::{NCReadStream, Tag, new_stream};

#[derive(Parser, Debug)]
struct Opt {
    /// Number of packets to send.
    #[arg(long, default_value_t = 5)]
    packets: usize,

    /// Payload size of each packet, in bytes.
    #[arg(long, default_value_t = 64)]
    packet_len: usize,

    /// Verbosity (repeat for more).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Drains decoded PDUs and compares them against the packets that were sent.
struct Checker {
    src: NCReadStream<Vec<u8>>,
    expected: Vec<Vec<u8>>,
    matched: usize,
}

impl BlockName for Checker {
    fn block_name(&self) -> &str {
        "Checker"
    }
}

impl Block for Checker {
    fn work(&mut self) -> Result<BlockRet> {
        let Some((pdu, _tags)) = self.src.pop() else {
            return Ok(BlockRet::Noop);
        };
        let ok = self.expected.iter().any(|p| p == &pdu);
        if ok {
            self.matched += 1;
        }
        log::info!(
            "decoded packet: {} bytes, matches a sent packet: {ok}",
            pdu.len()
        );
        Ok(BlockRet::Ok)
    }
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    stderrlog::new()
        .module(module_path!())
        .verbosity(usize::from(opt.verbose) + 2)
        .init()
        .unwrap();

    let mut rng = rand::rng();
    let packets: Vec<Vec<u8>> = (0..opt.packets)
        .map(|_| (0..opt.packet_len).map(|_| rng.random()).collect())
        .collect();

    let (tun_in, tun_out) = new_stream::<u8>();
    {
        let mut w = tun_in.write_buf()?;
        let mut pos = 0;
        for pkt in &packets {
            w.slice()[pos..pos + pkt.len()].copy_from_slice(pkt);
            pos += pkt.len();
        }
        let tags: Vec<Tag> = {
            let mut pos = 0;
            packets
                .iter()
                .map(|pkt| {
                    let tag = Tag::new(pos, "packet_len", Value::U64(pkt.len() as u64));
                    pos += pkt.len();
                    tag
                })
                .collect()
        };
        w.produce(pos, &tags);
    }
    drop(tun_in);

    let mut graph = Graph::new();

    let (tx_out, _tx_rate) = build_tx_pipeline(&mut graph, tun_out, &TxSettings::default())?;
    let (decoded, count_msgs, _rx_rate) = build_rx_pipeline(&mut graph, tx_out, &RxSettings::default())?;

    graph.add(Box::new(Checker {
        src: decoded,
        expected: packets.clone(),
        matched: 0,
    }));

    graph.run()?;

    let mut packet_count = 0u64;
    while let Some((msg, _tags)) = count_msgs.pop() {
        if let Some(Value::U64(n)) = msg.get("packet_count") {
            packet_count = *n;
        }
    }
    log::info!(
        "sent {} packets, packet counter saw {packet_count}",
        packets.len()
    );
    Ok(())
}
