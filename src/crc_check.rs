/*! Verify and strip a CRC trailer from each packet. */
use log::warn;

use crate::Result;
use crate::block::{Block, BlockName, BlockRet};
use crate::crc::Crc;
use crate::stream::{NCReadStream, NCWriteStream};

/// Verifies the trailing CRC-32/MPEG-2 of each packet. Packets that fail the
/// check, or that are too short to contain one, are silently dropped.
pub struct CrcCheck {
    src: NCReadStream<Vec<u8>>,
    dst: NCWriteStream<Vec<u8>>,
    keep_crc: bool,
}

const CRC_BYTES: usize = 4;

impl CrcCheck {
    /// Create a new CRC-check block. If `keep_crc` is false, the trailing
    /// CRC bytes are stripped from packets that pass.
    #[must_use]
    pub fn new(src: NCReadStream<Vec<u8>>, keep_crc: bool) -> (Self, NCReadStream<Vec<u8>>) {
        let (dst, dst_out) = NCWriteStream::new();
        (
            Self {
                src,
                dst,
                keep_crc,
            },
            dst_out,
        )
    }
}

impl BlockName for CrcCheck {
    fn block_name(&self) -> &str {
        "CrcCheck"
    }
}

impl Block for CrcCheck {
    fn work(&mut self) -> Result<BlockRet> {
        let Some((packet, tags)) = self.src.pop() else {
            return Ok(BlockRet::Noop);
        };
        if packet.len() < CRC_BYTES + 1 {
            warn!("CrcCheck: dropping packet shorter than CRC field ({})", packet.len());
            return Ok(BlockRet::Ok);
        }
        let split = packet.len() - CRC_BYTES;
        let want = Crc::crc32_mpeg2().checksum(&packet[..split]);
        let got = packet[split..]
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64);
        if got != want {
            warn!("CrcCheck: CRC mismatch, dropping packet");
            return Ok(BlockRet::Ok);
        }
        let out = if self.keep_crc {
            packet
        } else {
            packet[..split].to_vec()
        };
        self.dst.push(out, tags);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::NCWriteStream;

    #[test]
    fn passes_valid_packet() -> Result<()> {
        let (src_in, src_out) = NCWriteStream::new();
        let mut packet = vec![0u8; 10];
        packet.extend([0x86, 0x4D, 0x7F, 0x99]);
        src_in.push(packet, vec![]);
        let (mut b, out) = CrcCheck::new(src_out, false);
        b.work()?;
        let (got, _) = out.pop().unwrap();
        assert_eq!(got, vec![0u8; 10]);
        Ok(())
    }

    #[test]
    fn drops_corrupted_packet() -> Result<()> {
        let (src_in, src_out) = NCWriteStream::new();
        let mut packet = vec![0u8; 10];
        packet.extend([0x00, 0x00, 0x00, 0x00]);
        src_in.push(packet, vec![]);
        let (mut b, out) = CrcCheck::new(src_out, false);
        b.work()?;
        assert!(out.pop().is_none());
        Ok(())
    }

    #[test]
    fn drops_too_short_packet() -> Result<()> {
        let (src_in, src_out) = NCWriteStream::new();
        src_in.push(vec![1, 2, 3], vec![]);
        let (mut b, out) = CrcCheck::new(src_out, false);
        b.work()?;
        assert!(out.pop().is_none());
        Ok(())
    }
}
