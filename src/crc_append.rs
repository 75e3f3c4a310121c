/*! Append a CRC trailer to each packet. */
use crate::Result;
use crate::block::{Block, BlockName};
use crate::crc::Crc;
use crate::stream::{NCReadStream, NCWriteStream};

/// Appends a CRC-32/MPEG-2 trailer (MSB-first) to every packet. An optional
/// `skip_header_bytes` prefix is copied through unchanged but excluded from
/// the CRC calculation.
pub struct CrcAppend {
    src: NCReadStream<Vec<u8>>,
    dst: NCWriteStream<Vec<u8>>,
    skip_header_bytes: usize,
}

impl CrcAppend {
    /// Create a new CRC-append block.
    #[must_use]
    pub fn new(src: NCReadStream<Vec<u8>>, skip_header_bytes: usize) -> (Self, NCReadStream<Vec<u8>>) {
        let (dst, dst_out) = NCWriteStream::new();
        (
            Self {
                src,
                dst,
                skip_header_bytes,
            },
            dst_out,
        )
    }
}

impl BlockName for CrcAppend {
    fn block_name(&self) -> &str {
        "CrcAppend"
    }
}

impl Block for CrcAppend {
    fn work(&mut self) -> Result<crate::block::BlockRet> {
        use crate::block::BlockRet;
        let Some((mut packet, tags)) = self.src.pop() else {
            return Ok(BlockRet::Noop);
        };
        let skip = self.skip_header_bytes.min(packet.len());
        let crc = Crc::crc32_mpeg2().checksum(&packet[skip..]);
        let bytes = (0..4).rev().map(|i| ((crc >> (8 * i)) & 0xff) as u8);
        packet.extend(bytes);
        self.dst.push(packet, tags);
        Ok(BlockRet::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::NCWriteStream;

    #[test]
    fn appends_ten_zero_bytes_crc() -> Result<()> {
        let (src_in, src_out) = NCWriteStream::new();
        src_in.push(vec![0u8; 10], vec![]);
        let (mut b, out) = CrcAppend::new(src_out, 0);
        b.work()?;
        let (got, _) = out.pop().unwrap();
        assert_eq!(got.len(), 14);
        assert_eq!(&got[10..], &[0x86, 0x4D, 0x7F, 0x99]);
        Ok(())
    }
}
