/*! PDU writer.

Writes received PDUs to a directory, with files named after receive time.
*/
use log::debug;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::block::{Block, BlockName, BlockRet};
use crate::stream::NCReadStream;
use crate::Result;

/** PDU writer.

Takes PDUs (as `Vec<u8>`) and writes each one to a file in an output
directory, named as microseconds since epoch.
*/
pub struct PduWriter {
    src: NCReadStream<Vec<u8>>,
    dir: PathBuf,
}

impl PduWriter {
    /// Create a new PduWriter that writes to `dir`.
    #[must_use]
    pub fn new(src: NCReadStream<Vec<u8>>, dir: PathBuf) -> Self {
        Self { src, dir }
    }
}

impl BlockName for PduWriter {
    fn block_name(&self) -> &str {
        "PduWriter"
    }
}

impl Block for PduWriter {
    fn work(&mut self) -> Result<BlockRet> {
        match self.src.pop() {
            Some((packet, _tags)) => {
                let name = SystemTime::now()
                    .duration_since(SystemTime::UNIX_EPOCH)
                    .expect("time went backwards")
                    .as_micros()
                    .to_string();
                let full = Path::new(&self.dir).join(name);
                debug!("Saving PDU to {full:?}");
                let mut f = std::fs::File::create(full)?;
                f.write_all(&packet)?;
                Ok(BlockRet::Ok)
            }
            None => Ok(BlockRet::Noop),
        }
    }
}
