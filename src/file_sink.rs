//! Send a stream to a raw file.
use std::io::BufWriter;
use std::io::Write;

use log::debug;

use crate::block::{Block, BlockName, BlockRet};
use crate::stream::{NCReadStream, ReadStream};
use crate::{Result, Sample};

/// File write mode.
pub enum Mode {
    /// Create a new file. Fail if the file already exists.
    Create,

    /// Overwrite an existing file, or create a new one if it doesn't exist.
    Overwrite,

    /// Append to an existing file, or create a new one if it doesn't exist.
    Append,
}

fn open(filename: &std::path::Path, mode: Mode) -> Result<BufWriter<std::fs::File>> {
    debug!("Opening sink {}", filename.display());
    Ok(BufWriter::new(match mode {
        Mode::Create => std::fs::File::options()
            .read(false)
            .write(true)
            .create_new(true)
            .open(filename)?,
        Mode::Overwrite => std::fs::File::create(filename)?,
        Mode::Append => std::fs::File::options()
            .read(false)
            .append(true)
            .open(filename)?,
    }))
}

/// Send a stream to a raw file, one serialized sample at a time.
pub struct FileSink<T: Copy> {
    f: BufWriter<std::fs::File>,
    src: ReadStream<T>,
}

impl<T: Copy> FileSink<T> {
    /// Create a new FileSink block.
    pub fn new(src: ReadStream<T>, filename: std::path::PathBuf, mode: Mode) -> Result<Self> {
        Ok(Self {
            f: open(&filename, mode)?,
            src,
        })
    }

    /// Flush the write buffer.
    pub fn flush(&mut self) -> Result<()> {
        Ok(self.f.flush()?)
    }
}

impl<T> BlockName for FileSink<T>
where
    T: Copy + Sample<Type = T> + std::fmt::Debug,
{
    fn block_name(&self) -> &str {
        "FileSink"
    }
}
impl<T> Block for FileSink<T>
where
    T: Copy + Sample<Type = T> + std::fmt::Debug,
{
    fn work(&mut self) -> Result<BlockRet> {
        let (i, _tags) = self.src.read_buf()?;
        let n = i.len();
        if n == 0 {
            return Ok(BlockRet::Noop);
        }
        let mut v = Vec::with_capacity(T::size() * n);
        i.iter().for_each(|s: &T| {
            v.extend(&s.serialize());
        });
        self.f.write_all(&v)?;
        self.f.flush()?;
        i.consume(n);
        Ok(BlockRet::Ok)
    }
}

/// Send a stream of non-`Copy` values (e.g. PDUs) to a raw file, newline
/// delimited.
pub struct NoCopyFileSink<T> {
    f: BufWriter<std::fs::File>,
    src: NCReadStream<T>,
}

impl<T> NoCopyFileSink<T> {
    /// Create a new NoCopyFileSink block.
    pub fn new(src: NCReadStream<T>, filename: std::path::PathBuf, mode: Mode) -> Result<Self> {
        Ok(Self {
            f: open(&filename, mode)?,
            src,
        })
    }

    /// Flush the write buffer.
    pub fn flush(&mut self) -> Result<()> {
        Ok(self.f.flush()?)
    }
}

impl<T> BlockName for NoCopyFileSink<T>
where
    T: Sample<Type = T> + std::fmt::Debug,
{
    fn block_name(&self) -> &str {
        "NoCopyFileSink"
    }
}
impl<T> Block for NoCopyFileSink<T>
where
    T: Sample<Type = T> + std::fmt::Debug,
{
    fn work(&mut self) -> Result<BlockRet> {
        if let Some((s, _tags)) = self.src.pop() {
            let mut v = s.serialize();
            v.push(b'\n');
            self.f.write_all(&v)?;
            self.f.flush()?;
            Ok(BlockRet::Ok)
        } else {
            Ok(BlockRet::Noop)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::ReadStream as RS;
    use crate::{Complex, Float};

    fn scratch_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("rustradio-test-{}-{name}", std::process::id()))
    }

    #[test]
    fn sink_f32() -> Result<()> {
        let tmpfn = scratch_path("f32.bin");
        {
            #[allow(clippy::approx_constant)]
            let src: ReadStream<Float> = RS::from_slice(&[1.0, 3.0, 3.14, -3.14]);
            let mut sink = FileSink::<Float>::new(src, tmpfn.clone(), Mode::Overwrite)?;
            sink.work()?;
            sink.flush()?;
        }
        let out = std::fs::read(&tmpfn)?;
        std::fs::remove_file(&tmpfn).ok();
        assert_eq!(
            out,
            vec![0, 0, 128, 63, 0, 0, 64, 64, 195, 245, 72, 64, 195, 245, 72, 192]
        );
        Ok(())
    }

    #[test]
    fn sink_c32() -> Result<()> {
        let tmpfn = scratch_path("c32.bin");
        {
            #[allow(clippy::approx_constant)]
            let src: ReadStream<Complex> =
                RS::from_slice(&[Complex::new(0.0, 0.0), Complex::new(3.14, -2.7)]);
            let mut sink = FileSink::<Complex>::new(src, tmpfn.clone(), Mode::Overwrite)?;
            sink.work()?;
            sink.flush()?;
        }
        let out = std::fs::read(&tmpfn)?;
        std::fs::remove_file(&tmpfn).ok();
        assert_eq!(
            out,
            vec![0, 0, 0, 0, 0, 0, 0, 0, 195, 245, 72, 64, 205, 204, 44, 192]
        );
        Ok(())
    }
}
