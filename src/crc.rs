/*! Generic table-driven CRC engine.

Parameterized the way most CRC implementations are: bit width, generator
polynomial, initial register, final XOR, and input/output bit reflection.
Construction precomputes a 256-entry table; samples are then folded in one
byte at a time.
*/

/// A table-driven CRC calculator.
#[derive(Clone)]
pub struct Crc {
    width: u32,
    poly: u64,
    init: u64,
    xorout: u64,
    refin: bool,
    refout: bool,
    table: [u64; 256],
    reg: u64,
}

fn reflect(mut v: u64, bits: u32) -> u64 {
    let mut r = 0u64;
    for _ in 0..bits {
        r = (r << 1) | (v & 1);
        v >>= 1;
    }
    r
}

impl Crc {
    /// Build a new CRC engine. `width` must be a multiple of 8, in `8..=64`.
    pub fn new(width: u32, poly: u64, init: u64, xorout: u64, refin: bool, refout: bool) -> Self {
        assert!(width % 8 == 0 && (8..=64).contains(&width), "bad CRC width");
        let top_bit = 1u64 << (width - 1);
        let mask = if width == 64 {
            u64::MAX
        } else {
            (1u64 << width) - 1
        };
        let mut table = [0u64; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let mut crc = (i as u64) << (width - 8);
            for _ in 0..8 {
                if crc & top_bit != 0 {
                    crc = (crc << 1) ^ poly;
                } else {
                    crc <<= 1;
                }
            }
            *entry = crc & mask;
        }
        Self {
            width,
            poly,
            init,
            xorout,
            refin,
            refout,
            table,
            reg: init,
        }
    }

    /// CRC-32/MPEG-2, used for the payload trailer: poly `0x04C11DB7`, init
    /// and final XOR both `0xFFFFFFFF`, input and output reflected.
    pub fn crc32_mpeg2() -> Self {
        Self::new(32, 0x04C1_1DB7, 0xFFFF_FFFF, 0xFFFF_FFFF, true, true)
    }

    /// Reset the running register to `init`.
    pub fn reset(&mut self) {
        self.reg = self.init;
    }

    /// Fold more bytes into the running register.
    pub fn update(&mut self, data: &[u8]) {
        let mask = if self.width == 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        };
        for &byte in data {
            let b = if self.refin {
                reflect(byte as u64, 8)
            } else {
                byte as u64
            };
            let top = self.reg >> (self.width - 8);
            let idx = ((top ^ b) & 0xff) as usize;
            self.reg = ((self.reg << 8) ^ self.table[idx]) & mask;
        }
    }

    /// Compute the final CRC value, applying reflection and the XOR-out mask.
    /// Does not consume `self`, so the engine can keep accumulating.
    pub fn finalize(&self) -> u64 {
        let mask = if self.width == 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        };
        let v = if self.refout {
            reflect(self.reg, self.width)
        } else {
            self.reg
        };
        (v ^ self.xorout) & mask
    }

    /// One-shot convenience: compute the CRC of `data` from a fresh register.
    pub fn checksum(&self, data: &[u8]) -> u64 {
        let mut c = self.clone();
        c.reset();
        c.update(data);
        c.finalize()
    }

    /// Number of bytes the finalized CRC occupies on the wire.
    pub fn byte_len(&self) -> usize {
        (self.width as usize) / 8
    }

    /// Serialize the finalized value as `byte_len()` bytes, MSB-first.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        let v = self.finalize();
        let n = self.byte_len();
        (0..n)
            .rev()
            .map(|i| ((v >> (8 * i)) & 0xff) as u8)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_mpeg2_of_ten_zero_bytes() {
        let crc = Crc::crc32_mpeg2();
        let data = [0u8; 10];
        assert_eq!(crc.checksum(&data), 0xE38A_6876);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let data = b"hello world, this is a test vector";
        let one_shot = Crc::crc32_mpeg2().checksum(data);
        let mut c = Crc::crc32_mpeg2();
        c.update(&data[..10]);
        c.update(&data[10..]);
        assert_eq!(c.finalize(), one_shot);
    }
}
