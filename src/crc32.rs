//! Reflected CRC-32 (poly 0xEDB88320) over a byte sequence.
//!
//! This is the exact variant OPUP frames use: init 0xFFFFFFFF, final xor
//! 0xFFFFFFFF, little-endian on the wire. The table is built once and is
//! immutable and shareable across sessions in one process.

const POLY: u32 = 0xEDB8_8320;

/// A precomputed CRC-32 lookup table.
#[derive(Debug, Clone)]
pub struct Crc32Table {
    table: [u32; 256],
}

impl Crc32Table {
    /// Builds the table by reducing each byte value through eight rounds of
    /// the reflected polynomial.
    pub fn new() -> Self {
        let mut table = [0u32; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            let mut crc = i as u32;
            for _ in 0..8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ POLY
                } else {
                    crc >> 1
                };
            }
            *slot = crc;
        }
        Self { table }
    }

    /// Computes the CRC-32 of `data`.
    pub fn compute(&self, data: &[u8]) -> u32 {
        let mut crc = 0xFFFF_FFFFu32;
        for &byte in data {
            let idx = ((crc ^ byte as u32) & 0xFF) as usize;
            crc = self.table[idx] ^ (crc >> 8);
        }
        crc ^ 0xFFFF_FFFF
    }
}

impl Default for Crc32Table {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        let table = Crc32Table::new();
        let crc = table.compute(&[0xA5, 0x01, 0x01, 0x00, 0x00, 0x00]);
        assert_eq!(crc, 0x7dcf_6f2b);
        let again = Crc32Table::new();
        assert_eq!(crc, again.compute(&[0xA5, 0x01, 0x01, 0x00, 0x00, 0x00]));
    }

    #[test]
    fn empty_input() {
        let table = Crc32Table::new();
        assert_eq!(table.compute(&[]), 0x0000_0000 ^ 0xFFFF_FFFF ^ 0xFFFF_FFFF);
    }

    #[test]
    fn matches_reference_crc32_of_check_string() {
        // Standard "123456789" CRC-32/ISO-HDLC check value, per the usual
        // reflected poly 0xEDB88320 convention.
        let table = Crc32Table::new();
        assert_eq!(table.compute(b"123456789"), 0xCBF4_3926);
    }
}
