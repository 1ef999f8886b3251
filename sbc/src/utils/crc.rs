//! CRC validation utilities for SBC frames.
//!
//! The frame check sequence is a CRC-8 with polynomial x^8 + x^4 + x^3 + x^2 + 1,
//! processed MSB first, seeded with `0x0F` and without a final xor. It covers
//! header bytes 1 and 2, the joint-stereo bitmap and every scale factor, so the
//! covered region can end in the middle of a byte.

/// CRC algorithm specification with polynomial and initial value.
pub struct Algorithm<T> {
    poly: T,
    init: T,
}

/// CRC-8 algorithm protecting the frame header and scale factors.
pub const CRC_FRAME_HEADER_ALG: Algorithm<u8> = Algorithm {
    poly: 0x1d,
    init: 0x0f,
};

/// Shifts `len` zero bits through a CRC-8 register.
#[inline(always)]
pub const fn crc8(poly: u8, mut value: u8, len: usize) -> u8 {
    let mut i = 0;
    while i < len {
        value = (value << 1) ^ (((value >> 7) & 1) * poly);
        i += 1;
    }

    value
}

#[inline(always)]
const fn crc8_table(poly: u8) -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < table.len() {
        table[i] = crc8(poly, i as u8, 8);
        i += 1;
    }

    table
}

#[derive(Debug)]
pub struct Crc8 {
    pub poly: u8,
    pub init: u8,
    table: [u8; 256],
}

impl Crc8 {
    pub const fn new(algorithm: &Algorithm<u8>) -> Self {
        Self {
            poly: algorithm.poly,
            init: algorithm.init,
            table: crc8_table(algorithm.poly),
        }
    }

    const fn table_entry(&self, index: u8) -> u8 {
        self.table[index as usize]
    }

    /// Feeds whole bytes into the register.
    #[inline(always)]
    pub const fn update(&self, mut crc: u8, bytes: &[u8]) -> u8 {
        let mut i = 0;

        while i < bytes.len() {
            crc = self.table_entry(crc ^ bytes[i]);
            i += 1;
        }

        crc
    }

    /// Feeds the `len` most significant bits of `value`, MSB first.
    #[inline(always)]
    pub const fn update_bits(&self, mut crc: u8, value: u8, len: u32) -> u8 {
        let mut i = 0;
        while i < len {
            let bit = ((value >> (7 - i)) & 1) ^ (crc >> 7);
            crc = (crc << 1) ^ (bit * self.poly);
            i += 1;
        }

        crc
    }
}

/// Shared instance used by the frame codec.
pub static FRAME_CRC: Crc8 = Crc8::new(&CRC_FRAME_HEADER_ALG);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_reference_values() {
        let crc = Crc8::new(&CRC_FRAME_HEADER_ALG);
        assert_eq!(crc.table_entry(0x00), 0x00);
        assert_eq!(crc.table_entry(0x01), 0x1d);
        assert_eq!(crc.table_entry(0x02), 0x3a);
        assert_eq!(crc.table_entry(0x03), 0x27);
        assert_eq!(crc.table_entry(0x0c), 0x9c);
        assert_eq!(crc.table_entry(0xff), 0xc4);
    }

    #[test]
    fn bitwise_update_agrees_with_table() {
        let crc = &FRAME_CRC;
        for byte in [0x00u8, 0x5a, 0x9c, 0xff, 0x31] {
            let by_table = crc.update(crc.init, &[byte]);
            let by_bits = crc.update_bits(crc.init, byte, 8);
            assert_eq!(by_table, by_bits);

            let split = crc.update_bits(crc.update_bits(crc.init, byte, 4), byte << 4, 4);
            assert_eq!(by_table, split);
        }
    }

    #[test]
    fn nibble_update_ignores_low_bits() {
        let crc = &FRAME_CRC;
        assert_eq!(crc.update_bits(0x42, 0xa0, 4), crc.update_bits(0x42, 0xaf, 4));
    }
}
