//! CRC Engine.
//!
//! Computes the Mode S CRC-24 remainder and classifies each message by how
//! its ICAO address can be recovered: DF11/17/18 carry the address directly
//! in the message body, every other format only yields it as the XOR of the
//! computed and received CRC values.

use crate::iqblock::{DF_BITS, LONG_MSG_BITS, SHORT_MSG_BITS};

/// Precomputed CRC table for Mode S messages, one entry per bit position.
/// For 56-bit messages only the last 56 entries are used.
///
/// The last 24 entries are zero: the CRC field itself never contributes to
/// the syndrome, since flipping a bit inside it cannot be corrected by
/// re-deriving the field from the rest of the message.
pub const MODES_CHECKSUM_TABLE: [u32; 112] = [
    0x3935ea, 0x1c9af5, 0xf1b77e, 0x78dbbf, 0xc397db, 0x9e31e9, 0xb0e2f0, 0x587178,
    0x2c38bc, 0x161c5e, 0x0b0e2f, 0xfa7d13, 0x82c48d, 0xbe9842, 0x5f4c21, 0xd05c14,
    0x682e0a, 0x341705, 0xe5f186, 0x72f8c3, 0xc68665, 0x9cb936, 0x4e5c9b, 0xd8d449,
    0x939020, 0x49c810, 0x24e408, 0x127204, 0x093902, 0x049c81, 0xfdb444, 0x7eda22,
    0x3f6d11, 0xe04c8c, 0x702646, 0x381323, 0xe3f395, 0x8e03ce, 0x4701e7, 0xdc7af7,
    0x91c77f, 0xb719bb, 0xa476d9, 0xadc168, 0x56e0b4, 0x2b705a, 0x15b82d, 0xf52612,
    0x7a9309, 0xc2b380, 0x6159c0, 0x30ace0, 0x185670, 0x0c2b38, 0x06159c, 0x030ace,
    0x018567, 0xff38b7, 0x80665f, 0xbfc92b, 0xa01e91, 0xaff54c, 0x57faa6, 0x2bfd53,
    0xea04ad, 0x8af852, 0x457c29, 0xdd4410, 0x6ea208, 0x375104, 0x1ba882, 0x0dd441,
    0xf91024, 0x7c8812, 0x3e4409, 0xe0d800, 0x706c00, 0x383600, 0x1c1b00, 0x0e0d80,
    0x0706c0, 0x038360, 0x01c1b0, 0x00e0d8, 0x00706c, 0x003836, 0x001c1b, 0xfff409,
    0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000,
    0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000,
    0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000, 0x000000,
];

/// How a message's ICAO address must be recovered, keyed off its Downlink
/// Format field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatBucket {
    /// DF11, DF17, DF18: the address sits in bytes 1-3 of the message.
    AddrInMessage,
    /// Everything else: the address is only recoverable as crc ^ received.
    AddrXorCrc,
}

/// Classify a Downlink Format value (0-31).
pub fn classify(df: u8) -> FormatBucket {
    match df {
        11 | 17 | 18 => FormatBucket::AddrInMessage,
        _ => FormatBucket::AddrXorCrc,
    }
}

/// A message's bit length is driven solely by bit 0 of its first byte:
/// 1 means long (112 bits), 0 means short (56 bits).
pub fn message_len(first_byte: u8) -> usize {
    if first_byte & 0x80 != 0 {
        LONG_MSG_BITS
    } else {
        SHORT_MSG_BITS
    }
}

pub fn downlink_format(first_byte: u8) -> u8 {
    first_byte >> (8 - DF_BITS)
}

fn table_offset(bits: usize) -> usize {
    if bits == LONG_MSG_BITS {
        0
    } else {
        LONG_MSG_BITS - SHORT_MSG_BITS
    }
}

/// The table value that bit `j` (0-indexed from the front of the message)
/// contributes when set, for a message of the given bit length.
pub fn table_value(j: usize, bits: usize) -> u32 {
    MODES_CHECKSUM_TABLE[j + table_offset(bits)]
}

/// Compute the Mode S CRC remainder by XORing the table entries for every
/// set bit.
pub fn syndrome(msg: &[u8], bits: usize) -> u32 {
    debug_assert!(bits == SHORT_MSG_BITS || bits == LONG_MSG_BITS);
    debug_assert!(msg.len() >= bits / 8);

    let mut crc = 0u32;
    for j in 0..bits {
        let byte_idx = j / 8;
        let bitmask = 1u8 << (7 - (j % 8));
        if msg[byte_idx] & bitmask != 0 {
            crc ^= table_value(j, bits);
        }
    }
    crc
}

/// Extract the CRC field (the trailing 3 bytes) of a message.
pub fn extract_crc(msg: &[u8], bits: usize) -> u32 {
    let len = bits / 8;
    debug_assert!(msg.len() >= len);
    ((msg[len - 3] as u32) << 16) | ((msg[len - 2] as u32) << 8) | (msg[len - 1] as u32)
}

/// The outcome of checking a message's CRC.
pub struct CrcOutcome {
    pub computed: u32,
    pub received: u32,
}

impl CrcOutcome {
    pub fn xor(&self) -> u32 {
        self.computed ^ self.received
    }

    pub fn is_clean(&self) -> bool {
        self.computed == self.received
    }
}

pub fn compute(msg: &[u8], bits: usize) -> CrcOutcome {
    CrcOutcome {
        computed: syndrome(msg, bits),
        received: extract_crc(msg, bits),
    }
}

/// Recover the transmitting address for formats without an explicit ICAO
/// field: it is exactly the XOR of the computed and received CRC.
pub fn recover_icao_from_crc(msg: &[u8], bits: usize) -> u32 {
    compute(msg, bits).xor()
}

/// The ICAO address carried directly in bytes 1-3 of a DF11/17/18 message.
pub fn icao_in_message(msg: &[u8]) -> u32 {
    ((msg[1] as u32) << 16) | ((msg[2] as u32) << 8) | (msg[3] as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{with_bit_flipped, VALID_DF17};

    #[test]
    fn known_good_message_has_matching_crc() {
        let outcome = compute(&VALID_DF17, LONG_MSG_BITS);
        assert!(outcome.is_clean());
    }

    #[test]
    fn classify_routes_df17_to_addr_in_message() {
        let df = downlink_format(VALID_DF17[0]);
        assert_eq!(df, 17);
        assert_eq!(classify(df), FormatBucket::AddrInMessage);
    }

    #[test]
    fn classify_routes_other_dfs_to_addr_xor_crc() {
        assert_eq!(classify(4), FormatBucket::AddrXorCrc);
        assert_eq!(classify(20), FormatBucket::AddrXorCrc);
    }

    #[test]
    fn message_len_follows_bit_zero() {
        assert_eq!(message_len(0x8D), LONG_MSG_BITS);
        assert_eq!(message_len(0x20), SHORT_MSG_BITS);
    }

    #[test]
    fn icao_in_message_matches_known_fixture() {
        assert_eq!(icao_in_message(&VALID_DF17), 0x4840D6);
    }

    #[test]
    fn corrupted_message_fails_crc() {
        let msg = with_bit_flipped(VALID_DF17, 42);
        let outcome = compute(&msg, LONG_MSG_BITS);
        assert!(!outcome.is_clean());
    }
}
