//! Decoded message assembly and the final output line format.

use tracing::warn;

use crate::correct::{correct, Correction, CorrectionPolicy};
use crate::crc::{self, FormatBucket};
use crate::iqblock::MSG_BYTES;
use crate::registry::{AddressRegistry, Membership};

pub struct Decoded {
    pub icao: u32,
    pub bits: usize,
    pub payload: [u8; MSG_BYTES],
}

/// The ICAO address a message carries once its CRC has been accepted,
/// following the same split as [`crc::classify`]: an in-message address for
/// DF11/17/18, otherwise the crc-xor-received remainder.
fn icao_from_msg(msg: &[u8], bits: usize, bucket: FormatBucket) -> u32 {
    match bucket {
        FormatBucket::AddrInMessage => crc::icao_in_message(msg),
        FormatBucket::AddrXorCrc => crc::recover_icao_from_crc(msg, bits),
    }
}

/// Runs the CRC check and, if it fails, the error corrector, over a raw
/// demodulated message. Returns `None` if no tier accepts it, or if the
/// recovered address turns out to be reserved (0 or 2^24-1): that case is
/// logged to the diagnostic stream and the message is dropped.
pub fn decode(
    payload: &[u8],
    bits: usize,
    policy: CorrectionPolicy,
    registry: &mut AddressRegistry,
) -> Option<Decoded> {
    let mut msg = [0u8; MSG_BYTES];
    msg[..bits / 8].copy_from_slice(&payload[..bits / 8]);

    let df = crc::downlink_format(msg[0]);
    let bucket = crc::classify(df);

    let outcome = crc::compute(&msg, bits);
    let icao = if outcome.is_clean() {
        icao_from_msg(&msg, bits, bucket)
    } else {
        match correct(&mut msg, bits, bucket, policy, registry) {
            Correction::Clean => unreachable!("dirty outcome already checked"),
            Correction::Uncorrectable => return None,
            Correction::SingleBitFlip(_) => crc::icao_in_message(&msg),
            Correction::XoredCrc => crc::recover_icao_from_crc(&msg, bits),
            Correction::TwoBitFlip(_, _) => icao_from_msg(&msg, bits, bucket),
        }
    };

    if registry.contains(icao) == Membership::Invalid {
        warn!("dropping decoded message with invalid inline address 0x{icao:06x}");
        return None;
    }

    registry.insert(icao);

    Some(Decoded {
        icao,
        bits,
        payload: msg,
    })
}

/// Renders a decoded message as a 14-digit zero-padded sample index, a
/// 2-digit zero-padded phase percentage, the ICAO hex address, and the
/// payload hex: `NNNNNNNNNNNNNN.PP: 0xAAAAAA, 0xHHHH...HH;`. `sample_index`
/// is the raw `block_index * block_samples + sample_offset` count, not a
/// time unit. The payload hex digit count is derived from `bits` (22 hex
/// digits for a long message, 8 for a short one) rather than a fixed
/// literal, since `bits/8 - 3` is what actually remains once the 3-byte CRC
/// field is excluded.
pub fn format_line(decoded: &Decoded, sample_index: u64, phase_percent: u32) -> String {
    let payload_bytes = decoded.bits / 8 - 3;
    let mut payload_hex = String::with_capacity(payload_bytes * 2);
    for &b in &decoded.payload[..payload_bytes] {
        payload_hex.push_str(&format!("{b:02x}"));
    }

    format!(
        "{sample_index:014}.{phase_percent:02}: 0x{:06x}, 0x{payload_hex};",
        decoded.icao
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iqblock::LONG_MSG_BITS;
    use crate::test_support::VALID_DF17;

    fn lenient_policy() -> CorrectionPolicy {
        CorrectionPolicy {
            fix_xored_crcs: true,
            fix_2_bit_errors: true,
        }
    }

    #[test]
    fn clean_df17_decodes_and_registers_icao() {
        let mut registry = AddressRegistry::new();
        let decoded = decode(&VALID_DF17, LONG_MSG_BITS, lenient_policy(), &mut registry)
            .expect("clean message should decode");
        assert_eq!(decoded.icao, 0x4840D6);
        assert_eq!(registry.contains(0x4840D6), crate::registry::Membership::Known);
    }

    #[test]
    fn dirty_two_bit_message_is_dropped_with_strict_policy() {
        // a two-bit corruption is outside Tier 1's reach and every other
        // tier is off, so this must be dropped rather than repaired.
        let mut msg = VALID_DF17;
        crate::correct::flip_bit(&mut msg, 20);
        crate::correct::flip_bit(&mut msg, 50);
        let mut registry = AddressRegistry::new();
        let strict = CorrectionPolicy {
            fix_xored_crcs: false,
            fix_2_bit_errors: false,
        };
        let decoded = decode(&msg, LONG_MSG_BITS, strict, &mut registry);
        assert!(decoded.is_none());
    }

    #[test]
    fn format_line_emits_22_hex_payload_digits_for_long_message() {
        let mut registry = AddressRegistry::new();
        let decoded = decode(&VALID_DF17, LONG_MSG_BITS, lenient_policy(), &mut registry).unwrap();
        let line = format_line(&decoded, 796810, 50);
        let payload_part = line.split("0x").nth(2).unwrap();
        let hex_digits = payload_part.trim_end_matches(';').len();
        assert_eq!(hex_digits, 22);
        assert!(line.starts_with("00000000796810.50: 0x4840d6, 0x"));
        assert!(line.ends_with(';'));
    }
}
