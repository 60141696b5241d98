//! Error Corrector.
//!
//! Three escalating tiers:
//!
//! 1. Ungated, DF11/17/18 messages only: an exhaustive single-bit syndrome
//!    search over bit positions `[DF_BITS, L_msg)`. The syndrome of a single
//!    flipped bit `i` is exactly `table_value(i, bits)`, so a dirty CRC whose
//!    xor remainder matches a table entry in that range names the corrupted
//!    bit directly; it is flipped in place and the message re-emitted.
//! 2. If `fix_xored_crcs` is set, a message whose xor remainder decodes to a
//!    currently-known address is accepted outright (the xor is assumed to be
//!    exactly that address corrupted onto the CRC field).
//! 3. If `fix_2_bit_errors` is set, an exhaustive two-bit-flip search against
//!    the CRC syndrome table is attempted. This tier is the most expensive
//!    and the most likely to produce a false positive on noise.
//!
//! Tier 3's bookkeeping has a quirk worth preserving rather than silently
//! fixing: when tier 3 succeeds on an `AddrXorCrc`-bucket message, the
//! corrected ICAO is read back out of the message body via
//! [`crc::icao_in_message`] rather than recomputed from the (now clean) CRC
//! xor, matching how the original implementation this was ported from reads
//! the address after an in-place fix.

use crate::crc::{self, FormatBucket};
use crate::iqblock::DF_BITS;
use crate::registry::{AddressRegistry, Membership};

#[derive(Debug, Clone, Copy)]
pub struct CorrectionPolicy {
    pub fix_xored_crcs: bool,
    pub fix_2_bit_errors: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// CRC was already clean.
    Clean,
    /// Tier 1: a single bit at this position was flipped to clear the CRC.
    SingleBitFlip(usize),
    /// Tier 2: the xor remainder itself was a known address.
    XoredCrc,
    /// Tier 3: a two-bit flip made the CRC clean.
    TwoBitFlip(usize, usize),
    /// No tier could explain the CRC mismatch.
    Uncorrectable,
}

/// Flip bit `j` (0-indexed from the front of the message) in place.
pub fn flip_bit(msg: &mut [u8], j: usize) {
    let byte_idx = j / 8;
    let bitmask = 1u8 << (7 - (j % 8));
    msg[byte_idx] ^= bitmask;
}

/// Searches bit positions `[DF_BITS, bits)` for the one flip that explains
/// `outcome`'s xor remainder, flipping it in place on success.
fn tier1_single_bit(msg: &mut [u8], bits: usize, outcome: &crc::CrcOutcome) -> Option<usize> {
    let target = outcome.xor();
    for i in DF_BITS..bits {
        if crc::table_value(i, bits) == target {
            flip_bit(msg, i);
            return Some(i);
        }
    }
    None
}

fn tier2_df(outcome: &crc::CrcOutcome, registry: &AddressRegistry) -> Option<u32> {
    let candidate = outcome.xor();
    match registry.contains(candidate) {
        Membership::Known => Some(candidate),
        Membership::Unknown | Membership::Invalid => None,
    }
}

fn tier3_two_bit_body(msg: &mut [u8], bits: usize) -> Option<(usize, usize)> {
    for j in 0..bits {
        flip_bit(msg, j);
        for i in (j + 1)..bits {
            flip_bit(msg, i);
            if crc::compute(msg, bits).is_clean() {
                return Some((j, i));
            }
            flip_bit(msg, i);
        }
        flip_bit(msg, j);
    }
    None
}

/// Attempt to explain a dirty CRC on `msg` (bits `bits`, already classified
/// as `bucket`) using the tiers enabled by `policy`. On success, `msg` may be
/// mutated in place (tier 3 only) and the returned `Correction` names which
/// tier fired.
pub fn correct(
    msg: &mut [u8],
    bits: usize,
    bucket: FormatBucket,
    policy: CorrectionPolicy,
    registry: &AddressRegistry,
) -> Correction {
    let outcome = crc::compute(msg, bits);
    if outcome.is_clean() {
        return Correction::Clean;
    }

    if bucket == FormatBucket::AddrInMessage {
        if let Some(j) = tier1_single_bit(msg, bits, &outcome) {
            return Correction::SingleBitFlip(j);
        }
    }

    if policy.fix_xored_crcs {
        if tier2_df(&outcome, registry).is_some() {
            return Correction::XoredCrc;
        }
    }

    if policy.fix_2_bit_errors {
        if let Some((j, i)) = tier3_two_bit_body(msg, bits) {
            return Correction::TwoBitFlip(j, i);
        }
    }

    Correction::Uncorrectable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iqblock::LONG_MSG_BITS;
    use crate::test_support::VALID_DF17;

    fn default_policy() -> CorrectionPolicy {
        CorrectionPolicy {
            fix_xored_crcs: false,
            fix_2_bit_errors: false,
        }
    }

    #[test]
    fn clean_message_needs_no_correction() {
        let mut msg = VALID_DF17;
        let registry = AddressRegistry::new();
        let result = correct(
            &mut msg,
            LONG_MSG_BITS,
            FormatBucket::AddrInMessage,
            default_policy(),
            &registry,
        );
        assert_eq!(result, Correction::Clean);
    }

    #[test]
    fn single_bit_tier_fires_ungated_on_first_seen_aircraft() {
        // bit 40 corrupted, all policies off, no prior knowledge of the address:
        // Tier 1 must still find and repair the flip on its own.
        let mut msg = VALID_DF17;
        flip_bit(&mut msg, 40);
        let registry = AddressRegistry::new();
        let result = correct(
            &mut msg,
            LONG_MSG_BITS,
            FormatBucket::AddrInMessage,
            default_policy(),
            &registry,
        );
        assert_eq!(result, Correction::SingleBitFlip(40));
        assert_eq!(msg, VALID_DF17);
    }

    #[test]
    fn two_bit_corruption_is_uncorrectable_by_default() {
        let mut msg = VALID_DF17;
        flip_bit(&mut msg, 20);
        flip_bit(&mut msg, 50);
        let registry = AddressRegistry::new();
        let result = correct(
            &mut msg,
            LONG_MSG_BITS,
            FormatBucket::AddrInMessage,
            default_policy(),
            &registry,
        );
        assert_eq!(result, Correction::Uncorrectable);
    }

    #[test]
    fn xored_crc_tier_recognizes_known_address_when_enabled() {
        let mut msg = VALID_DF17;
        msg[12] ^= 0x02;
        let dirty_outcome = crc::compute(&msg, LONG_MSG_BITS);
        let mut registry = AddressRegistry::new();
        registry.insert(dirty_outcome.xor());

        let policy = CorrectionPolicy {
            fix_xored_crcs: true,
            fix_2_bit_errors: false,
        };
        let result = correct(
            &mut msg,
            LONG_MSG_BITS,
            FormatBucket::AddrXorCrc,
            policy,
            &registry,
        );
        assert_eq!(result, Correction::XoredCrc);
    }

    #[test]
    fn two_bit_tier_repairs_double_flip_when_enabled() {
        let mut msg = VALID_DF17;
        flip_bit(&mut msg, 20);
        flip_bit(&mut msg, 50);
        let registry = AddressRegistry::new();
        let policy = CorrectionPolicy {
            fix_xored_crcs: false,
            fix_2_bit_errors: true,
        };
        let result = correct(
            &mut msg,
            LONG_MSG_BITS,
            FormatBucket::AddrInMessage,
            policy,
            &registry,
        );
        assert_eq!(result, Correction::TwoBitFlip(20, 50));
        assert_eq!(msg, VALID_DF17);
    }
}
