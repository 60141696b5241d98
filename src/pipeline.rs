//! Peak Selector & Decoder Driver.
//!
//! Walks a block's correlation scores chronologically, picks the first
//! local maximum of each above-threshold run, demodulates and decodes the
//! candidate, then skips ahead past whatever it just consumed so the tail of
//! a decoded message's body is never mistaken for a fresh preamble.

use crate::correct::CorrectionPolicy;
use crate::correlator::CorrelationMatrix;
use crate::crc;
use crate::demod::Demod;
use crate::filterbank::FilterBank;
use crate::iqblock::{IqBlock, LONG_MSG_BITS as LONG_BITS, N_PHASES, PREAMBLE_LEN};
use crate::magnitude::MagnitudeMatrix;
use crate::message::{self, Decoded};
use crate::registry::AddressRegistry;

/// One accepted peak: its score, which phase produced it, and its start
/// index into that phase's magnitude row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub score: f32,
    pub phase: usize,
    pub start: usize,
}

/// Scans a single phase's correlation row and returns the first local
/// maximum of every contiguous above-threshold run, in chronological order.
/// Pure and independently testable: no IQ data, filter bank, or decoding
/// involved.
pub fn select_runs(scores: &[f32], threshold: f32) -> Vec<(f32, usize)> {
    let mut picks = Vec::new();
    let mut j = 0;
    while j < scores.len() {
        if scores[j] <= threshold {
            j += 1;
            continue;
        }
        let mut best_idx = j;
        let mut best_score = scores[j];
        while j < scores.len() && scores[j] > threshold {
            if scores[j] > best_score {
                best_score = scores[j];
                best_idx = j;
            }
            j += 1;
        }
        picks.push((best_score, best_idx));
    }
    picks
}

/// Finds, across all phases, the single best-scoring peak at or after
/// `skip_until`, preferring the earliest start index when several phases
/// tie for a given sample.
fn best_peak_from(corr: &CorrelationMatrix, threshold: f32, skip_until: usize) -> Option<Peak> {
    let mut best: Option<Peak> = None;
    for phase in 0..N_PHASES {
        let row = (0..corr.block_samples())
            .map(|j| corr.get(phase, j))
            .collect::<Vec<_>>();
        for (score, start) in select_runs(&row, threshold) {
            if start < skip_until {
                continue;
            }
            let candidate = Peak { score, phase, start };
            best = Some(match best {
                Some(b) if candidate.start < b.start => candidate,
                Some(b) if candidate.start == b.start && candidate.score > b.score => candidate,
                Some(b) => b,
                None => candidate,
            });
        }
    }
    best
}

/// A peak that begins too close to the end of the block to hold a full long
/// message can't be decoded without reading into the next block, which is
/// out of scope: it's rejected rather than queued.
fn fits_in_block(peak: &Peak, block_samples: usize) -> bool {
    peak.start + 2 * LONG_BITS <= block_samples
}

pub struct Pipeline {
    bank: FilterBank,
    mag: MagnitudeMatrix,
    corr: CorrelationMatrix,
    registry: AddressRegistry,
    policy: CorrectionPolicy,
    threshold: f32,
    block_counter: u64,
}

impl Pipeline {
    pub fn new(block_samples: usize, threshold: f32, policy: CorrectionPolicy) -> Self {
        Self {
            bank: FilterBank::new(),
            mag: MagnitudeMatrix::new(block_samples),
            corr: CorrelationMatrix::new(block_samples),
            registry: AddressRegistry::new(),
            policy,
            threshold,
            block_counter: 0,
        }
    }

    /// Runs the interpolator, correlator, and decoder driver over one block,
    /// returning every message successfully decoded from it along with the
    /// phase-relative sample offset of its preamble (used to build the
    /// output timestamp).
    pub fn process_block(&mut self, block: &IqBlock) -> Vec<(Decoded, usize, usize)> {
        self.mag.compute(block, &self.bank);
        self.corr.compute(&self.mag);
        self.block_counter += 1;

        let block_samples = self.corr.block_samples();
        let mut out = Vec::new();
        let mut skip_until = 0usize;

        loop {
            let Some(peak) = best_peak_from(&self.corr, self.threshold, skip_until) else {
                break;
            };

            if !fits_in_block(&peak, block_samples) {
                break;
            }

            let data_start = peak.start + PREAMBLE_LEN;
            let row = self.mag.row(peak.phase);
            let long_samples = &row[data_start..data_start + 2 * LONG_BITS];

            let probe = Demod::demodulate(long_samples, 8);
            let first_byte = probe.pack_bits(8)[0];
            let nbits = crc::message_len(first_byte);

            let demod = Demod::demodulate(long_samples, nbits);
            let payload = demod.pack_bits(nbits);

            match message::decode(&payload, nbits, self.policy, &mut self.registry) {
                Some(decoded) => {
                    out.push((decoded, peak.phase, peak.start));
                    skip_until = data_start + 2 * nbits;
                }
                None => {
                    skip_until = peak.start + 1;
                }
            }
        }

        out
    }

    pub fn registry(&self) -> &AddressRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_runs_finds_single_peak_in_clean_run() {
        let scores = [0.0, 0.2, 0.9, 0.95, 0.7, 0.1, 0.0];
        let picks = select_runs(&scores, 0.5);
        assert_eq!(picks, vec![(0.95, 3)]);
    }

    #[test]
    fn select_runs_reports_first_max_when_run_has_a_plateau() {
        let scores = [0.0, 0.8, 0.8, 0.3, 0.0];
        let picks = select_runs(&scores, 0.5);
        assert_eq!(picks, vec![(0.8, 1)]);
    }

    #[test]
    fn select_runs_finds_multiple_disjoint_runs_in_order() {
        let scores = [0.9, 0.0, 0.0, 0.6, 0.0];
        let picks = select_runs(&scores, 0.5);
        assert_eq!(picks, vec![(0.9, 0), (0.6, 3)]);
    }

    #[test]
    fn select_runs_ignores_everything_below_threshold() {
        let scores = [0.1, 0.2, 0.3];
        let picks = select_runs(&scores, 0.5);
        assert!(picks.is_empty());
    }

    #[test]
    fn fits_in_block_rejects_peaks_near_the_tail() {
        let peak = Peak { score: 1.0, phase: 0, start: 100 };
        assert!(!fits_in_block(&peak, 100 + 2 * LONG_BITS - 1));
        assert!(fits_in_block(&peak, 100 + 2 * LONG_BITS));
    }

    #[test]
    fn process_block_on_silence_decodes_nothing() {
        let block_samples = 2048;
        let mut block = IqBlock::new(block_samples);
        block.fill_from_bytes(&vec![128u8; 2 * block_samples]);

        let policy = CorrectionPolicy {
            fix_xored_crcs: false,
            fix_2_bit_errors: false,
        };
        let mut pipeline = Pipeline::new(block_samples, 0.3, policy);
        let decoded = pipeline.process_block(&block);

        assert!(decoded.is_empty());
    }

    #[test]
    fn best_peak_from_respects_skip_until() {
        let block_samples = 32;
        let mut corr = CorrelationMatrix::new(block_samples);
        corr.compute(&{
            let bank = FilterBank::new();
            let mut block = IqBlock::new(block_samples);
            block.fill_from_bytes(&vec![128u8; 2 * block_samples]);
            let mut mag = MagnitudeMatrix::new(block_samples);
            mag.compute(&block, &bank);
            mag
        });

        // a silent block produces no peaks regardless of skip_until
        assert!(best_peak_from(&corr, 0.3, 0).is_none());
        assert!(best_peak_from(&corr, 0.3, 20).is_none());
    }
}
