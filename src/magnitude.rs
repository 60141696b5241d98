//! Interpolator & Magnitude Stage.
//!
//! Runs each of the filter bank's kernels across an IQ block, producing one
//! squared-magnitude stream per phase. The tail `PREAMBLE_LEN` entries of each
//! stream are not derived from samples at all; they stay at the all-ones
//! sentinel the correlator's normalization relies on.

use crate::filterbank::FilterBank;
use crate::iqblock::{IqBlock, N_PHASES, PREAMBLE_LEN, TAPS};

pub struct MagnitudeMatrix {
    block_samples: usize,
    rows: Vec<Vec<f32>>,
}

impl MagnitudeMatrix {
    pub fn new(block_samples: usize) -> Self {
        Self {
            block_samples,
            rows: vec![vec![1.0f32; block_samples + PREAMBLE_LEN]; N_PHASES],
        }
    }

    pub fn block_samples(&self) -> usize {
        self.block_samples
    }

    pub fn row(&self, phase: usize) -> &[f32] {
        &self.rows[phase]
    }

    pub fn get(&self, phase: usize, j: usize) -> f32 {
        self.rows[phase][j]
    }

    pub fn compute(&mut self, block: &IqBlock, bank: &FilterBank) {
        let b = self.block_samples;
        debug_assert_eq!(block.block_samples(), b);

        for phase in 0..N_PHASES {
            let kernel = bank.kernel(phase);
            let row = &mut self.rows[phase];

            for j in 0..b {
                let mut acc_re = 0.0f32;
                let mut acc_im = 0.0f32;
                for k in 0..TAPS {
                    let w = kernel[k];
                    acc_re += block.re[j + k] * w;
                    acc_im += block.im[j + k] * w;
                }
                row[j] = acc_re * acc_re + acc_im * acc_im;
            }

            for j in b..b + PREAMBLE_LEN {
                row[j] = 1.0;
            }
        }
    }
}
