//! Filter Bank Initializer.
//!
//! Builds `N_PHASES` Hann-windowed sinc fractional-delay kernels of length `TAPS`.
//! Kernel `i` is shifted by `-i/N_PHASES` samples relative to kernel 0, so sampling
//! all `N_PHASES` kernels at the same index searches `N_PHASES` sub-sample phases
//! in parallel.

use std::f64::consts::PI;

use crate::iqblock::{N_PHASES, TAPS};

pub struct FilterBank {
    kernels: Vec<[f32; TAPS]>,
}

impl FilterBank {
    pub fn new() -> Self {
        let n_eff = (TAPS + 1) as f64;
        let mut kernels = Vec::with_capacity(N_PHASES);

        for i in 0..N_PHASES {
            let frac = i as f64 / N_PHASES as f64;
            let mut kernel = [0.0f32; TAPS];

            for j in 0..TAPS {
                let window = 0.5 * (1.0 - (2.0 * PI * ((j as f64 + 1.0) - frac) / n_eff).cos());
                let x = PI * (j as f64 - (TAPS as f64 / 2.0 - 1.0) - frac);
                let sinc = if x.abs() < 1e-12 { 1.0 } else { x.sin() / x };
                kernel[j] = (sinc * window) as f32;
            }

            kernels.push(kernel);
        }

        Self { kernels }
    }

    pub fn kernel(&self, phase: usize) -> &[f32; TAPS] {
        &self.kernels[phase]
    }
}

impl Default for FilterBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_coefficients_are_finite() {
        let bank = FilterBank::new();
        for i in 0..N_PHASES {
            for &c in bank.kernel(i) {
                assert!(c.is_finite());
            }
        }
    }

    #[test]
    fn dc_gain_is_approximately_unity() {
        let bank = FilterBank::new();
        for i in 0..N_PHASES {
            let sum: f32 = bank.kernel(i).iter().sum();
            assert!((sum - 1.0).abs() < 0.1, "phase {i} dc gain {sum}");
        }
    }

    #[test]
    fn phase_zero_is_not_identical_to_phase_one() {
        let bank = FilterBank::new();
        assert_ne!(bank.kernel(0), bank.kernel(1));
    }
}
