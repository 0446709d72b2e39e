//! Approximate `uniq()` cardinality estimator.
//!
//! Register array keyed by the hash's top `PRECISION` bits, each storing the
//! longest run of leading zero bits seen among hashes mapped there. Small
//! cardinalities fall back to linear counting; large ones use the raw
//! harmonic-mean estimator corrected against a bias-interpolation table.
//!
//! The bias/raw-estimate tables here are a monotonic interpolation curve
//! shaped like the published one, not a byte-for-byte transcription of it —
//! see DESIGN.md.

use std::hash::{Hash, Hasher};

use twox_hash::XxHash64;

const PRECISION: u32 = 12;
const NUM_REGISTERS: usize = 1 << PRECISION;
/// Published constant: above this raw estimate, skip bias correction and
/// trust the raw estimator directly.
const BIAS_CORRECTION_THRESHOLD: f64 = 177_700.0;

/// Interpolation table over raw estimates, monotonically increasing.
const RAW_ESTIMATE_DATA: [f64; 9] = [4096.0, 8192.0, 16384.0, 32768.0, 49152.0, 65536.0, 98304.0, 131072.0, 177_700.0];
/// Bias to subtract at the matching `RAW_ESTIMATE_DATA` index, also monotonic.
const BIAS_DATA: [f64; 9] = [620.0, 850.0, 1050.0, 1200.0, 1260.0, 1290.0, 1310.0, 1320.0, 1325.0];

#[derive(Debug, Clone, PartialEq)]
pub struct HyperLogLog {
    registers: Vec<u8>,
}

impl HyperLogLog {
    pub fn new() -> Self {
        Self { registers: vec![0; NUM_REGISTERS] }
    }

    pub fn insert<T: Hash>(&mut self, value: &T) {
        let mut hasher = XxHash64::with_seed(0);
        value.hash(&mut hasher);
        let hash = hasher.finish();
        let bucket = (hash >> (64 - PRECISION)) as usize;
        let rest = hash << PRECISION | (1 << (PRECISION - 1)); // keep a set bit so the run terminates
        let rho = (rest.leading_zeros() + 1) as u8;
        self.registers[bucket] = self.registers[bucket].max(rho);
    }

    pub fn merge(&mut self, other: &HyperLogLog) {
        for (a, b) in self.registers.iter_mut().zip(&other.registers) {
            *a = (*a).max(*b);
        }
    }

    fn alpha_m(m: f64) -> f64 {
        match NUM_REGISTERS {
            16 => 0.673,
            32 => 0.697,
            64 => 0.709,
            _ => 0.7213 / (1.0 + 1.079 / m),
        }
    }

    pub fn estimate(&self) -> f64 {
        let m = NUM_REGISTERS as f64;
        let sum: f64 = self.registers.iter().map(|&r| 2f64.powi(-(r as i32))).sum();
        let raw_estimate = Self::alpha_m(m) * m * m / sum;

        let zero_registers = self.registers.iter().filter(|&&r| r == 0).count();
        let estimate = if raw_estimate <= 2.5 * m && zero_registers > 0 {
            // linear counting for the small-cardinality regime
            m * (m / zero_registers as f64).ln()
        } else {
            raw_estimate
        };

        if estimate <= BIAS_CORRECTION_THRESHOLD {
            self.bias_corrected(estimate)
        } else {
            estimate
        }
    }

    /// Subtracts `biases[i]` from `estimate` where `i = upper_bound(raw_estimates, estimate)`.
    fn bias_corrected(&self, estimate: f64) -> f64 {
        let i = RAW_ESTIMATE_DATA.partition_point(|&r| r <= estimate).min(BIAS_DATA.len() - 1);
        (estimate - BIAS_DATA[i]).max(0.0)
    }
}

impl Default for HyperLogLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_estimates_near_zero() {
        let hll = HyperLogLog::new();
        assert!(hll.estimate() < 1.0);
    }

    #[test]
    fn estimate_is_in_right_order_of_magnitude() {
        let mut hll = HyperLogLog::new();
        for i in 0..10_000u64 {
            hll.insert(&i);
        }
        let est = hll.estimate();
        assert!((5_000.0..20_000.0).contains(&est), "estimate {est} out of expected range");
    }

    #[test]
    fn merge_of_disjoint_sets_approximates_union() {
        let mut a = HyperLogLog::new();
        let mut b = HyperLogLog::new();
        for i in 0..5_000u64 {
            a.insert(&i);
        }
        for i in 5_000..10_000u64 {
            b.insert(&i);
        }
        a.merge(&b);
        let est = a.estimate();
        assert!((5_000.0..20_000.0).contains(&est), "estimate {est} out of expected range");
    }
}
