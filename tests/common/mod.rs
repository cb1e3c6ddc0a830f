//! Shared fixtures for integration tests

#![allow(dead_code)]

use bed_liftover::core::{CoordinateOracle, MappedPoint};
use std::collections::HashMap;

/// Oracle mapping whole chromosomes by a fixed offset
///
/// Chromosomes not in the table have no candidates.
#[derive(Default)]
pub struct StaticOracle {
    shifts: HashMap<String, (String, i64)>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `chrom` onto `target` shifted by `delta`
    pub fn shift(mut self, chrom: &str, target: &str, delta: i64) -> Self {
        self.shifts.insert(chrom.to_string(), (target.to_string(), delta));
        self
    }
}

impl CoordinateOracle for StaticOracle {
    fn query(&self, chrom: &str, position: u64) -> Vec<MappedPoint> {
        match self.shifts.get(chrom) {
            Some((target, delta)) => {
                let mapped = position as i64 + delta;
                if mapped < 0 {
                    Vec::new()
                } else {
                    vec![MappedPoint::new(target.clone(), mapped as u64)]
                }
            }
            None => Vec::new(),
        }
    }
}

/// Two chains: chr1 [0, 10000) -> chr1 [+1000) and 1 [0, 5000) -> chr5 minus strand
pub const TEST_CHAIN: &str = "\
chain 5000 chr1 20000 + 0 10000 chr1 30000 + 1000 11000 1
10000

chain 3000 chr2 20000 + 0 5000 chr5 50000 - 0 5000 2
5000
";
