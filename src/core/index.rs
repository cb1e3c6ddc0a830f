//! Interval index over chain alignment blocks
//!
//! Uses rust-lapper for O(log n + k) lookups of the blocks covering a
//! source position.

use crate::core::chain::ChainFile;
use crate::core::Strand;
use rust_lapper::{Interval, Lapper};
use std::collections::HashMap;

/// Value stored in each interval - target mapping information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalValue {
    pub target_chrom: String,
    /// Target start position (0-based, already flipped for negative strand)
    pub target_start: u64,
    /// Target end position (exclusive)
    pub target_end: u64,
    pub target_strand: Strand,
    /// Score of the chain the block came from
    pub score: u64,
    /// Ordinal of that chain in the chain file
    pub chain_index: usize,
}

pub type ChainInterval = Interval<u64, IntervalValue>;

/// Interval index organized by source chromosome
pub struct ChainIndex {
    maps: HashMap<String, Lapper<u64, IntervalValue>>,
    /// Normalized chromosome key -> indexed name
    chrom_aliases: HashMap<String, String>,
}

impl ChainIndex {
    /// Build index from parsed chain data
    pub fn from_chain_data(chain_file: ChainFile) -> Self {
        let mut blocks_by_chrom: HashMap<String, Vec<ChainInterval>> = HashMap::new();

        for block in chain_file.blocks {
            blocks_by_chrom
                .entry(block.source_chrom)
                .or_default()
                .push(Interval {
                    start: block.source_start,
                    stop: block.source_end,
                    val: IntervalValue {
                        target_chrom: block.target_chrom,
                        target_start: block.target_start,
                        target_end: block.target_end,
                        target_strand: block.target_strand,
                        score: block.score,
                        chain_index: block.chain_index,
                    },
                });
        }

        let mut maps = HashMap::with_capacity(blocks_by_chrom.len());
        let mut chrom_aliases = HashMap::with_capacity(blocks_by_chrom.len());
        for (chrom, intervals) in blocks_by_chrom {
            chrom_aliases.insert(normalize_chrom_key(&chrom), chrom.clone());
            maps.insert(chrom, Lapper::new(intervals));
        }

        Self { maps, chrom_aliases }
    }

    /// Blocks whose source range contains `position`
    ///
    /// Chromosome names are matched exactly first, then with `chr` prefix
    /// and case differences ignored.
    pub fn query_point(&self, chrom: &str, position: u64) -> Vec<&ChainInterval> {
        match self.find_lapper(chrom) {
            // u64::MAX has no half-open point interval and no block can cover it
            Some(lapper) => match position.checked_add(1) {
                Some(stop) => lapper.find(position, stop).collect(),
                None => vec![],
            },
            None => vec![],
        }
    }

    fn find_lapper(&self, chrom: &str) -> Option<&Lapper<u64, IntervalValue>> {
        if let Some(lapper) = self.maps.get(chrom) {
            return Some(lapper);
        }
        self.chrom_aliases
            .get(&normalize_chrom_key(chrom))
            .and_then(|name| self.maps.get(name))
    }

    /// Check if a chromosome exists in the index
    pub fn has_chrom(&self, chrom: &str) -> bool {
        self.find_lapper(chrom).is_some()
    }

    /// Get all source chromosome names
    pub fn source_chroms(&self) -> impl Iterator<Item = &str> {
        self.maps.keys().map(|s| s.as_str())
    }

    /// Get total number of blocks across all chromosomes
    pub fn total_intervals(&self) -> usize {
        self.maps.values().map(|l| l.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

/// Lowercase and drop a leading "chr"
fn normalize_chrom_key(chrom: &str) -> String {
    let lower = chrom.to_lowercase();
    match lower.strip_prefix("chr") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chain::parse_chain_bytes;

    fn create_test_index() -> ChainIndex {
        let chain_data = b"\
chain 1000 chr1 1000 + 100 500 chr1 1000 + 100 500 1
100 50 50
100 50 50
100

chain 500 chr2 2000 + 0 200 chr2 2000 + 0 200 2
100 50 50
50
";
        ChainIndex::from_chain_data(parse_chain_bytes(chain_data).unwrap())
    }

    #[test]
    fn test_index_creation() {
        let index = create_test_index();

        assert!(index.has_chrom("chr1"));
        assert!(index.has_chrom("chr2"));
        assert!(!index.has_chrom("chr3"));
        assert_eq!(index.total_intervals(), 5);
        assert!(!index.is_empty());
    }

    #[test]
    fn test_query_point_inside_block() {
        let index = create_test_index();

        let results = index.query_point("chr1", 150);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].start, 100);
        assert_eq!(results[0].val.target_start, 100);
        assert_eq!(results[0].val.score, 1000);
    }

    #[test]
    fn test_query_point_block_edges() {
        let index = create_test_index();

        // Half-open blocks: 100 is inside, 200 falls in the gap
        assert_eq!(index.query_point("chr1", 100).len(), 1);
        assert_eq!(index.query_point("chr1", 199).len(), 1);
        assert!(index.query_point("chr1", 200).is_empty());
        assert!(index.query_point("chr1", 50).is_empty());
    }

    #[test]
    fn test_query_point_at_u64_max() {
        let index = create_test_index();

        assert!(index.query_point("chr1", u64::MAX).is_empty());
        assert!(index.query_point("chr1", u64::MAX - 1).is_empty());
    }

    #[test]
    fn test_chrom_name_variants() {
        let index = create_test_index();

        assert!(index.has_chrom("1"));
        assert!(index.has_chrom("CHR1"));
        assert_eq!(
            index.query_point("1", 150).len(),
            index.query_point("chr1", 150).len()
        );
        assert!(index.query_point("chr3", 150).is_empty());
    }

    #[test]
    fn test_source_chroms() {
        let index = create_test_index();

        let mut chroms: Vec<&str> = index.source_chroms().collect();
        chroms.sort_unstable();
        assert_eq!(chroms, vec!["chr1", "chr2"]);
    }
}
