//! Property-based tests for chain parsing and the chain-backed oracle

mod common;

use bed_liftover::core::{
    parse_chain_bytes, ChainOracle, CoordinateOracle, OracleLoadError, Strand,
};
use bed_liftover::formats::bed::Interval;
use bed_liftover::{ConversionOutcome, IntervalConverter, UnmappedReason};
use common::TEST_CHAIN;
use proptest::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn oracle(chain: &str) -> ChainOracle {
    ChainOracle::from_chain_data(parse_chain_bytes(chain.as_bytes()).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Plus-strand blocks translate by a constant offset
    #[test]
    fn prop_plus_strand_offset(
        t_start in 0u64..1_000_000,
        q_start in 0u64..1_000_000,
        len in 1u64..10_000,
        offset in 0u64..10_000,
    ) {
        let offset = offset % len;
        let chain = format!(
            "chain 1000 chr1 2000000 + {} {} chr1 2000000 + {} {} 1\n{}\n",
            t_start, t_start + len, q_start, q_start + len, len
        );
        let hits = oracle(&chain).query("chr1", t_start + offset);

        prop_assert_eq!(hits.len(), 1);
        prop_assert_eq!(hits[0].position, q_start + offset);
        prop_assert_eq!(hits[0].strand, Some(Strand::Plus));
        prop_assert!(oracle(&chain).query("chr1", t_start + len).is_empty());
    }

    /// Minus-strand blocks count back from the end of the forward-strand range
    #[test]
    fn prop_minus_strand_offset(
        q_size in 20_000u64..1_000_000,
        q_start in 0u64..10_000,
        len in 1u64..10_000,
        offset in 0u64..10_000,
    ) {
        let offset = offset % len;
        let chain = format!(
            "chain 1000 chr1 100000 + 0 {} chrB {} - {} {} 1\n{}\n",
            len, q_size, q_start, q_start + len, len
        );
        let hits = oracle(&chain).query("chr1", offset);

        let forward_end = q_size - q_start;
        prop_assert_eq!(hits.len(), 1);
        prop_assert_eq!(hits[0].chrom.as_str(), "chrB");
        prop_assert_eq!(hits[0].position, forward_end - 1 - offset);
        prop_assert_eq!(hits[0].strand, Some(Strand::Minus));
    }

    /// Candidates come back highest chain score first
    #[test]
    fn prop_candidates_ordered_by_score(low in 1u64..1000, extra in 1u64..1000, low_first in any::<bool>()) {
        let high = low + extra;
        let chain_a = format!("chain {} chr1 10000 + 0 100 chrA 10000 + 0 100 1\n100\n", high);
        let chain_b = format!("chain {} chr1 10000 + 0 100 chrB 10000 + 0 100 2\n100\n", low);
        let chain = if low_first {
            format!("{}\n{}", chain_b, chain_a)
        } else {
            format!("{}\n{}", chain_a, chain_b)
        };

        let hits = oracle(&chain).query("chr1", 50);
        prop_assert_eq!(hits.len(), 2);
        prop_assert_eq!(hits[0].chrom.as_str(), "chrA");
        prop_assert_eq!(hits[1].chrom.as_str(), "chrB");
    }
}

#[test]
fn test_equal_scores_keep_file_order() {
    let chain = "chain 10 chr1 1000 + 0 100 chrB 1000 + 0 100 1\n100\n\n\
                 chain 10 chr1 1000 + 0 100 chrA 1000 + 0 100 2\n100\n";
    let hits = oracle(chain).query("chr1", 10);

    assert_eq!(hits[0].chrom, "chrB");
    assert_eq!(hits[1].chrom, "chrA");
}

#[test]
fn test_chr_prefix_tolerated() {
    let oracle = oracle(TEST_CHAIN);

    assert_eq!(oracle.query("1", 10)[0].position, 1010);
    assert_eq!(oracle.query("chr1", 10)[0].position, 1010);
    assert_eq!(oracle.query("chr1", 10)[0].chrom, "chr1");
}

#[test]
fn test_converter_over_chain_oracle() {
    let oracle = oracle(TEST_CHAIN);
    let converter = IntervalConverter::new(&oracle);

    let lifted = converter.convert(Interval::parse("chr1\t100\t200\tname").unwrap());
    assert_eq!(
        lifted,
        ConversionOutcome::Mapped(Interval::parse("chr1\t1100\t1200\tname").unwrap())
    );

    // End falls just past the aligned block
    let past_end = converter.convert(Interval::parse("chr1\t9000\t10000").unwrap());
    assert_eq!(past_end.reason(), Some(UnmappedReason::EndUnmapped));

    // Minus-strand target reverses the endpoints
    let flipped = converter.convert(Interval::parse("chr2\t100\t200").unwrap());
    assert_eq!(flipped.reason(), Some(UnmappedReason::ChromosomeMismatch));

    let missing = converter.convert(Interval::parse("chr3\t100\t200").unwrap());
    assert_eq!(missing.reason(), Some(UnmappedReason::StartUnmapped));
}

#[test]
fn test_end_at_u64_max_is_end_unmapped() {
    let oracle = oracle(TEST_CHAIN);
    let converter = IntervalConverter::new(&oracle);

    let interval = Interval::parse("chr1\t0\t18446744073709551615").unwrap();
    assert_eq!(interval.end, u64::MAX);
    let outcome = converter.convert(interval);
    assert_eq!(outcome.reason(), Some(UnmappedReason::EndUnmapped));
    assert!(oracle.query("chr1", u64::MAX).is_empty());
}

#[test]
fn test_open_missing_chain() {
    let err = ChainOracle::open("definitely/not/here.chain").err().unwrap();
    assert!(matches!(err, OracleLoadError::NotFound(_)));
}

#[test]
fn test_open_empty_chain() {
    let file = NamedTempFile::new().unwrap();
    let err = ChainOracle::open(file.path()).err().unwrap();
    assert!(matches!(err, OracleLoadError::Empty(_)));
}

#[test]
fn test_open_malformed_chain() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"chain notanumber chr1 1000 + 0 100 chr1 1000 + 0 100 1\n100\n")
        .unwrap();
    file.flush().unwrap();

    let err = ChainOracle::open(file.path()).err().unwrap();
    match err {
        OracleLoadError::Malformed { source, .. } => assert_eq!(source.line(), Some(1)),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_open_gzip_chain() {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.over.chain.gz");
    let mut encoder = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
    encoder.write_all(TEST_CHAIN.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let oracle = ChainOracle::open(&path).unwrap();
    assert_eq!(oracle.index().total_intervals(), 2);
    assert_eq!(oracle.query("chr2", 0)[0].position, 49_999);
}
