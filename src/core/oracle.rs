//! Coordinate oracle: translates single positions between assemblies
//!
//! The converter only sees the [`CoordinateOracle`] trait. [`ChainOracle`] is
//! the chain-file backed implementation used by the command line tool.

use crate::core::error::OracleLoadError;
use crate::core::{parse_chain_file, ChainFile, ChainIndex};
use std::path::Path;

/// Strand orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Strand {
    #[default]
    Plus,
    Minus,
}

impl Strand {
    /// Parse strand from char
    ///
    /// # Examples
    /// ```
    /// use bed_liftover::core::Strand;
    /// assert_eq!(Strand::from_char('+'), Some(Strand::Plus));
    /// assert_eq!(Strand::from_char('-'), Some(Strand::Minus));
    /// assert_eq!(Strand::from_char('.'), None);
    /// ```
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Strand::Plus),
            '-' => Some(Strand::Minus),
            _ => None,
        }
    }

    pub fn to_char(&self) -> char {
        match self {
            Strand::Plus => '+',
            Strand::Minus => '-',
        }
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// One candidate translation of a queried position
#[derive(Debug, Clone, PartialEq)]
pub struct MappedPoint {
    pub chrom: String,
    pub position: u64,
    pub strand: Option<Strand>,
    pub score: Option<f64>,
}

impl MappedPoint {
    pub fn new(chrom: impl Into<String>, position: u64) -> Self {
        Self {
            chrom: chrom.into(),
            position,
            strand: None,
            score: None,
        }
    }
}

/// Capability to translate an assembly-A position into assembly-B candidates
///
/// Implementations rank their candidates; callers that need a single answer
/// take the first one. An empty vector means the position does not map.
pub trait CoordinateOracle {
    fn query(&self, chrom: &str, position: u64) -> Vec<MappedPoint>;
}

impl<T: CoordinateOracle + ?Sized> CoordinateOracle for &T {
    fn query(&self, chrom: &str, position: u64) -> Vec<MappedPoint> {
        (**self).query(chrom, position)
    }
}

impl<T: CoordinateOracle + ?Sized> CoordinateOracle for Box<T> {
    fn query(&self, chrom: &str, position: u64) -> Vec<MappedPoint> {
        (**self).query(chrom, position)
    }
}

/// Oracle backed by a UCSC chain file
///
/// Candidates are every block containing the position, ordered by descending
/// chain score and then by chain order in the file.
pub struct ChainOracle {
    index: ChainIndex,
}

impl ChainOracle {
    /// Load a chain file (plain, gzip or bzip2)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OracleLoadError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(OracleLoadError::NotFound(path.to_path_buf()));
        }

        let chain_file = parse_chain_file(path).map_err(|source| OracleLoadError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        if chain_file.blocks.is_empty() {
            return Err(OracleLoadError::Empty(path.to_path_buf()));
        }

        Ok(Self::from_chain_data(chain_file))
    }

    /// Build from already parsed chain data
    pub fn from_chain_data(chain_file: ChainFile) -> Self {
        Self {
            index: ChainIndex::from_chain_data(chain_file),
        }
    }

    pub fn index(&self) -> &ChainIndex {
        &self.index
    }
}

impl CoordinateOracle for ChainOracle {
    fn query(&self, chrom: &str, position: u64) -> Vec<MappedPoint> {
        let mut hits = self.index.query_point(chrom, position);
        hits.sort_by(|a, b| {
            b.val
                .score
                .cmp(&a.val.score)
                .then(a.val.chain_index.cmp(&b.val.chain_index))
        });

        hits.into_iter()
            .map(|iv| {
                let offset = position - iv.start;
                let target = &iv.val;
                // Minus-strand blocks are stored flipped; count back from the end
                let mapped = match target.target_strand {
                    Strand::Plus => target.target_start + offset,
                    Strand::Minus => target.target_end - 1 - offset,
                };
                MappedPoint {
                    chrom: target.target_chrom.clone(),
                    position: mapped,
                    strand: Some(target.target_strand),
                    score: Some(target.score as f64),
                }
            })
            .collect()
    }
}
