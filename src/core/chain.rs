//! Chain file parsing
//!
//! Parses UCSC chain format files, the alignment data behind [`ChainOracle`].
//!
//! # Chain File Format
//!
//! ```text
//! chain score tName tSize tStrand tStart tEnd qName qSize qStrand qStart qEnd id
//! size dt dq
//! size dt dq
//! size
//! ```
//!
//! - Header line starts with "chain"
//! - Data lines contain: size (alignment block), dt (target gap), dq (query/source gap)
//! - Last data line has only size (no gaps)
//!
//! [`ChainOracle`]: crate::core::ChainOracle

use crate::core::error::{ChainParseError, ChainResult};
use crate::core::io::open_reader;
use crate::core::Strand;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// Parsed chain header
///
/// UCSC "target" (t) is the assembly being lifted *from* and becomes our
/// `source`; UCSC "query" (q) is the assembly lifted *to* and becomes our
/// `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainHeader {
    pub score: u64,
    pub source_name: String,
    pub source_size: u64,
    pub source_strand: Strand,
    pub source_start: u64,
    pub source_end: u64,
    pub target_name: String,
    pub target_size: u64,
    pub target_strand: Strand,
    pub target_start: u64,
    pub target_end: u64,
    pub chain_id: String,
}

fn parse_u64(value: &str, field: &'static str, line: usize) -> ChainResult<u64> {
    value.parse::<u64>().map_err(|_| ChainParseError::InvalidNumber {
        line,
        field,
        value: value.to_string(),
    })
}

fn parse_strand(value: &str, line: usize) -> ChainResult<Strand> {
    let mut chars = value.chars();
    match (chars.next().and_then(Strand::from_char), chars.next()) {
        (Some(strand), None) => Ok(strand),
        _ => Err(ChainParseError::InvalidStrand {
            line,
            strand: value.to_string(),
            expected: "'+' or '-'",
        }),
    }
}

fn check_range(start: u64, end: u64, size: u64, side: &str, line: usize) -> ChainResult<()> {
    if start > end {
        return Err(ChainParseError::InvalidCoordinates {
            line,
            message: format!("{} start ({}) > {} end ({})", side, start, side, end),
        });
    }
    if end > size {
        return Err(ChainParseError::InvalidCoordinates {
            line,
            message: format!("{} end ({}) > {} size ({})", side, end, side, size),
        });
    }
    Ok(())
}

impl ChainHeader {
    /// Parse a chain header line
    pub fn parse(line: &str, line_number: usize) -> ChainResult<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();

        if fields.len() < 12 {
            return Err(ChainParseError::InvalidHeader {
                line: line_number,
                message: format!("expected 12+ fields, got {}", fields.len()),
            });
        }
        if fields[0] != "chain" {
            return Err(ChainParseError::InvalidHeader {
                line: line_number,
                message: format!("expected 'chain' keyword, got '{}'", fields[0]),
            });
        }

        let header = Self {
            score: parse_u64(fields[1], "score", line_number)?,
            source_name: fields[2].to_string(),
            source_size: parse_u64(fields[3], "source size", line_number)?,
            source_strand: parse_strand(fields[4], line_number)?,
            source_start: parse_u64(fields[5], "source start", line_number)?,
            source_end: parse_u64(fields[6], "source end", line_number)?,
            target_name: fields[7].to_string(),
            target_size: parse_u64(fields[8], "target size", line_number)?,
            target_strand: parse_strand(fields[9], line_number)?,
            target_start: parse_u64(fields[10], "target start", line_number)?,
            target_end: parse_u64(fields[11], "target end", line_number)?,
            chain_id: fields.get(12).map(|s| s.to_string()).unwrap_or_default(),
        };

        // Only the target side of an alignment may be reverse-complemented
        if header.source_strand != Strand::Plus {
            return Err(ChainParseError::InvalidStrand {
                line: line_number,
                strand: fields[4].to_string(),
                expected: "'+' for the source sequence",
            });
        }

        check_range(header.source_start, header.source_end, header.source_size, "source", line_number)?;
        check_range(header.target_start, header.target_end, header.target_size, "target", line_number)?;

        Ok(header)
    }
}

/// A single ungapped alignment block
///
/// Both ranges are on the forward strand of their assembly; a minus-strand
/// target range has already been flipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBlock {
    pub source_chrom: String,
    pub source_start: u64,
    pub source_end: u64,
    pub target_chrom: String,
    pub target_start: u64,
    pub target_end: u64,
    pub target_strand: Strand,
    /// Score of the chain this block belongs to
    pub score: u64,
    /// 0-based ordinal of the chain within its file
    pub chain_index: usize,
}

/// Data line in a chain file (size, dt, dq)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DataLine {
    size: u64,
    /// Gap in our source (UCSC "dt")
    source_gap: u64,
    /// Gap in our target (UCSC "dq")
    target_gap: u64,
}

impl DataLine {
    fn parse(line: &str, line_number: usize) -> ChainResult<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();

        let (size, source_gap, target_gap) = match fields.as_slice() {
            [size] => (parse_u64(size, "block size", line_number)?, 0, 0),
            [size, dt, dq] => (
                parse_u64(size, "block size", line_number)?,
                parse_u64(dt, "source gap (dt)", line_number)?,
                parse_u64(dq, "target gap (dq)", line_number)?,
            ),
            _ => {
                return Err(ChainParseError::InvalidDataLine {
                    line: line_number,
                    message: format!("expected 1 or 3 fields, got {}", fields.len()),
                })
            }
        };

        if size == 0 {
            return Err(ChainParseError::InvalidDataLine {
                line: line_number,
                message: "block size must be greater than 0".to_string(),
            });
        }

        Ok(Self {
            size,
            source_gap,
            target_gap,
        })
    }
}

/// Result of parsing a chain file
#[derive(Debug, Clone, Default)]
pub struct ChainFile {
    pub blocks: Vec<ChainBlock>,
    pub target_chrom_sizes: HashMap<String, u64>,
    pub source_chrom_sizes: HashMap<String, u64>,
    /// Number of chain headers seen
    pub chain_count: usize,
}

/// Flip a forward-strand range onto the opposite strand of a sequence
fn flip(pos: u64, size: u64, seq_size: u64) -> (u64, u64) {
    (seq_size - (pos + size), seq_size - pos)
}

/// Parse chain data from any `BufRead` source
pub fn parse_chain_reader<R: BufRead>(reader: R) -> ChainResult<ChainFile> {
    let mut result = ChainFile::default();
    let mut current: Option<ChainHeader> = None;
    let mut source_pos: u64 = 0;
    let mut target_pos: u64 = 0;

    for (idx, line_result) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = line_result?;
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            // Blank line terminates the current chain
            current = None;
            continue;
        }

        if trimmed.starts_with("chain") {
            let header = ChainHeader::parse(trimmed, line_number)?;
            result
                .target_chrom_sizes
                .insert(header.target_name.clone(), header.target_size);
            result
                .source_chrom_sizes
                .insert(header.source_name.clone(), header.source_size);
            source_pos = header.source_start;
            target_pos = header.target_start;
            result.chain_count += 1;
            current = Some(header);
            continue;
        }

        let header = current
            .as_ref()
            .ok_or(ChainParseError::DataWithoutHeader { line: line_number })?;
        let data = DataLine::parse(trimmed, line_number)?;

        if source_pos + data.size > header.source_size || target_pos + data.size > header.target_size {
            return Err(ChainParseError::InvalidCoordinates {
                line: line_number,
                message: "alignment block runs past the end of its sequence".to_string(),
            });
        }

        let (target_start, target_end) = match header.target_strand {
            Strand::Plus => (target_pos, target_pos + data.size),
            Strand::Minus => flip(target_pos, data.size, header.target_size),
        };

        result.blocks.push(ChainBlock {
            source_chrom: header.source_name.clone(),
            source_start: source_pos,
            source_end: source_pos + data.size,
            target_chrom: header.target_name.clone(),
            target_start,
            target_end,
            target_strand: header.target_strand,
            score: header.score,
            chain_index: result.chain_count - 1,
        });

        source_pos += data.size + data.source_gap;
        target_pos += data.size + data.target_gap;
    }

    Ok(result)
}

/// Parse a chain file from a path
///
/// Gzip and bzip2 inputs are detected by extension or magic bytes.
pub fn parse_chain_file(path: &Path) -> ChainResult<ChainFile> {
    parse_chain_reader(open_reader(path)?)
}

/// Parse chain data from bytes
pub fn parse_chain_bytes(data: &[u8]) -> ChainResult<ChainFile> {
    parse_chain_reader(data)
}
