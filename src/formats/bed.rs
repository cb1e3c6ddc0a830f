//! BED interval adapter
//!
//! Parses and writes tab-delimited interval lines (`chrom start end ...`) and
//! routes each record of a source file to the mapped or unmapped sink.
//! Columns after the third are carried as opaque strings.

use crate::core::{
    detect_compression, open_reader_as, CompressionFormat, ConversionOutcome, CoordinateOracle,
    IntervalConverter, LiftoverError, LineIterator, OutputSink, UnmappedReason,
};
use crate::pipeline::JobSpec;
use memchr::memchr_iter;
use std::fmt;
use std::io::{self, BufRead, Write};

/// Half-open genomic interval `[start, end)` with trailing metadata columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    /// Columns 4.. in their original order
    pub fields: Vec<String>,
}

/// BED parsing error
#[derive(Debug, thiserror::Error)]
pub enum BedParseError {
    #[error("Empty line")]
    EmptyLine,

    #[error("Too few fields: expected at least {expected}, found {found}")]
    TooFewFields { expected: usize, found: usize },

    #[error("Empty chromosome name")]
    EmptyChrom,

    #[error("Invalid number in field {0}: {1:?}")]
    InvalidNumber(&'static str, String),

    #[error("End ({end}) must be greater than start ({start})")]
    InvalidRange { start: u64, end: u64 },
}

fn parse_coord(field: &'static str, value: &str) -> Result<u64, BedParseError> {
    // Digits only: rejects signs and whitespace that u64::from_str would accept or trip on
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BedParseError::InvalidNumber(field, value.to_string()));
    }
    value
        .parse()
        .map_err(|_| BedParseError::InvalidNumber(field, value.to_string()))
}

impl Interval {
    /// Parse one record line (a trailing `\n` or `\r\n` is ignored)
    pub fn parse(line: &str) -> Result<Self, BedParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Err(BedParseError::EmptyLine);
        }

        let mut columns = Vec::with_capacity(8);
        let mut field_start = 0;
        for tab in memchr_iter(b'\t', line.as_bytes()) {
            columns.push(&line[field_start..tab]);
            field_start = tab + 1;
        }
        columns.push(&line[field_start..]);

        if columns.len() < 3 {
            return Err(BedParseError::TooFewFields {
                expected: 3,
                found: columns.len(),
            });
        }
        if columns[0].is_empty() {
            return Err(BedParseError::EmptyChrom);
        }

        let start = parse_coord("start", columns[1])?;
        let end = parse_coord("end", columns[2])?;
        if end <= start {
            return Err(BedParseError::InvalidRange { start, end });
        }

        Ok(Self {
            chrom: columns[0].to_string(),
            start,
            end,
            fields: columns[3..].iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Serialize without a line terminator
    pub fn to_line(&self) -> String {
        self.to_string()
    }

    /// Write the record followed by `\n`
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "{}", self)
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.chrom, self.start, self.end)?;
        for field in &self.fields {
            write!(f, "\t{}", field)?;
        }
        Ok(())
    }
}

/// Blank lines and `#` comments carry no record
pub fn is_skippable(line: &str) -> bool {
    line.trim().is_empty() || line.starts_with('#')
}

/// Conversion statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversionStats {
    /// Records parsed (comments and blank lines excluded)
    pub total: usize,
    pub mapped: usize,
    pub unmapped: usize,
    /// Comment and blank lines
    pub skipped: usize,
    pub start_unmapped: usize,
    pub end_unmapped: usize,
    pub chromosome_mismatch: usize,
}

impl ConversionStats {
    fn record_unmapped(&mut self, reason: UnmappedReason) {
        self.unmapped += 1;
        match reason {
            UnmappedReason::StartUnmapped => self.start_unmapped += 1,
            UnmappedReason::EndUnmapped => self.end_unmapped += 1,
            UnmappedReason::ChromosomeMismatch => self.chromosome_mismatch += 1,
        }
    }
}

/// Failure while routing a stream of records
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("malformed record at line {line}: {source}")]
    Malformed {
        line: usize,
        content: String,
        #[source]
        source: BedParseError,
    },

    #[error("read error: {0}")]
    Read(#[source] io::Error),

    #[error("write error on mapped output: {0}")]
    WriteMapped(#[source] io::Error),

    #[error("write error on unmapped output: {0}")]
    WriteUnmapped(#[source] io::Error),
}

/// Route every record of `reader` to `mapped` or `unmapped`
///
/// Mapped records are re-serialized with their new coordinates; unmapped
/// records are written back exactly as read. Stops at the first malformed
/// record.
pub fn route_bed<R, M, U, O>(
    reader: R,
    mapped: &mut M,
    unmapped: &mut U,
    oracle: &O,
) -> Result<ConversionStats, RouteError>
where
    R: BufRead,
    M: Write,
    U: Write,
    O: CoordinateOracle + ?Sized,
{
    let converter = IntervalConverter::new(oracle);
    let mut lines = LineIterator::new(reader);
    let mut stats = ConversionStats::default();
    let mut line_number = 0;

    while let Some(line) = lines.next_line() {
        let line = line.map_err(RouteError::Read)?;
        line_number += 1;

        if is_skippable(line) {
            stats.skipped += 1;
            continue;
        }

        let interval = Interval::parse(line).map_err(|source| RouteError::Malformed {
            line: line_number,
            content: line.to_string(),
            source,
        })?;
        stats.total += 1;

        match converter.convert(interval) {
            ConversionOutcome::Mapped(lifted) => {
                lifted.write_to(mapped).map_err(RouteError::WriteMapped)?;
                stats.mapped += 1;
            }
            ConversionOutcome::Unmapped { reason, .. } => {
                unmapped
                    .write_all(line.as_bytes())
                    .and_then(|_| unmapped.write_all(b"\n"))
                    .map_err(RouteError::WriteUnmapped)?;
                stats.record_unmapped(reason);
            }
        }
    }

    Ok(stats)
}

/// Convert the source file of `job`, writing its mapped and unmapped sinks
///
/// The mapped sink is gzip-compressed only when the job wants a compressed
/// destination and no later indexing; indexed jobs get a plain staging file
/// for the post-processing pipeline. The unmapped sidecar is always plain.
pub fn convert_bed<O: CoordinateOracle + ?Sized>(
    job: &JobSpec,
    oracle: &O,
) -> Result<ConversionStats, LiftoverError> {
    let source = &job.source_path;
    let format = if job.source_compressed {
        CompressionFormat::Gzip
    } else {
        detect_compression(source).map_err(|e| LiftoverError::io(source, e))?
    };
    let reader = open_reader_as(source, format).map_err(|e| LiftoverError::io(source, e))?;

    let mapped_path = job.mapped_output_path();
    let mut mapped = OutputSink::create(&mapped_path, job.compresses_mapped_output())
        .map_err(|e| LiftoverError::io(&mapped_path, e))?;
    let mut unmapped =
        OutputSink::create(&job.unmapped_path, false).map_err(|e| LiftoverError::io(&job.unmapped_path, e))?;

    // On error both sinks are dropped here, which flushes and closes them
    let stats = route_bed(reader, &mut mapped, &mut unmapped, oracle).map_err(|err| match err {
        RouteError::Malformed {
            line,
            content,
            source: parse_error,
        } => LiftoverError::MalformedRecord {
            path: source.clone(),
            line,
            content,
            source: parse_error,
        },
        RouteError::Read(e) => LiftoverError::io(source, e),
        RouteError::WriteMapped(e) => LiftoverError::io(&mapped_path, e),
        RouteError::WriteUnmapped(e) => LiftoverError::io(&job.unmapped_path, e),
    })?;

    mapped.finish().map_err(|e| LiftoverError::io(&mapped_path, e))?;
    unmapped
        .finish()
        .map_err(|e| LiftoverError::io(&job.unmapped_path, e))?;

    log::debug!(
        "{}: {} records, {} mapped, {} unmapped, {} skipped",
        source.display(),
        stats.total,
        stats.mapped,
        stats.unmapped,
        stats.skipped
    );

    Ok(stats)
}
