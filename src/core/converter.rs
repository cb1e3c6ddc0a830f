//! Interval conversion policy
//!
//! Maps an interval's start and end independently through a
//! [`CoordinateOracle`] and decides whether the translated interval is safe
//! to emit:
//! 1. Either endpoint without a candidate -> unmapped
//! 2. First candidate of each endpoint is taken (no re-ranking)
//! 3. Endpoints on different chromosomes -> unmapped
//! 4. Mapped end not after mapped start -> unmapped

use crate::core::oracle::CoordinateOracle;
use crate::formats::bed::Interval;
use std::fmt;

/// Why an interval could not be converted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnmappedReason {
    /// The oracle had no candidate for the start position
    StartUnmapped,
    /// The oracle had no candidate for the end position
    EndUnmapped,
    /// Endpoints landed on different chromosomes, or in reversed order
    ChromosomeMismatch,
}

impl UnmappedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnmappedReason::StartUnmapped => "start_unmapped",
            UnmappedReason::EndUnmapped => "end_unmapped",
            UnmappedReason::ChromosomeMismatch => "chromosome_mismatch",
        }
    }
}

impl fmt::Display for UnmappedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of converting one interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Mapped(Interval),
    Unmapped {
        interval: Interval,
        reason: UnmappedReason,
    },
}

impl ConversionOutcome {
    pub fn is_mapped(&self) -> bool {
        matches!(self, ConversionOutcome::Mapped(_))
    }

    pub fn reason(&self) -> Option<UnmappedReason> {
        match self {
            ConversionOutcome::Mapped(_) => None,
            ConversionOutcome::Unmapped { reason, .. } => Some(*reason),
        }
    }
}

/// Applies the endpoint mapping policy on top of an oracle
pub struct IntervalConverter<'a, O: ?Sized> {
    oracle: &'a O,
}

impl<'a, O: CoordinateOracle + ?Sized> IntervalConverter<'a, O> {
    pub fn new(oracle: &'a O) -> Self {
        Self { oracle }
    }

    /// Convert one interval; metadata fields are carried over untouched
    pub fn convert(&self, interval: Interval) -> ConversionOutcome {
        let start_hit = self.oracle.query(&interval.chrom, interval.start).into_iter().next();
        let Some(start_hit) = start_hit else {
            return unmapped(interval, UnmappedReason::StartUnmapped);
        };

        let end_hit = self.oracle.query(&interval.chrom, interval.end).into_iter().next();
        let Some(end_hit) = end_hit else {
            return unmapped(interval, UnmappedReason::EndUnmapped);
        };

        if start_hit.chrom != end_hit.chrom || end_hit.position <= start_hit.position {
            return unmapped(interval, UnmappedReason::ChromosomeMismatch);
        }

        ConversionOutcome::Mapped(Interval {
            chrom: start_hit.chrom,
            start: start_hit.position,
            end: end_hit.position,
            fields: interval.fields,
        })
    }
}

fn unmapped(interval: Interval, reason: UnmappedReason) -> ConversionOutcome {
    ConversionOutcome::Unmapped { interval, reason }
}
