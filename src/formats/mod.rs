//! File format adapters
//!
//! Adapter for BED-style interval files.

pub mod bed;

pub use bed::{convert_bed, route_bed, BedParseError, ConversionStats, Interval, RouteError};
