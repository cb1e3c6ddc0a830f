//! Core coordinate mapping functionality
//!
//! This module contains the chain file parser, interval index, the
//! coordinate oracle abstraction and the interval conversion policy.

mod chain;
mod converter;
mod error;
mod index;
pub mod io;
mod oracle;

pub use chain::{parse_chain_bytes, parse_chain_file, parse_chain_reader, ChainBlock, ChainFile, ChainHeader};
pub use converter::{ConversionOutcome, IntervalConverter, UnmappedReason};
pub use error::{
    ChainParseError, ChainResult, ExternalProcessError, LiftoverError, OracleLoadError,
    PostProcessStep, Result,
};
pub use index::{ChainIndex, ChainInterval, IntervalValue};
pub use io::{detect_compression, open_reader, open_reader_as, CompressionFormat, LineIterator, OutputSink};
pub use oracle::{ChainOracle, CoordinateOracle, MappedPoint, Strand};
