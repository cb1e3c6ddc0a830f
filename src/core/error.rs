//! Error types for bed-liftover
//!
//! Defines all error types used throughout the library.

use crate::formats::bed::BedParseError;
use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Main error type for liftover jobs and batches
#[derive(Debug, Error)]
pub enum LiftoverError {
    /// The coordinate oracle could not be constructed; aborts the batch
    #[error("Failed to load coordinate oracle: {0}")]
    OracleLoad(#[from] OracleLoadError),

    /// A source line could not be parsed; aborts the job
    #[error("Malformed record in {} at line {line}: {source} (content: {content:?})", .path.display())]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        content: String,
        #[source]
        source: BedParseError,
    },

    /// The job plan is inconsistent; aborts the batch before any I/O
    #[error("Invalid job plan: {0}")]
    Configuration(String),

    /// A post-processing step failed
    #[error("{step} step failed for {}: {source}", .path.display())]
    ExternalProcess {
        step: PostProcessStep,
        path: PathBuf,
        #[source]
        source: ExternalProcessError,
    },

    /// I/O errors on a job's source or sinks
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LiftoverError {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LiftoverError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while constructing a coordinate oracle
#[derive(Debug, Error)]
pub enum OracleLoadError {
    /// Mapping resource does not exist
    #[error("Mapping resource not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Mapping resource exists but could not be parsed
    #[error("Malformed mapping resource {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: ChainParseError,
    },

    /// Mapping resource parsed but holds no alignment blocks
    #[error("Mapping resource {} contains no alignment blocks", .0.display())]
    Empty(PathBuf),
}

/// Errors that can occur during chain file parsing
#[derive(Debug, Error)]
pub enum ChainParseError {
    /// Invalid chain header format
    #[error("Invalid chain header at line {line}: {message}")]
    InvalidHeader { line: usize, message: String },

    /// Invalid data line format
    #[error("Invalid data line at line {line}: {message}")]
    InvalidDataLine { line: usize, message: String },

    /// Strand is not '+' or '-', or is not allowed for its sequence
    #[error("Invalid strand '{strand}' at line {line}: expected {expected}")]
    InvalidStrand {
        line: usize,
        strand: String,
        expected: &'static str,
    },

    /// Failed to parse integer
    #[error("Invalid {field} value '{value}' at line {line}: expected a non-negative integer")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        value: String,
    },

    /// Coordinates out of order or beyond the sequence size
    #[error("Invalid coordinates at line {line}: {message}")]
    InvalidCoordinates { line: usize, message: String },

    /// Alignment data line appearing outside a chain
    #[error("Data line outside of a chain block at line {line}")]
    DataWithoutHeader { line: usize },

    /// I/O error during parsing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChainParseError {
    /// Line number (1-based) the error refers to, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            ChainParseError::InvalidHeader { line, .. }
            | ChainParseError::InvalidDataLine { line, .. }
            | ChainParseError::InvalidStrand { line, .. }
            | ChainParseError::InvalidNumber { line, .. }
            | ChainParseError::InvalidCoordinates { line, .. }
            | ChainParseError::DataWithoutHeader { line } => Some(*line),
            ChainParseError::Io(_) => None,
        }
    }
}

/// Post-processing step that invoked an external process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostProcessStep {
    Sort,
    Compress,
    Index,
}

impl fmt::Display for PostProcessStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PostProcessStep::Sort => "sort",
            PostProcessStep::Compress => "compress",
            PostProcessStep::Index => "index",
        };
        f.write_str(name)
    }
}

/// Errors from running sort / compress / index processes
#[derive(Debug, Error)]
pub enum ExternalProcessError {
    /// Program could not be started
    #[error("Failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Program exited unsuccessfully
    #[error("`{program}` exited with {status}")]
    Failed { program: String, status: ExitStatus },

    /// Program exceeded its bounded wait and was killed
    #[error("`{program}` did not finish within {}s and was killed", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    /// Program reported success without producing its output
    #[error("`{program}` reported success but {} was not produced", .path.display())]
    MissingOutput { program: String, path: PathBuf },

    /// I/O error while supervising the process or moving its output
    #[error("I/O error around `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for liftover operations
pub type Result<T> = std::result::Result<T, LiftoverError>;

/// Result type alias for chain parsing operations
pub type ChainResult<T> = std::result::Result<T, ChainParseError>;
