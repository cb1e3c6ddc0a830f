//! bed-liftover - Lift BED annotation tracks between genome assemblies
//!
//! Converts interval files from a source assembly to a target assembly using
//! a UCSC chain file, routes records that cannot be lifted to an unmapped
//! sidecar, and optionally sorts, bgzip-compresses and tabix-indexes the
//! result.
//!
//! # Features
//!
//! - Interval-tree backed point liftover (gzip/bzip2 chain files supported)
//! - Metadata columns carried through untouched
//! - Batch plans validated before any file is written
//! - Jobs run in parallel with rayon
//!
//! # Example
//!
//! ```no_run
//! use bed_liftover::{BatchRunner, ChainOracle, ExternalTools, JobPlan};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let plan = JobPlan::hs37d5_to_hg19("references/hs37d5", "references/hg19")?;
//! let oracle = ChainOracle::open("hs37d5ToHg19.over.chain.gz")?;
//! let tools = ExternalTools::default();
//!
//! let report = BatchRunner::new(&plan, &oracle, &tools).with_threads(4).run();
//! std::process::exit(report.exit_code());
//! # }
//! ```

pub mod core;
pub mod formats;
pub mod pipeline;

// Re-export commonly used types
pub use core::{
    ChainIndex, ChainOracle, ConversionOutcome, CoordinateOracle, IntervalConverter, LiftoverError,
    MappedPoint, OracleLoadError, Strand, UnmappedReason,
};
pub use formats::{convert_bed, route_bed, ConversionStats, Interval};
pub use pipeline::{
    BatchReport, BatchRunner, ExternalTools, JobPlan, JobSpec, PostProcessState,
    PostProcessingPipeline, ToolConfig,
};
