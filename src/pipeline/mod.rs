//! Batch orchestration: job plans, post-processing and execution

mod plan;
mod postprocess;
mod runner;

pub use plan::{unmapped_file_name, JobEntry, JobPlan, JobSpec, NamingRule};
pub use postprocess::{
    run_with_timeout, ExternalTools, PostProcessReport, PostProcessState, PostProcessTools,
    PostProcessingPipeline, ToolConfig, DEFAULT_TOOL_TIMEOUT,
};
pub use runner::{BatchReport, BatchRunner, JobReport, JobStatus};
