//! Batch execution of a job plan
//!
//! Jobs are independent: a job that fails is reported and the rest of the
//! plan still runs. Reports come back in plan order regardless of threading.

use crate::core::{CoordinateOracle, LiftoverError};
use crate::formats::{convert_bed, ConversionStats};
use crate::pipeline::plan::{JobPlan, JobSpec};
use crate::pipeline::postprocess::{PostProcessReport, PostProcessTools, PostProcessingPipeline};
use log::{error, info, warn};
use rayon::prelude::*;
use std::fs;

/// Outcome of one job
#[derive(Debug)]
pub enum JobStatus {
    Completed {
        stats: ConversionStats,
        /// Present for jobs that were sorted, compressed and indexed
        post_process: Option<PostProcessReport>,
    },
    Failed(LiftoverError),
}

#[derive(Debug)]
pub struct JobReport {
    pub job: JobSpec,
    pub status: JobStatus,
}

impl JobReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, JobStatus::Failed(_))
    }

    /// Completed, but the destination has no index
    pub fn is_degraded(&self) -> bool {
        match &self.status {
            JobStatus::Completed {
                post_process: Some(report),
                ..
            } => report.is_degraded(),
            _ => false,
        }
    }

    pub fn stats(&self) -> Option<&ConversionStats> {
        match &self.status {
            JobStatus::Completed { stats, .. } => Some(stats),
            JobStatus::Failed(_) => None,
        }
    }
}

/// Reports for every job of a plan, in plan order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub jobs: Vec<JobReport>,
}

impl BatchReport {
    pub fn failed_count(&self) -> usize {
        self.jobs.iter().filter(|j| j.is_failed()).count()
    }

    pub fn degraded_count(&self) -> usize {
        self.jobs.iter().filter(|j| j.is_degraded()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Process exit status: non-zero iff any job failed fatally
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// Sum of the record counters over completed jobs
    pub fn totals(&self) -> ConversionStats {
        let mut totals = ConversionStats::default();
        for stats in self.jobs.iter().filter_map(JobReport::stats) {
            totals.total += stats.total;
            totals.mapped += stats.mapped;
            totals.unmapped += stats.unmapped;
            totals.skipped += stats.skipped;
            totals.start_unmapped += stats.start_unmapped;
            totals.end_unmapped += stats.end_unmapped;
            totals.chromosome_mismatch += stats.chromosome_mismatch;
        }
        totals
    }
}

/// Runs every job of a plan against one oracle
pub struct BatchRunner<'a, O: ?Sized, T: ?Sized> {
    plan: &'a JobPlan,
    oracle: &'a O,
    tools: &'a T,
    threads: usize,
}

impl<'a, O, T> BatchRunner<'a, O, T>
where
    O: CoordinateOracle + Sync + ?Sized,
    T: PostProcessTools + Sync + ?Sized,
{
    pub fn new(plan: &'a JobPlan, oracle: &'a O, tools: &'a T) -> Self {
        Self {
            plan,
            oracle,
            tools,
            threads: 1,
        }
    }

    /// Number of jobs run concurrently (1 = sequential)
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn run(&self) -> BatchReport {
        let jobs = self.plan.jobs();

        if self.threads > 1 && jobs.len() > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(self.threads).build() {
                Ok(pool) => {
                    let reports: Vec<JobReport> =
                        pool.install(|| jobs.par_iter().map(|job| self.run_job(job)).collect());
                    return BatchReport { jobs: reports };
                }
                Err(e) => warn!("Failed to create thread pool, running jobs sequentially: {}", e),
            }
        }

        BatchReport {
            jobs: jobs.iter().map(|job| self.run_job(job)).collect(),
        }
    }

    fn run_job(&self, job: &JobSpec) -> JobReport {
        info!(
            "Converting {} -> {}",
            job.source_path.display(),
            job.dest_path.display()
        );

        let status = match self.execute(job) {
            Ok((stats, post_process)) => {
                info!(
                    "{}: {} mapped, {} unmapped ({} start_unmapped, {} end_unmapped, {} chromosome_mismatch)",
                    job.name(),
                    stats.mapped,
                    stats.unmapped,
                    stats.start_unmapped,
                    stats.end_unmapped,
                    stats.chromosome_mismatch
                );
                JobStatus::Completed { stats, post_process }
            }
            Err(err) => {
                error!("{}: {}", job.name(), err);
                JobStatus::Failed(err)
            }
        };

        JobReport {
            job: job.clone(),
            status,
        }
    }

    fn execute(&self, job: &JobSpec) -> Result<(ConversionStats, Option<PostProcessReport>), LiftoverError> {
        for path in [&job.dest_path, &job.unmapped_path] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| LiftoverError::io(parent, e))?;
            }
        }

        let stats = convert_bed(job, self.oracle)?;

        let post_process = match job.staging_path() {
            Some(staging) => Some(PostProcessingPipeline::new(self.tools).run(&staging, &job.dest_path)?),
            None => None,
        };

        Ok((stats, post_process))
    }
}
