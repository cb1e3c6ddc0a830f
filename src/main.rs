//! bed-liftover CLI entry point
//!
//! Lifts BED annotation tracks between assemblies, one file (`convert`) or a
//! whole plan of files (`batch`) at a time.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use bed_liftover::core::ChainOracle;
use bed_liftover::pipeline::{
    unmapped_file_name, BatchReport, BatchRunner, ExternalTools, JobEntry, JobPlan, JobSpec,
    JobStatus, NamingRule, PostProcessState, ToolConfig,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "bed-liftover")]
#[command(about = "Lift BED annotation tracks between genome assemblies")]
#[command(version)]
#[command(author = "bed-liftover Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Built-in job plans
#[derive(Clone, Copy, Debug, ValueEnum)]
enum PresetArg {
    /// hs37d5 reference annotations (trf, excluded regions, expected CN) to hg19
    #[value(name = "hs37d5-to-hg19")]
    Hs37d5ToHg19,
}

/// External programs used to sort, compress and index outputs
#[derive(Args, Clone, Debug)]
struct ToolArgs {
    /// Sort program
    #[arg(long = "sort-bin", default_value = "sort")]
    sort_bin: String,
    /// Block compression program
    #[arg(long = "bgzip-bin", default_value = "bgzip")]
    bgzip_bin: String,
    /// Index program
    #[arg(long = "tabix-bin", default_value = "tabix")]
    tabix_bin: String,
    /// Seconds to wait for each external program before killing it
    #[arg(long = "tool-timeout", default_value = "600")]
    tool_timeout: u64,
}

impl From<ToolArgs> for ToolConfig {
    fn from(args: ToolArgs) -> Self {
        ToolConfig {
            sort_program: args.sort_bin,
            compress_program: args.bgzip_bin,
            index_program: args.tabix_bin,
            timeout: Duration::from_secs(args.tool_timeout),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a plan of files from one directory into another
    Batch {
        /// Chain file for coordinate conversion
        #[arg(long)]
        chain: PathBuf,
        /// Directory holding the source files
        #[arg(long = "input-dir")]
        input_dir: PathBuf,
        /// Directory receiving converted and unmapped files
        #[arg(long = "output-dir")]
        output_dir: PathBuf,
        /// File to convert, `NAME` or `NAME:index` (repeatable)
        #[arg(long = "job", conflicts_with = "preset")]
        jobs: Vec<JobEntry>,
        /// Assembly tag in source file names
        #[arg(long = "source-tag", default_value = "")]
        source_tag: String,
        /// Replacement for the source tag in destination names
        #[arg(long = "dest-tag", default_value = "")]
        dest_tag: String,
        /// Use a built-in plan instead of --job
        #[arg(long, value_enum)]
        preset: Option<PresetArg>,
        /// Number of jobs converted concurrently
        #[arg(short = 't', long, default_value = "1")]
        threads: usize,
        #[command(flatten)]
        tools: ToolArgs,
    },
    /// Convert a single file
    Convert {
        /// Chain file for coordinate conversion
        #[arg(long)]
        chain: PathBuf,
        /// Input BED file (plain or gzip)
        input: PathBuf,
        /// Output BED file (gzip when ending in .gz)
        output: PathBuf,
        /// Unmapped records file (default: <input>.unmapped.bed next to the output)
        #[arg(long)]
        unmapped: Option<PathBuf>,
        /// Sort, bgzip and tabix-index the output
        #[arg(long)]
        index: bool,
        #[command(flatten)]
        tools: ToolArgs,
    },
}

fn batch_plan(
    input_dir: PathBuf,
    output_dir: PathBuf,
    jobs: Vec<JobEntry>,
    source_tag: String,
    dest_tag: String,
    preset: Option<PresetArg>,
) -> anyhow::Result<JobPlan> {
    let plan = match preset {
        Some(PresetArg::Hs37d5ToHg19) => JobPlan::hs37d5_to_hg19(input_dir, output_dir)?,
        None => {
            if jobs.is_empty() {
                bail!("No jobs given: pass --job NAME[:index] or --preset");
            }
            if source_tag.is_empty() != dest_tag.is_empty() {
                bail!("--source-tag and --dest-tag must be given together");
            }
            let rule = NamingRule {
                input_dir,
                output_dir,
                source_tag,
                dest_tag,
            };
            JobPlan::from_entries(&jobs, &rule)?
        }
    };
    Ok(plan)
}

fn convert_plan(
    input: PathBuf,
    output: PathBuf,
    unmapped: Option<PathBuf>,
    index: bool,
) -> anyhow::Result<JobPlan> {
    let unmapped_path = match unmapped {
        Some(path) => path,
        None => {
            let name = input
                .file_name()
                .with_context(|| format!("Input path {:?} has no file name", input))?
                .to_string_lossy();
            output
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(unmapped_file_name(&name))
        }
    };

    let job = JobSpec {
        source_compressed: input.extension().is_some_and(|e| e == "gz"),
        dest_compressed: index || output.extension().is_some_and(|e| e == "gz"),
        source_path: input,
        dest_path: output,
        unmapped_path,
        needs_index: index,
    };
    Ok(JobPlan::new(vec![job])?)
}

fn load_oracle(chain_path: &Path) -> anyhow::Result<ChainOracle> {
    let start = Instant::now();
    eprintln!("Loading chain file: {:?}", chain_path);

    let oracle = ChainOracle::open(chain_path)?;

    eprintln!(
        "Chain file loaded in {:.2}s ({} intervals)",
        start.elapsed().as_secs_f64(),
        oracle.index().total_intervals()
    );
    Ok(oracle)
}

fn print_summary(report: &BatchReport, start: Instant) {
    eprintln!("\n=== Conversion Statistics ===");
    for job in &report.jobs {
        match &job.status {
            JobStatus::Completed {
                stats,
                post_process,
            } => {
                let state = match post_process.as_ref().map(|p| p.state) {
                    Some(PostProcessState::Indexed) => " [indexed]",
                    Some(PostProcessState::CompressedNoIndex) => " [NOT indexed]",
                    _ => "",
                };
                eprintln!("{}{}", job.job.dest_path.display(), state);
                eprintln!("  Total records:   {}", stats.total);
                eprintln!("  Mapped:          {}", stats.mapped);
                eprintln!("  Unmapped:        {}", stats.unmapped);
                eprintln!("    - start_unmapped:      {}", stats.start_unmapped);
                eprintln!("    - end_unmapped:        {}", stats.end_unmapped);
                eprintln!("    - chromosome_mismatch: {}", stats.chromosome_mismatch);
            }
            JobStatus::Failed(err) => {
                eprintln!("{} [FAILED]", job.job.dest_path.display());
                eprintln!("  {}", err);
            }
        }
    }
    eprintln!("Jobs:            {}", report.jobs.len());
    eprintln!("Failed:          {}", report.failed_count());
    eprintln!("Without index:   {}", report.degraded_count());
    eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let start = Instant::now();

    // The plan is validated before the chain file is read or any output touched
    let (plan, chain, tools, threads) = match cli.command {
        Commands::Batch {
            chain,
            input_dir,
            output_dir,
            jobs,
            source_tag,
            dest_tag,
            preset,
            threads,
            tools,
        } => (
            batch_plan(input_dir, output_dir, jobs, source_tag, dest_tag, preset)?,
            chain,
            tools,
            threads,
        ),
        Commands::Convert {
            chain,
            input,
            output,
            unmapped,
            index,
            tools,
        } => (convert_plan(input, output, unmapped, index)?, chain, tools, 1),
    };

    let oracle = load_oracle(&chain)?;
    let tools = ExternalTools::new(tools.into());

    let report = BatchRunner::new(&plan, &oracle, &tools)
        .with_threads(threads)
        .run();
    print_summary(&report, start);

    if !report.is_success() {
        bail!(
            "{} of {} jobs failed",
            report.failed_count(),
            report.jobs.len()
        );
    }
    Ok(())
}
