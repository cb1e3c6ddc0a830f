//! Sort, block-compress and index a freshly written interval file
//!
//! The pipeline moves one staging file through
//! `RawWritten -> Sorted -> Compressed -> Indexed | CompressedNoIndex`.
//! Sorting and compression failures abort the job. An indexing failure
//! leaves a valid compressed artifact behind and is only reported.

use crate::core::{ExternalProcessError, LiftoverError, PostProcessStep};
use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Default bounded wait for each external program
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(600);

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Where a staging file is in the post-processing lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcessState {
    RawWritten,
    Sorted,
    Compressed,
    Indexed,
    /// Compressed artifact is usable but has no index
    CompressedNoIndex,
}

impl PostProcessState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PostProcessState::Indexed | PostProcessState::CompressedNoIndex)
    }
}

/// The three operations the pipeline delegates to external tools
pub trait PostProcessTools {
    /// Sort `path` in place by chromosome (lexical) then start (numeric)
    fn sort(&self, path: &Path) -> Result<(), ExternalProcessError>;

    /// Block-compress `path`, returning the compressed file it produced
    fn compress(&self, path: &Path) -> Result<PathBuf, ExternalProcessError>;

    /// Build a random-access index `<path>.tbi` for `path`, returning the index file
    fn index(&self, path: &Path) -> Result<PathBuf, ExternalProcessError>;
}

impl<T: PostProcessTools + ?Sized> PostProcessTools for &T {
    fn sort(&self, path: &Path) -> Result<(), ExternalProcessError> {
        (**self).sort(path)
    }

    fn compress(&self, path: &Path) -> Result<PathBuf, ExternalProcessError> {
        (**self).compress(path)
    }

    fn index(&self, path: &Path) -> Result<PathBuf, ExternalProcessError> {
        (**self).index(path)
    }
}

/// Program names and limits for [`ExternalTools`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub sort_program: String,
    pub compress_program: String,
    pub index_program: String,
    pub timeout: Duration,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            sort_program: "sort".to_string(),
            compress_program: "bgzip".to_string(),
            index_program: "tabix".to_string(),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

/// Post-processing through `sort`, `bgzip` and `tabix` processes
#[derive(Debug, Clone, Default)]
pub struct ExternalTools {
    config: ToolConfig,
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Run `command` to completion, killing it once `timeout` has elapsed
pub fn run_with_timeout(
    command: &mut Command,
    program: &str,
    timeout: Duration,
) -> Result<(), ExternalProcessError> {
    debug!("Running {:?}", command);
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .spawn()
        .map_err(|source| ExternalProcessError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let started = Instant::now();
    loop {
        let waited = child.try_wait().map_err(|source| ExternalProcessError::Io {
            program: program.to_string(),
            source,
        })?;

        if let Some(status) = waited {
            if status.success() {
                return Ok(());
            }
            return Err(ExternalProcessError::Failed {
                program: program.to_string(),
                status,
            });
        }

        if started.elapsed() >= timeout {
            // The child may exit between try_wait and kill
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExternalProcessError::Timeout {
                program: program.to_string(),
                timeout,
            });
        }

        thread::sleep(POLL_INTERVAL);
    }
}

fn require_output(program: &str, path: PathBuf) -> Result<PathBuf, ExternalProcessError> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(ExternalProcessError::MissingOutput {
            program: program.to_string(),
            path,
        })
    }
}

impl ExternalTools {
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }
}

impl PostProcessTools for ExternalTools {
    fn sort(&self, path: &Path) -> Result<(), ExternalProcessError> {
        let program = &self.config.sort_program;
        let sorted = with_suffix(path, ".sorted");

        run_with_timeout(
            Command::new(program)
                .env("LC_ALL", "C")
                .args(["-k1,1", "-k2,2n", "-o"])
                .arg(&sorted)
                .arg(path),
            program,
            self.config.timeout,
        )?;

        let sorted = require_output(program, sorted)?;
        fs::rename(&sorted, path).map_err(|source| ExternalProcessError::Io {
            program: program.clone(),
            source,
        })
    }

    fn compress(&self, path: &Path) -> Result<PathBuf, ExternalProcessError> {
        let program = &self.config.compress_program;
        run_with_timeout(
            Command::new(program).arg("-f").arg(path),
            program,
            self.config.timeout,
        )?;
        require_output(program, with_suffix(path, ".gz"))
    }

    fn index(&self, path: &Path) -> Result<PathBuf, ExternalProcessError> {
        let program = &self.config.index_program;
        run_with_timeout(
            Command::new(program).args(["-p", "bed", "-f"]).arg(path),
            program,
            self.config.timeout,
        )?;
        require_output(program, with_suffix(path, ".tbi"))
    }
}

/// Final state of one post-processing run
#[derive(Debug)]
pub struct PostProcessReport {
    pub state: PostProcessState,
    pub artifact: PathBuf,
    /// Set when the state is [`PostProcessState::CompressedNoIndex`]
    pub index_error: Option<ExternalProcessError>,
}

impl PostProcessReport {
    pub fn is_degraded(&self) -> bool {
        self.state == PostProcessState::CompressedNoIndex
    }
}

fn fatal(step: PostProcessStep, path: &Path) -> impl FnOnce(ExternalProcessError) -> LiftoverError + '_ {
    move |source| LiftoverError::ExternalProcess {
        step,
        path: path.to_path_buf(),
        source,
    }
}

/// Drives one staging file through sort, compress and index
pub struct PostProcessingPipeline<T> {
    tools: T,
}

impl<T: PostProcessTools> PostProcessingPipeline<T> {
    pub fn new(tools: T) -> Self {
        Self { tools }
    }

    /// Post-process `raw` into the compressed artifact `dest`
    pub fn run(&self, raw: &Path, dest: &Path) -> Result<PostProcessReport, LiftoverError> {
        let mut state = PostProcessState::RawWritten;
        info!("{}: {:?}", raw.display(), state);

        self.tools.sort(raw).map_err(fatal(PostProcessStep::Sort, raw))?;
        state = PostProcessState::Sorted;
        info!("{}: {:?}", raw.display(), state);

        let produced = self
            .tools
            .compress(raw)
            .map_err(fatal(PostProcessStep::Compress, raw))?;
        if produced != dest {
            fs::rename(&produced, dest).map_err(|e| LiftoverError::io(dest, e))?;
        }
        state = PostProcessState::Compressed;
        info!("{}: {:?}", dest.display(), state);

        // An index from an earlier run must not outlive a failed indexing step
        let index = with_suffix(dest, ".tbi");
        match fs::remove_file(&index) {
            Ok(()) => debug!("Removed previous index {}", index.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(LiftoverError::io(index, e)),
        }

        let report = match self.tools.index(dest) {
            Ok(_) => PostProcessReport {
                state: PostProcessState::Indexed,
                artifact: dest.to_path_buf(),
                index_error: None,
            },
            Err(err) => {
                warn!(
                    "Indexing {} failed, keeping unindexed output: {}",
                    dest.display(),
                    err
                );
                PostProcessReport {
                    state: PostProcessState::CompressedNoIndex,
                    artifact: dest.to_path_buf(),
                    index_error: Some(err),
                }
            }
        };
        info!("{}: {:?}", dest.display(), report.state);

        Ok(report)
    }
}
