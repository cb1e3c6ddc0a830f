//! Job plans: which files to convert and where their outputs go
//!
//! A [`JobPlan`] is validated once, before any file is opened, so that no two
//! jobs (or a job and its own outputs) can write to the same path.

use crate::core::LiftoverError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// One file to convert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub source_path: PathBuf,
    pub source_compressed: bool,
    /// Final artifact path
    pub dest_path: PathBuf,
    pub dest_compressed: bool,
    /// Plain-text sidecar receiving unmapped source lines
    pub unmapped_path: PathBuf,
    /// Sort, bgzip and tabix-index the destination
    pub needs_index: bool,
}

/// Rule deriving a job's paths from a bare file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingRule {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Assembly tag in source file names, replaced by `dest_tag`
    pub source_tag: String,
    pub dest_tag: String,
}

/// Sidecar name for unmapped records: `x.bed[.gz]` -> `x.unmapped.bed`
///
/// # Examples
/// ```
/// use bed_liftover::pipeline::unmapped_file_name;
///
/// assert_eq!(unmapped_file_name("human_hs37d5.trf.bed"), "human_hs37d5.trf.unmapped.bed");
/// assert_eq!(
///     unmapped_file_name("human_hs37d5.excluded_regions.bed.gz"),
///     "human_hs37d5.excluded_regions.unmapped.bed"
/// );
/// assert_eq!(unmapped_file_name("regions.txt"), "regions.txt.unmapped");
/// ```
pub fn unmapped_file_name(file_name: &str) -> String {
    let base = file_name.strip_suffix(".gz").unwrap_or(file_name);
    match base.find(".bed") {
        Some(idx) => format!("{}.unmapped{}", &base[..idx], &base[idx..]),
        None => format!("{}.unmapped", base),
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

impl JobSpec {
    /// Derive a job from a file name under `rule`
    ///
    /// Compression of the destination follows the source; indexed
    /// destinations are always compressed.
    pub fn from_naming(file_name: &str, needs_index: bool, rule: &NamingRule) -> Self {
        let source_compressed = file_name.ends_with(".gz");
        let mut dest_name = file_name.replace(&rule.source_tag, &rule.dest_tag);
        if needs_index && !dest_name.ends_with(".gz") {
            dest_name.push_str(".gz");
        }

        Self {
            source_path: rule.input_dir.join(file_name),
            source_compressed,
            dest_path: rule.output_dir.join(dest_name),
            dest_compressed: source_compressed || needs_index,
            unmapped_path: rule.output_dir.join(unmapped_file_name(file_name)),
            needs_index,
        }
    }

    /// Uncompressed file that post-processing starts from (`dest` minus `.gz`)
    pub fn staging_path(&self) -> Option<PathBuf> {
        if !self.needs_index {
            return None;
        }
        let name = self.dest_path.to_string_lossy();
        Some(match name.strip_suffix(".gz") {
            Some(stem) => PathBuf::from(stem),
            None => with_suffix(&self.dest_path, ".raw"),
        })
    }

    /// Where the router writes mapped records
    pub fn mapped_output_path(&self) -> PathBuf {
        self.staging_path().unwrap_or_else(|| self.dest_path.clone())
    }

    /// Mapped records are gzip-encoded at write time
    pub fn compresses_mapped_output(&self) -> bool {
        self.dest_compressed && !self.needs_index
    }

    /// Random-access index written next to an indexed destination
    pub fn index_path(&self) -> Option<PathBuf> {
        self.needs_index.then(|| with_suffix(&self.dest_path, ".tbi"))
    }

    /// Short name for messages
    pub fn name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }

    /// Every path this job writes
    fn outputs(&self) -> Vec<(&'static str, PathBuf)> {
        let mut outputs = vec![
            ("destination", self.dest_path.clone()),
            ("unmapped", self.unmapped_path.clone()),
        ];
        if let Some(staging) = self.staging_path() {
            outputs.push(("staging", staging));
        }
        if let Some(index) = self.index_path() {
            outputs.push(("index", index));
        }
        outputs
    }
}

/// Entry of a plan given on the command line: `NAME` or `NAME:index`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEntry {
    pub file_name: String,
    pub needs_index: bool,
}

impl FromStr for JobEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (file_name, needs_index) = match s.rsplit_once(':') {
            Some((name, "index")) => (name, true),
            Some((name, "noindex")) => (name, false),
            Some((_, flag)) => return Err(format!("unknown job flag '{}', expected 'index' or 'noindex'", flag)),
            None => (s, false),
        };
        if file_name.is_empty() {
            return Err("job file name is empty".to_string());
        }
        Ok(Self {
            file_name: file_name.to_string(),
            needs_index,
        })
    }
}

/// Ordered, validated list of jobs
#[derive(Debug, Clone)]
pub struct JobPlan {
    jobs: Vec<JobSpec>,
}

/// Lexical normalization so `out/./a.bed` and `out/a.bed` compare equal
fn normalized(path: &Path) -> PathBuf {
    path.components().collect()
}

impl JobPlan {
    /// Validate and build a plan
    ///
    /// Fails with [`LiftoverError::Configuration`] if the plan is empty, if any
    /// output path is claimed twice, if a job reads one of the plan's outputs,
    /// or if an indexed job's destination does not end in `.gz`.
    pub fn new(jobs: Vec<JobSpec>) -> Result<Self, LiftoverError> {
        if jobs.is_empty() {
            return Err(LiftoverError::Configuration("plan contains no jobs".to_string()));
        }

        let mut owners: HashMap<PathBuf, (usize, &'static str)> = HashMap::new();
        for (i, job) in jobs.iter().enumerate() {
            if job.needs_index && !job.dest_path.to_string_lossy().ends_with(".gz") {
                return Err(LiftoverError::Configuration(format!(
                    "job {} ({}): indexed destination {} must end in .gz",
                    i + 1,
                    job.name(),
                    job.dest_path.display()
                )));
            }

            for (role, path) in job.outputs() {
                if let Some((owner, owner_role)) = owners.insert(normalized(&path), (i, role)) {
                    return Err(LiftoverError::Configuration(format!(
                        "{} path {} of job {} ({}) is already the {} path of job {} ({})",
                        role,
                        path.display(),
                        i + 1,
                        job.name(),
                        owner_role,
                        owner + 1,
                        jobs[owner].name()
                    )));
                }
            }
        }

        for (i, job) in jobs.iter().enumerate() {
            if let Some((owner, role)) = owners.get(&normalized(&job.source_path)) {
                return Err(LiftoverError::Configuration(format!(
                    "source {} of job {} ({}) is the {} path of job {}",
                    job.source_path.display(),
                    i + 1,
                    job.name(),
                    role,
                    owner + 1
                )));
            }
        }

        Ok(Self { jobs })
    }

    /// Build a plan from bare file names under one naming rule
    pub fn from_entries(entries: &[JobEntry], rule: &NamingRule) -> Result<Self, LiftoverError> {
        Self::new(
            entries
                .iter()
                .map(|e| JobSpec::from_naming(&e.file_name, e.needs_index, rule))
                .collect(),
        )
    }

    /// hs37d5 -> hg19 reference annotation set (repeats, excluded regions, expected copy number)
    pub fn hs37d5_to_hg19(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Result<Self, LiftoverError> {
        let rule = NamingRule {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            source_tag: "human_hs37d5".to_string(),
            dest_tag: "human_hg19".to_string(),
        };
        let entries = [
            ("human_hs37d5.trf.bed", false),
            ("human_hs37d5.excluded_regions.bed.gz", true),
            ("human_hs37d5.expected_cn.XX.bed", false),
            ("human_hs37d5.expected_cn.XY.bed", false),
        ]
        .map(|(file_name, needs_index)| JobEntry {
            file_name: file_name.to_string(),
            needs_index,
        });
        Self::from_entries(&entries, &rule)
    }

    pub fn jobs(&self) -> &[JobSpec] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> NamingRule {
        NamingRule {
            input_dir: PathBuf::from("in"),
            output_dir: PathBuf::from("out"),
            source_tag: "hs37d5".to_string(),
            dest_tag: "hg19".to_string(),
        }
    }

    #[test]
    fn test_from_naming_plain() {
        let job = JobSpec::from_naming("human_hs37d5.trf.bed", false, &rule());

        assert_eq!(job.source_path, PathBuf::from("in/human_hs37d5.trf.bed"));
        assert!(!job.source_compressed);
        assert_eq!(job.dest_path, PathBuf::from("out/human_hg19.trf.bed"));
        assert!(!job.dest_compressed);
        assert_eq!(job.unmapped_path, PathBuf::from("out/human_hs37d5.trf.unmapped.bed"));
        assert_eq!(job.mapped_output_path(), job.dest_path);
        assert!(job.staging_path().is_none());
        assert!(job.index_path().is_none());
    }

    #[test]
    fn test_from_naming_indexed() {
        let job = JobSpec::from_naming("human_hs37d5.excluded_regions.bed.gz", true, &rule());

        assert!(job.source_compressed);
        assert!(job.dest_compressed);
        assert!(!job.compresses_mapped_output());
        assert_eq!(job.dest_path, PathBuf::from("out/human_hg19.excluded_regions.bed.gz"));
        assert_eq!(
            job.staging_path(),
            Some(PathBuf::from("out/human_hg19.excluded_regions.bed"))
        );
        assert_eq!(job.mapped_output_path(), PathBuf::from("out/human_hg19.excluded_regions.bed"));
        assert_eq!(
            job.index_path(),
            Some(PathBuf::from("out/human_hg19.excluded_regions.bed.gz.tbi"))
        );
        assert_eq!(
            job.unmapped_path,
            PathBuf::from("out/human_hs37d5.excluded_regions.unmapped.bed")
        );
    }

    #[test]
    fn test_compressed_without_index_compresses_at_write_time() {
        let job = JobSpec::from_naming("a.bed.gz", false, &rule());
        assert!(job.dest_compressed);
        assert!(job.compresses_mapped_output());
    }

    #[test]
    fn test_indexed_plain_name_gets_gz_destination() {
        let job = JobSpec::from_naming("a.bed", true, &rule());
        assert_eq!(job.dest_path, PathBuf::from("out/a.bed.gz"));
        assert_eq!(job.staging_path(), Some(PathBuf::from("out/a.bed")));
    }

    #[test]
    fn test_job_entry_parsing() {
        assert_eq!(
            "x.bed.gz:index".parse::<JobEntry>().unwrap(),
            JobEntry { file_name: "x.bed.gz".to_string(), needs_index: true }
        );
        assert_eq!(
            "x.bed".parse::<JobEntry>().unwrap(),
            JobEntry { file_name: "x.bed".to_string(), needs_index: false }
        );
        assert!("x.bed:fast".parse::<JobEntry>().is_err());
        assert!(":index".parse::<JobEntry>().is_err());
    }

    #[test]
    fn test_duplicate_dest_rejected() {
        let a = JobSpec::from_naming("a.bed", false, &rule());
        let mut b = JobSpec::from_naming("b.bed", false, &rule());
        b.dest_path = a.dest_path.clone();

        let err = JobPlan::new(vec![a, b]).unwrap_err();
        match err {
            LiftoverError::Configuration(msg) => {
                assert!(msg.contains("out/a.bed"), "{}", msg);
                assert!(msg.contains("job 2"), "{}", msg);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_tag_collision_rejected() {
        // Both names collapse to the same destination after tag replacement
        let entries = vec![
            "hs37d5.bed".parse::<JobEntry>().unwrap(),
            "hg19.bed".parse::<JobEntry>().unwrap(),
        ];
        assert!(JobPlan::from_entries(&entries, &rule()).is_err());
    }

    #[test]
    fn test_dest_vs_unmapped_collision_rejected() {
        let a = JobSpec::from_naming("a.bed", false, &rule());
        let mut b = JobSpec::from_naming("b.bed", false, &rule());
        b.unmapped_path = PathBuf::from("out/./a.bed");

        assert!(matches!(
            JobPlan::new(vec![a, b]),
            Err(LiftoverError::Configuration(_))
        ));
    }

    #[test]
    fn test_source_is_output_rejected() {
        let a = JobSpec::from_naming("a.bed", false, &rule());
        let mut b = JobSpec::from_naming("b.bed", false, &rule());
        b.source_path = a.dest_path.clone();

        assert!(JobPlan::new(vec![a, b]).is_err());
    }

    #[test]
    fn test_indexed_dest_must_be_gz() {
        let mut job = JobSpec::from_naming("a.bed", true, &rule());
        job.dest_path = PathBuf::from("out/a.bed");

        assert!(JobPlan::new(vec![job]).is_err());
    }

    #[test]
    fn test_empty_plan_rejected() {
        assert!(JobPlan::new(vec![]).is_err());
    }

    #[test]
    fn test_hs37d5_preset() {
        let plan = JobPlan::hs37d5_to_hg19("in", "out").unwrap();

        assert_eq!(plan.len(), 4);
        let indexed: Vec<&JobSpec> = plan.jobs().iter().filter(|j| j.needs_index).collect();
        assert_eq!(indexed.len(), 1);
        assert_eq!(
            indexed[0].dest_path,
            PathBuf::from("out/human_hg19.excluded_regions.bed.gz")
        );
        assert_eq!(
            plan.jobs()[2].dest_path,
            PathBuf::from("out/human_hg19.expected_cn.XX.bed")
        );
    }
}
