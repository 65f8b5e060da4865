//! Generation, verification and submission of candidates.

pub mod orchestrator;
pub mod submit;
pub mod verify;

use std::cell::Cell;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::artifact::ArtifactRenderer;
use crate::assemble::DetectorKind;
use crate::candidate::Candidate;
use crate::config::Config;
use crate::error::Result;
use crate::judge::{task_url, JudgeCli};
use crate::llm::CompletionProvider;
use crate::retry::{RetryPolicy, Sleeper};

pub use orchestrator::Submitted;
pub use verify::{Accepted, RoundReport, RoundState, Verdict};

/// The (contest, problem) pair being solved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub contest: String,
    pub problem: String,
    pub url: String,
}

impl Task {
    pub fn new(contest: &str, problem: &str, url_base: &str) -> Result<Self> {
        Ok(Self {
            contest: contest.to_string(),
            problem: problem.to_string(),
            url: task_url(url_base, contest, problem)?,
        })
    }

    pub fn test_dir(&self, work_dir: &Path) -> PathBuf {
        work_dir
            .join("tests")
            .join(format!("{}_{}", self.contest, self.problem))
    }
}

/// One generation round after filtering.
#[derive(Debug, Clone)]
pub struct Round {
    /// Job this round belongs to.
    pub run: String,
    pub number: u32,
    pub all_functions: Vec<String>,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_function_len: usize,
    pub small_batch: usize,
    pub large_batch: usize,
    pub small_problems: Vec<String>,
    pub libraries: Vec<String>,
    pub detector: DetectorKind,
    pub verify: bool,
    /// `0` means no limit.
    pub max_rounds: u32,
    pub retry: RetryPolicy,
    pub python_bin: String,
    pub memory_limit_mb: u32,
    pub time_limit_secs: f64,
    pub work_dir: PathBuf,
}

impl PipelineSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            max_function_len: cfg.max_function_len,
            small_batch: cfg.small_batch,
            large_batch: cfg.large_batch,
            small_problems: cfg.small_problems.clone(),
            libraries: cfg.libraries.clone(),
            detector: cfg.output_detection,
            verify: cfg.verify,
            max_rounds: cfg.max_rounds,
            retry: cfg.retry_policy(),
            python_bin: cfg.python_bin.clone(),
            memory_limit_mb: cfg.memory_limit_mb,
            time_limit_secs: cfg.time_limit_secs,
            work_dir: cfg.work_dir.clone(),
        }
    }

    /// Easy problems get fewer samples per round.
    pub fn batch_size(&self, problem: &str) -> usize {
        if self.small_problems.iter().any(|p| p.eq_ignore_ascii_case(problem)) {
            self.small_batch
        } else {
            self.large_batch
        }
    }
}

pub struct Pipeline<'a> {
    provider: &'a dyn CompletionProvider,
    judge: &'a dyn JudgeCli,
    sleeper: &'a dyn Sleeper,
    renderer: ArtifactRenderer,
    settings: PipelineSettings,
    jobs: Cell<u32>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        provider: &'a dyn CompletionProvider,
        judge: &'a dyn JudgeCli,
        sleeper: &'a dyn Sleeper,
        renderer: ArtifactRenderer,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            provider,
            judge,
            sleeper,
            renderer,
            settings,
            jobs: Cell::new(0),
        }
    }

    /// Start time of the job plus a per-process sequence number.
    fn next_run_id(&self) -> String {
        let seq = self.jobs.get() + 1;
        self.jobs.set(seq);
        format!("{}-{seq}", Local::now().format("%Y%m%d%H%M%S"))
    }
}
