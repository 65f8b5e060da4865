//! Layered settings: defaults, then `config.toml`, then `AUTOSOLVE_*`
//! environment variables (a `.env` file in the working directory counts as
//! environment).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use serde::Deserialize;

use crate::assemble::DetectorKind;
use crate::error::{Result, SolveError};
use crate::retry::RetryPolicy;

const ENV_PREFIX: &str = "AUTOSOLVE_";
const TOKEN_VAR: &str = "OPENAI_TOKEN";

pub const DEFAULT_LIBRARIES: &[&str] = &[
    "math",
    "re",
    "bisect",
    "collections",
    "heapq",
    "itertools",
    "functools",
    "fractions",
    "numpy as np",
    "numpy",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /* completion provider */
    pub completion_url: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub logprobs: u32,
    pub stop: String,
    pub request_timeout_secs: u64,

    /* candidates */
    pub max_function_len: usize,
    pub small_batch: usize,
    pub large_batch: usize,
    pub small_problems: Vec<String>,
    pub libraries: Vec<String>,
    pub output_detection: DetectorKind,

    /* flow */
    pub verify: bool,
    pub max_rounds: u32,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub retry_multiplier: f64,

    /* judge */
    pub judge_bin: String,
    pub python_bin: String,
    pub memory_limit_mb: u32,
    pub time_limit_secs: f64,
    pub task_url_base: String,

    /* files */
    pub work_dir: PathBuf,
    pub template_path: PathBuf,
    pub problems_dir: PathBuf,

    /* schedule */
    pub schedule_at: String,
    pub poll_interval_ms: u64,

    #[serde(skip)]
    pub api_token: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            completion_url: "https://api.openai.com/v1/engines/davinci-codex/completions".into(),
            max_tokens: 500,
            temperature: 0.3,
            top_p: 1.0,
            logprobs: 2,
            stop: "\n\n\n".into(),
            request_timeout_secs: 120,

            max_function_len: crate::candidate::filter::DEFAULT_MAX_FUNCTION_LEN,
            small_batch: 5,
            large_batch: 20,
            small_problems: vec!["a".into()],
            libraries: DEFAULT_LIBRARIES.iter().map(|s| s.to_string()).collect(),
            output_detection: DetectorKind::Syntax,

            verify: true,
            max_rounds: 10,
            retry_attempts: 8,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 30_000,
            retry_multiplier: 2.0,

            judge_bin: "oj".into(),
            python_bin: "python".into(),
            memory_limit_mb: 50,
            time_limit_secs: 1.0,
            task_url_base: "https://atcoder.jp/".into(),

            work_dir: PathBuf::from("."),
            template_path: PathBuf::from("template.py"),
            problems_dir: PathBuf::from("problems"),

            schedule_at: "21:00".into(),
            poll_interval_ms: 100,

            api_token: String::new(),
        }
    }
}

/// Environment layer; every field optional so unset variables keep the
/// lower layer's value.
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    completion_url: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
    top_p: Option<f64>,
    logprobs: Option<u32>,
    stop: Option<String>,
    request_timeout_secs: Option<u64>,
    max_function_len: Option<usize>,
    small_batch: Option<usize>,
    large_batch: Option<usize>,
    small_problems: Option<Vec<String>>,
    libraries: Option<Vec<String>>,
    output_detection: Option<DetectorKind>,
    verify: Option<bool>,
    max_rounds: Option<u32>,
    retry_attempts: Option<u32>,
    retry_base_delay_ms: Option<u64>,
    retry_max_delay_ms: Option<u64>,
    retry_multiplier: Option<f64>,
    judge_bin: Option<String>,
    python_bin: Option<String>,
    memory_limit_mb: Option<u32>,
    time_limit_secs: Option<f64>,
    task_url_base: Option<String>,
    work_dir: Option<PathBuf>,
    template_path: Option<PathBuf>,
    problems_dir: Option<PathBuf>,
    schedule_at: Option<String>,
    poll_interval_ms: Option<u64>,
}

macro_rules! overlay {
    ($cfg:ident, $env:ident; $($field:ident),+ $(,)?) => {
        $(
            if let Some(v) = $env.$field {
                $cfg.$field = v;
            }
        )+
    };
}

impl EnvOverrides {
    fn apply(self, cfg: &mut Config) {
        let env = self;
        overlay!(cfg, env;
            completion_url, max_tokens, temperature, top_p, logprobs, stop,
            request_timeout_secs, max_function_len, small_batch, large_batch,
            small_problems, libraries, output_detection, verify, max_rounds,
            retry_attempts, retry_base_delay_ms, retry_max_delay_ms,
            retry_multiplier, judge_bin, python_bin, memory_limit_mb,
            time_limit_secs, task_url_base, work_dir, template_path,
            problems_dir, schedule_at, poll_interval_ms,
        );
    }
}

impl Config {
    /// Loads every layer and validates the result.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut cfg = match load_file(&config_path())? {
            Some(cfg) => cfg,
            None => Config::default(),
        };

        let env: EnvOverrides = envy::prefixed(ENV_PREFIX)
            .from_env()
            .map_err(|e| SolveError::Config(e.to_string()))?;
        env.apply(&mut cfg);

        cfg.api_token = std::env::var(TOKEN_VAR).unwrap_or_default();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_token.trim().is_empty() {
            return Err(SolveError::Config(format!("{TOKEN_VAR} is not set")));
        }
        if self.small_batch == 0 || self.large_batch == 0 {
            return Err(SolveError::Config("batch sizes must be positive".into()));
        }
        if self.max_function_len == 0 {
            return Err(SolveError::Config("max_function_len must be positive".into()));
        }
        self.schedule_time()?;
        Ok(())
    }

    pub fn schedule_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.schedule_at, "%H:%M")
            .map_err(|e| SolveError::Config(format!("schedule_at {:?}: {e}", self.schedule_at)))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            multiplier: self.retry_multiplier,
        }
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.work_dir.join("artifacts")
    }
}

pub fn config_path() -> PathBuf {
    let mut dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.push("autosolve");
    dir.push("config.toml");
    dir
}

pub fn load_file(path: &Path) -> Result<Option<Config>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    toml::from_str(&raw)
        .map(Some)
        .map_err(|e| SolveError::Config(format!("{}: {e}", path.display())))
}
