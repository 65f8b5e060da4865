// Thin wrapper over the judge command line tool.
// Every call reports an exit code; nothing is parsed.

use std::path::Path;
use std::process::Command;

use url::Url;

use crate::error::{Result, SolveError};

pub trait JudgeCli {
    /// Fetches sample tests for `url` into `dir`.
    fn download(&self, url: &str, dir: &Path) -> i32;

    /// Runs `command` against every test in `dir`.
    fn test(&self, command: &str, dir: &Path, memory_limit_mb: u32, time_limit_secs: f64) -> i32;

    /// Submits `file` without waiting and without confirmation.
    fn submit(&self, url: &str, file: &Path) -> i32;
}

/// Drives `oj` from online-judge-tools.
pub struct OjCli {
    bin: String,
}

impl OjCli {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    fn run(&self, args: &[String]) -> i32 {
        log::debug!("$ {} {}", self.bin, args.join(" "));

        match Command::new(&self.bin).args(args).status() {
            Ok(status) => status.code().unwrap_or(-1),
            Err(e) => {
                log::error!("failed to run {}: {e}", self.bin);
                -1
            }
        }
    }
}

pub fn download_args(url: &str, dir: &Path) -> Vec<String> {
    vec![
        "download".into(),
        url.into(),
        "--directory".into(),
        dir.display().to_string(),
    ]
}

pub fn test_args(command: &str, dir: &Path, memory_limit_mb: u32, time_limit_secs: f64) -> Vec<String> {
    vec![
        "test".into(),
        "--command".into(),
        command.into(),
        "--directory".into(),
        dir.display().to_string(),
        "--mle".into(),
        memory_limit_mb.to_string(),
        "--tle".into(),
        time_limit_secs.to_string(),
    ]
}

pub fn submit_args(url: &str, file: &Path) -> Vec<String> {
    vec![
        "submit".into(),
        url.into(),
        file.display().to_string(),
        "--wait".into(),
        "0".into(),
        "--yes".into(),
    ]
}

impl JudgeCli for OjCli {
    fn download(&self, url: &str, dir: &Path) -> i32 {
        self.run(&download_args(url, dir))
    }

    fn test(&self, command: &str, dir: &Path, memory_limit_mb: u32, time_limit_secs: f64) -> i32 {
        self.run(&test_args(command, dir, memory_limit_mb, time_limit_secs))
    }

    fn submit(&self, url: &str, file: &Path) -> i32 {
        self.run(&submit_args(url, file))
    }
}

/// `<base>/contests/<contest>/tasks/<contest>_<problem>`
pub fn task_url(base: &str, contest: &str, problem: &str) -> Result<String> {
    let base = if base.ends_with('/') {
        Url::parse(base)
    } else {
        Url::parse(&format!("{base}/"))
    }
    .map_err(|e| SolveError::Config(format!("task_url_base {base:?}: {e}")))?;

    let url = base
        .join(&format!("contests/{contest}/tasks/{contest}_{problem}"))
        .map_err(|e| SolveError::Config(e.to_string()))?;
    Ok(url.to_string())
}
