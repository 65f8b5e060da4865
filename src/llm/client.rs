// src/llm/client.rs

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::candidate::Completion;
use crate::config::Config;
use crate::error::{Result, SolveError};
use crate::logger::{ExecutionJournal, LogLevel};

pub trait CompletionProvider {
    /// Requests `n` completions for `prompt`. Zero completions is not an
    /// error.
    fn complete(
        &self,
        prompt: &str,
        n: usize,
        journal: &mut ExecutionJournal,
    ) -> Result<Vec<Completion>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub logprobs: u32,
    pub stop: String,
}

impl SamplingParams {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            logprobs: cfg.logprobs,
            stop: cfg.stop.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
    n: usize,
    logprobs: u32,
    stop: [&'a str; 1],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Option<Vec<ChoiceDelta>>,
}

#[derive(Debug, Deserialize)]
struct ChoiceDelta {
    index: usize,
    #[serde(default)]
    text: String,
}

pub struct CompletionClient {
    http: reqwest::blocking::Client,
    url: String,
    token: String,
    params: SamplingParams,
}

impl CompletionClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: cfg.completion_url.clone(),
            token: cfg.api_token.clone(),
            params: SamplingParams::from_config(cfg),
        })
    }
}

impl CompletionProvider for CompletionClient {
    fn complete(
        &self,
        prompt: &str,
        n: usize,
        journal: &mut ExecutionJournal,
    ) -> Result<Vec<Completion>> {
        let body = CompletionRequest {
            prompt,
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            top_p: self.params.top_p,
            n,
            logprobs: self.params.logprobs,
            stop: [self.params.stop.as_str()],
            stream: true,
        };

        journal.log(LogLevel::Info, format!("Requesting {n} completions..."));

        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(SolveError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        journal.log(LogLevel::Info, "Retrieved completion stream.");
        let completions = read_stream(BufReader::new(resp), journal)?;
        journal.log(
            LogLevel::Info,
            format!("Extracted {} candidates from completion.", completions.len()),
        );

        Ok(completions)
    }
}

/// Comments (`: keep-alive`) and non-data fields carry no completion text.
fn is_sse_control(line: &str) -> bool {
    if line.starts_with(':') {
        return true;
    }
    matches!(
        line.split_once(':').map(|(field, _)| field),
        Some("event" | "id" | "retry")
    )
}

/// Accumulates `data:` lines of a completion stream into one text per
/// choice index, ordered by index.
///
/// Lines that are not valid JSON are skipped with a warning.
pub fn read_stream<R: BufRead>(
    reader: R,
    journal: &mut ExecutionJournal,
) -> Result<Vec<Completion>> {
    let mut outputs: BTreeMap<usize, String> = BTreeMap::new();
    let mut skipped = 0usize;

    for line in reader.lines() {
        let line = line.map_err(|e| SolveError::Stream(e.to_string()))?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        log::debug!("{line}");

        let data = match line.strip_prefix("data:") {
            Some(data) => data.trim_start(),
            None if is_sse_control(line) => continue,
            None => line,
        };
        if data == "[DONE]" {
            continue;
        }

        let chunk: StreamChunk = match serde_json::from_str(data) {
            Ok(c) => c,
            Err(e) => {
                skipped += 1;
                log::debug!("unparseable stream line: {e}");
                continue;
            }
        };

        for choice in chunk.choices.unwrap_or_default() {
            outputs.entry(choice.index).or_default().push_str(&choice.text);
        }
    }

    if skipped > 0 {
        journal.log(
            LogLevel::Warn,
            format!("Skipped {skipped} malformed line(s) in completion stream."),
        );
    }

    Ok(outputs
        .into_iter()
        .map(|(index, text)| Completion { index, text })
        .collect())
}
