use std::io;

use thiserror::Error;

pub type Result<T, E = SolveError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion endpoint returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("failed to read completion stream: {0}")]
    Stream(String),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("template error: {0}")]
    Template(String),

    #[error("problem {contest}_{problem} unavailable: {reason}")]
    Problem {
        contest: String,
        problem: String,
        reason: String,
    },

    #[error("no candidate survived filtering")]
    NoCandidates,

    #[error("{operation} still failing after {attempts} attempts: {last_error}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    #[error("no candidate passed verification within {rounds} rounds")]
    RoundBudgetExhausted { rounds: u32 },
}
