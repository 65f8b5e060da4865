//! Unattended solver for competitive programming tasks.
//!
//! A round asks a completion model for many continuations of a solve
//! function, keeps the distinct ones below a size ceiling, turns each into a
//! runnable program and checks it against the sample tests with `oj`. The
//! first program that passes is submitted. Every artifact embeds the log of
//! the run that produced it.

pub mod artifact;
pub mod assemble;
pub mod candidate;
pub mod config;
pub mod error;
pub mod judge;
pub mod llm;
pub mod logger;
pub mod pipeline;
pub mod problem;
pub mod retry;
pub mod schedule;

pub use error::{Result, SolveError};
