//! Turning raw model completions into distinct, plausible candidates.

pub mod extract;
pub mod filter;
pub mod fingerprint;

pub use extract::extract_function;
pub use filter::{filter_completions, FilteredRound};
pub use fingerprint::fingerprint;

/// One provider choice, accumulated from streamed deltas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub index: usize,
    pub text: String,
}

/// A completion that survived deduplication and the size ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Originating completion index; used in file names and logs.
    pub choice: usize,
    pub raw_text: String,
}
