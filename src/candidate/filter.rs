use std::collections::HashSet;

use super::{extract_function, fingerprint, Candidate, Completion};

pub const DEFAULT_MAX_FUNCTION_LEN: usize = 800;

/// Outcome of filtering one generation round.
#[derive(Debug, Clone, Default)]
pub struct FilteredRound {
    /// One extracted function per completion, in input order. Audit only.
    pub all_functions: Vec<String>,
    /// Surviving candidates in completion order; also the attempt order.
    pub candidates: Vec<Candidate>,
}

/// Keeps the first completion for each fingerprint whose extracted function
/// is shorter than `max_len` characters.
pub fn filter_completions(
    completions: &[Completion],
    signature: &str,
    max_len: usize,
) -> FilteredRound {
    let mut seen = HashSet::new();
    let mut round = FilteredRound::default();

    for completion in completions {
        let function = extract_function(signature, &completion.text);

        if function.chars().count() < max_len && seen.insert(fingerprint(&function)) {
            round.candidates.push(Candidate {
                choice: completion.index,
                raw_text: completion.text.clone(),
            });
        }

        round.all_functions.push(function);
    }

    round
}
