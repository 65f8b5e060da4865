//! Problem statements and the prompt built from them.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{Result, SolveError};

/// Stripped from the prompt before it becomes part of a runnable program.
pub const PROMPT_TAG: &str = "<|endoftext|>";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProblemTemplate {
    /// Statement text, already localized.
    pub statement: String,
    /// Code that precedes the solve function (helpers, imports).
    #[serde(default)]
    pub intro: String,
    /// Exact declaration the completion must continue, e.g.
    /// `def solve(N: int) -> int:`.
    pub signature: String,
    /// Input parsing and the call into the solve function.
    #[serde(default)]
    pub outro: String,
}

pub trait ProblemSource {
    fn fetch(&self, contest: &str, problem: &str) -> Result<ProblemTemplate>;
}

/// Reads `<dir>/<contest>_<problem>.toml`.
pub struct LocalProblemSource {
    dir: PathBuf,
}

impl LocalProblemSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, contest: &str, problem: &str) -> PathBuf {
        self.dir.join(format!("{contest}_{problem}.toml"))
    }
}

impl ProblemSource for LocalProblemSource {
    fn fetch(&self, contest: &str, problem: &str) -> Result<ProblemTemplate> {
        let unavailable = |reason: String| SolveError::Problem {
            contest: contest.to_string(),
            problem: problem.to_string(),
            reason,
        };

        let path = self.path_for(contest, problem);
        let raw = fs::read_to_string(&path)
            .map_err(|e| unavailable(format!("{}: {e}", path.display())))?;
        let template: ProblemTemplate =
            toml::from_str(&raw).map_err(|e| unavailable(e.to_string()))?;

        if template.signature.trim().is_empty() {
            return Err(unavailable("empty signature".into()));
        }
        Ok(template)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Sent to the completion provider.
    pub text: String,
    /// Same prompt without the tag; prefixes the candidate in the artifact.
    pub preamble: String,
}

impl Prompt {
    pub fn digest(&self) -> String {
        let mut h = Sha256::new();
        h.update(self.text.as_bytes());
        let mut hex = hex::encode(h.finalize());
        hex.truncate(12);
        hex
    }
}

/// Statement as a module docstring, then the intro, then the signature the
/// model continues from.
pub fn build_prompt(template: &ProblemTemplate) -> Prompt {
    let mut preamble = String::new();

    preamble.push_str("\"\"\"\n");
    for line in template.statement.trim().lines() {
        preamble.push_str(&line.replace("\"\"\"", "'''"));
        preamble.push('\n');
    }
    preamble.push_str("\"\"\"\n\n");

    if !template.intro.trim().is_empty() {
        preamble.push_str(template.intro.trim_end());
        preamble.push_str("\n\n");
    }

    preamble.push_str(template.signature.trim());
    preamble.push('\n');

    Prompt {
        text: format!("{PROMPT_TAG}{preamble}"),
        preamble,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProblemTemplate {
        ProblemTemplate {
            statement: "Given N, print 2N.\n".into(),
            intro: String::new(),
            signature: "def solve(N: int) -> int:".into(),
            outro: "\nN = int(input())\nsolve(N)\n".into(),
        }
    }

    #[test]
    fn preamble_ends_with_the_signature() {
        let prompt = build_prompt(&sample());
        assert!(prompt.preamble.ends_with("def solve(N: int) -> int:\n"));
        assert!(prompt.preamble.starts_with("\"\"\"\nGiven N, print 2N.\n\"\"\"\n"));
    }

    #[test]
    fn tag_only_appears_in_the_request_text() {
        let prompt = build_prompt(&sample());
        assert!(prompt.text.starts_with(PROMPT_TAG));
        assert!(!prompt.preamble.contains(PROMPT_TAG));
        assert_eq!(&prompt.text[PROMPT_TAG.len()..], prompt.preamble);
    }

    #[test]
    fn statement_cannot_close_the_docstring() {
        let mut t = sample();
        t.statement = "a \"\"\" b".into();
        let prompt = build_prompt(&t);
        assert_eq!(prompt.preamble.matches("\"\"\"").count(), 2);
    }

    #[test]
    fn digest_is_short_and_stable() {
        let a = build_prompt(&sample()).digest();
        assert_eq!(a.len(), 12);
        assert_eq!(a, build_prompt(&sample()).digest());
    }

    #[test]
    fn local_source_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("abc300_a.toml"),
            "statement = \"Print N.\"\nsignature = \"def solve(N: int) -> int:\"\noutro = \"solve(int(input()))\\n\"\n",
        )
        .unwrap();

        let source = LocalProblemSource::new(dir.path());
        let t = source.fetch("abc300", "a").unwrap();
        assert_eq!(t.signature, "def solve(N: int) -> int:");
        assert_eq!(t.intro, "");

        let missing = source.fetch("abc300", "b").unwrap_err();
        assert!(matches!(missing, SolveError::Problem { .. }));
    }
}
