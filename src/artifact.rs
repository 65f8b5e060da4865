//! Rendering and writing submission artifacts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::{Result, SolveError};

pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/submission.py");

const KEYS: [&str; 4] = ["code", "execution_log", "candidates", "choice"];

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("static regex"))
}

fn quote_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'+").expect("static regex"))
}

/// Collapses every run of `'` to a single quote so the log cannot close the
/// triple-quoted string it is embedded in.
pub fn collapse_quotes(log: &str) -> String {
    quote_run_re().replace_all(log, "'").into_owned()
}

/// Values substituted into the submission template.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub code: &'a str,
    pub execution_log: &'a str,
    pub candidates: &'a [String],
    pub choice: usize,
}

/// Identity of one artifact file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub contest: String,
    pub problem: String,
    /// Job id, unique within the process and across restarts.
    pub run: String,
    pub round: u32,
    pub choice: usize,
    /// Submission attempt; `None` for the file run against the sample tests.
    pub attempt: Option<u32>,
}

impl ArtifactName {
    pub fn file_name(&self) -> String {
        let attempt = self
            .attempt
            .map(|n| format!("_s{n}"))
            .unwrap_or_default();
        format!(
            "submission_{}_{}_{}_r{}_{}{attempt}.py",
            sanitize(&self.contest),
            sanitize(&self.problem),
            sanitize(&self.run),
            self.round,
            self.choice
        )
    }
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Comment block listing every extracted function of the round.
fn render_candidates(candidates: &[String]) -> String {
    let mut out = String::new();
    for (i, func) in candidates.iter().enumerate() {
        if i > 0 {
            out.push_str("#\n");
        }
        out.push_str(&format!("# ---- candidate {i} ----\n"));
        for line in func.lines() {
            if line.is_empty() {
                out.push_str("#\n");
            } else {
                out.push_str("# ");
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    out.trim_end_matches('\n').to_string()
}

#[derive(Debug, Clone)]
pub struct ArtifactRenderer {
    template: String,
    dir: PathBuf,
}

impl ArtifactRenderer {
    pub fn new(template: impl Into<String>, dir: impl Into<PathBuf>) -> Result<Self> {
        let template = template.into();
        check_template(&template)?;
        Ok(Self {
            template,
            dir: dir.into(),
        })
    }

    /// Uses the template at `path`, or the built-in one when it is missing.
    pub fn load(path: &Path, dir: impl Into<PathBuf>) -> Result<Self> {
        let template = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!(
                    "template {} not found; using built-in submission template",
                    path.display()
                );
                DEFAULT_TEMPLATE.to_string()
            }
            Err(e) => return Err(e.into()),
        };
        Self::new(template, dir)
    }

    /// Single pass substitution; substituted values are never re-expanded.
    pub fn render(&self, ctx: &RenderContext) -> String {
        let log = collapse_quotes(ctx.execution_log);
        let log = log.trim_end_matches('\n');
        let candidates = render_candidates(ctx.candidates);
        let choice = ctx.choice.to_string();

        placeholder_re()
            .replace_all(&self.template, |caps: &Captures| match &caps[1] {
                "code" => ctx.code.to_string(),
                "execution_log" => log.to_string(),
                "candidates" => candidates.clone(),
                "choice" => choice.clone(),
                _ => caps[0].to_string(),
            })
            .into_owned()
    }

    pub fn write(&self, name: &ArtifactName, ctx: &RenderContext) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name.file_name());
        fs::write(&path, self.render(ctx))?;
        Ok(path)
    }
}

fn check_template(template: &str) -> Result<()> {
    for caps in placeholder_re().captures_iter(template) {
        let key = &caps[1];
        if !KEYS.contains(&key) {
            return Err(SolveError::Template(format!("unknown placeholder {{{{ {key} }}}}")));
        }
    }
    if !placeholder_re()
        .captures_iter(template)
        .any(|c| &c[1] == "code")
    {
        return Err(SolveError::Template("template has no {{ code }} placeholder".into()));
    }
    Ok(())
}
