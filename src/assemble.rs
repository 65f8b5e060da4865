//! Submission assembly: imports, prompt preamble, candidate, trailer.

use std::borrow::Cow;
use std::cell::RefCell;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tree_sitter::{Node, Parser};

const PRINT_MARKER: &str = "print";
const DEFAULT_TARGET: &str = "solve";

thread_local! {
    static PY_PARSER: RefCell<Option<Parser>> = RefCell::new(make_python_parser());
}

fn make_python_parser() -> Option<Parser> {
    let mut p = Parser::new();
    p.set_language(&tree_sitter_python::language()).ok()?;
    Some(p)
}

/// Decides whether a candidate already writes its answer to stdout.
pub trait OutputDetector {
    fn emits_output(&self, signature: &str, raw_text: &str) -> bool;
}

/// Literal substring check for `print`.
pub struct MarkerDetector;

impl OutputDetector for MarkerDetector {
    fn emits_output(&self, _signature: &str, raw_text: &str) -> bool {
        raw_text.contains(PRINT_MARKER)
    }
}

/// Parses the candidate and looks for a real output call.
///
/// Falls back to [`MarkerDetector`] when no parser is available.
pub struct SyntaxDetector;

impl OutputDetector for SyntaxDetector {
    fn emits_output(&self, signature: &str, raw_text: &str) -> bool {
        let source = format!("{}\n{}", signature.trim_end(), raw_text);

        let tree = PY_PARSER.with(|p| {
            p.borrow_mut()
                .as_mut()
                .and_then(|parser| parser.parse(&source, None))
        });

        match tree {
            Some(tree) => contains_output_call(tree.root_node(), &source),
            None => MarkerDetector.emits_output(signature, raw_text),
        }
    }
}

fn contains_output_call(node: Node, source: &str) -> bool {
    if node.kind() == "call" {
        let callee = node
            .child_by_field_name("function")
            .and_then(|f| f.utf8_text(source.as_bytes()).ok());

        if matches!(callee, Some("print") | Some("sys.stdout.write")) {
            return true;
        }
    }

    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| contains_output_call(child, source));
    found
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    Marker,
    Syntax,
}

pub fn detector_for(kind: DetectorKind) -> Box<dyn OutputDetector> {
    match kind {
        DetectorKind::Marker => Box::new(MarkerDetector),
        DetectorKind::Syntax => Box::new(SyntaxDetector),
    }
}

/// Name of the function declared by `signature`, e.g. `solve`.
pub fn target_name(signature: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"def\s+([A-Za-z_]\w*)\s*\(").expect("static regex"));
    re.captures(signature)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Wraps every standalone `target(...)` line of `trailer` in `print(...)`,
/// keeping its indentation.
pub fn wrap_invocations<'a>(trailer: &'a str, target: &str) -> Cow<'a, str> {
    let pattern = format!(r"(?m)^([ \t]*)({}\(.*\))$", regex::escape(target));
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(trailer, "${1}print(${2})"),
        Err(_) => Cow::Borrowed(trailer),
    }
}

pub struct Assembler {
    header: String,
    preamble: String,
    trailer: String,
    signature: String,
    target: String,
    detector: Box<dyn OutputDetector>,
}

impl Assembler {
    pub fn new(
        libraries: &[String],
        preamble: impl Into<String>,
        trailer: impl Into<String>,
        signature: impl Into<String>,
        detector: Box<dyn OutputDetector>,
    ) -> Self {
        let signature = signature.into();
        let target = target_name(&signature)
            .unwrap_or(DEFAULT_TARGET)
            .to_string();

        let header = libraries
            .iter()
            .map(|lib| format!("import {lib}\n"))
            .collect();

        Self {
            header,
            preamble: preamble.into(),
            trailer: trailer.into(),
            signature,
            target,
            detector,
        }
    }

    /// Full, directly runnable program for one candidate.
    pub fn assemble(&self, raw_text: &str) -> String {
        let trailer = if self.detector.emits_output(&self.signature, raw_text) {
            Cow::Borrowed(self.trailer.as_str())
        } else {
            wrap_invocations(&self.trailer, &self.target)
        };

        let mut code = String::with_capacity(
            self.header.len() + self.preamble.len() + raw_text.len() + trailer.len(),
        );
        code.push_str(&self.header);
        code.push_str(&self.preamble);
        code.push_str(raw_text);
        code.push_str(&trailer);
        code
    }
}
