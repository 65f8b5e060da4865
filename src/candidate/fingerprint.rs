use std::sync::OnceLock;

use regex::Regex;

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)#.+$").expect("static regex"))
}

fn noise_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s()]").expect("static regex"))
}

/// Normalized signature of a function body used for duplicate detection.
///
/// Comments run from `#` to end of line; markers inside string literals are
/// not special-cased. Whitespace and parentheses are dropped entirely.
pub fn fingerprint(function: &str) -> String {
    let stripped = comment_re().replace_all(function, "");
    noise_re().replace_all(&stripped, "").into_owned()
}
