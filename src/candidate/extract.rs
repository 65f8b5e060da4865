/// Pulls the indented body that follows `signature` out of a completion.
///
/// The first line is always the trimmed signature, whether or not the model
/// repeated it. Blank lines directly after the signature are dropped; the
/// body ends at the first non-blank line that does not start with a space
/// or tab.
pub fn extract_function(signature: &str, raw_output: &str) -> String {
    let mut lines = vec![signature.trim().to_string()];

    for line in split_lines(raw_output) {
        if lines.len() == 1 && line.is_empty() {
            continue;
        }
        if !line.is_empty() && !line.starts_with(&[' ', '\t'][..]) {
            break;
        }
        lines.push(line.trim_end().to_string());
    }

    lines.join("\n")
}

/// Line boundaries as Python's `str.splitlines` sees them.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Splits on every line break, treating `\r\n` as one. No trailing empty
/// line is produced for a terminating break.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&text[start..i]);
        start = i + c.len_utf8();
        if c == '\r' {
            if let Some(&(j, '\n')) = chars.peek() {
                chars.next();
                start = j + 1;
            }
        }
    }

    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}
