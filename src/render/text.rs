//! Text-node escaping and whole-document whitespace normalization.

use regex::Regex;
use std::sync::LazyLock;

// An inline-markup start character preceded by whitespace or opening
// punctuation and followed by non-whitespace would open reST markup.
static RE_MARKUP_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\s'"(\[{</:-])([|*`\[])(\S)"#).unwrap());

// The same, at the very start of a block's text.
static RE_LEADING_MARKUP_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)([|*`\[])(\S)").unwrap());

static RE_TRAILING_BLANKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+\n").unwrap());

static RE_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Strip each line's indentation, double backslashes and escape stray
/// inline-markup start characters. Line breaks, including a final one, are
/// kept.
pub fn escape(text: &str) -> String {
    let stripped = text
        .split('\n')
        .map(|line| line.trim_start().replace('\\', "\\\\"))
        .collect::<Vec<_>>()
        .join("\n");
    RE_MARKUP_START
        .replace_all(&stripped, r"${1}\${2}${3}")
        .into_owned()
}

/// Escape a markup start character opening the text of a block, where no
/// preceding character exists for [`escape`] to match.
pub fn escape_block_start(text: &str) -> String {
    RE_LEADING_MARKUP_START
        .replace(text, r"${1}\${2}${3}")
        .into_owned()
}

/// Final pass over a rendered document: no trailing blanks, at most one
/// blank line in a row, no leading blank lines, one final newline.
pub fn finish(output: &str) -> String {
    let output = RE_TRAILING_BLANKS.replace_all(output, "\n");
    let output = RE_BLANK_LINES.replace_all(&output, "\n\n");
    let body = output.trim_start_matches('\n').trim_end();
    if body.is_empty() {
        return String::new();
    }
    format!("{body}\n")
}
