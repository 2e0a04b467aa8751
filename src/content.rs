//! Expected file content with embedded regular expressions.
//!
//! Inside an expected content block, `<regexp:PATTERN/>` stands for any text matched by
//! `PATTERN`; everything else must match literally. `PATTERN` is used verbatim and may
//! contain any character sequence except `/>`.
//!
//! A `<regexp:` without a closing `/>`, or an empty `<regexp:/>`, is kept as plain text.

use regex::Regex;

use crate::error::Result;

const MARKER_OPEN: &str = "<regexp:";
const MARKER_CLOSE: &str = "/>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Pattern(&'a str),
}

fn tokenize(raw: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(offset) = raw[cursor..].find(MARKER_OPEN) {
        let open = cursor + offset;
        let body = open + MARKER_OPEN.len();

        let Some(len) = raw[body..].find(MARKER_CLOSE) else {
            break; // unterminated, the rest is literal
        };
        if len == 0 {
            cursor = body;
            continue;
        }

        if open > literal_start {
            segments.push(Segment::Literal(&raw[literal_start..open]));
        }
        segments.push(Segment::Pattern(&raw[body..body + len]));

        cursor = body + len + MARKER_CLOSE.len();
        literal_start = cursor;
    }

    if literal_start < raw.len() {
        segments.push(Segment::Literal(&raw[literal_start..]));
    }
    segments
}

/// Builds the pattern that whole-content matches `raw`.
///
/// Literal text is escaped and each marker body becomes its own group, so an alternation
/// inside a marker stays inside it. The result is anchored at both ends.
pub fn to_match_pattern(raw: &str) -> String {
    let body: String = tokenize(raw)
        .into_iter()
        .map(|segment| match segment {
            Segment::Literal(text) => regex::escape(text),
            Segment::Pattern(pattern) => format!("(?:{pattern})"),
        })
        .collect();

    format!(r"\A(?:{body})\z")
}

/// Compiles the match pattern of `raw`.
pub fn compile(raw: &str) -> Result<Regex> {
    Ok(Regex::new(&to_match_pattern(raw))?)
}
