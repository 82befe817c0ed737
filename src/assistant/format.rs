//! Text post-processing for generated answers.
//!
//! `format` normalizes the loose markdown the model produces so it
//! reads well in a plain terminal; `truncate` shortens text on a word
//! boundary. Both are pure.

use std::sync::LazyLock;

use regex::Regex;

/// Appended to truncated text.
pub const ELLIPSIS: &str = "...";

/// `#`, `##` or `###` followed by blanks, then the title.
static HEADER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(#{1,3})[ \t]+(.*)$").expect("header regex is valid"));

/// A whitespace run containing at least two line breaks.
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("paragraph regex is valid"));

/// Normalizes spacing around headers, bullet items and paragraphs.
///
/// Applying it twice yields the same text as applying it once.
pub fn format(text: &str) -> String {
    // Headers are matched at line starts, so leading blanks must go first
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }

    let spaced_headers = HEADER_LINE.replace_all(text, "\n${1} ${2}\n");
    let spaced_lists = space_list_items(&spaced_headers);
    let collapsed = PARAGRAPH_BREAK.replace_all(&spaced_lists, "\n\n");

    collapsed.trim().to_string()
}

/// Inserts a blank line before every `*` line that directly follows a
/// non-empty line.
fn space_list_items(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut previous: Option<&str> = None;

    for line in text.split('\n') {
        if let Some(prev) = previous {
            out.push('\n');
            if line.starts_with('*') && !prev.is_empty() {
                out.push('\n');
            }
        }
        out.push_str(line);
        previous = Some(line);
    }

    out
}

/// Shortens `text` to at most `max_length` chars plus [`ELLIPSIS`].
/// Callers choose the limit; display collapsing passes its threshold.
///
/// The cut lands on the last whitespace at or before `max_length`;
/// only when there is none (or it is the very first char) does the
/// cut fall exactly at `max_length`.
pub fn truncate(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }

    let mut window_end = text.len();
    let mut last_space = None;
    for (index, (offset, ch)) in text.char_indices().enumerate() {
        if index == max_length {
            window_end = offset;
        }
        if index > max_length {
            break;
        }
        if ch.is_whitespace() && offset > 0 {
            last_space = Some(offset);
        }
    }

    let cut = last_space.unwrap_or(window_end);
    format!("{}{ELLIPSIS}", &text[..cut])
}
