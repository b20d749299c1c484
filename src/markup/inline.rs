//! Inline-style tokenizer
//!
//! A single regex alternation splits a line into styled runs. One style
//! classification wins per token span: nested or overlapping styles are not
//! supported, and text between tokens becomes plain runs.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::blocks::StyledRun;

// Ordering inside the alternation matters: `**` must be tried before `*`.
static INLINE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*[^*]+\*\*|\*[^*]+\*|~~[^~]+~~|`[^`]+`|\[[^\]]+\]\([^)\s]+\)")
        .unwrap_or_else(|e| panic!("invalid inline token pattern: {e}"))
});

static LINK_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[([^\]]+)\]\(([^)\s]+)\)$")
        .unwrap_or_else(|e| panic!("invalid link token pattern: {e}"))
});

/// Tokenize one line of markup into an ordered sequence of styled runs.
///
/// Returns an empty sequence for an empty line.
pub fn parse_inline(text: &str) -> Vec<StyledRun> {
    let mut runs = Vec::new();
    let mut cursor = 0;
    for token in INLINE_TOKEN.find_iter(text) {
        if token.start() > cursor {
            runs.push(StyledRun::plain(&text[cursor..token.start()]));
        }
        runs.push(classify(token.as_str()));
        cursor = token.end();
    }
    if cursor < text.len() {
        runs.push(StyledRun::plain(&text[cursor..]));
    }
    runs
}

fn classify(token: &str) -> StyledRun {
    if let Some(inner) = token.strip_prefix("**").and_then(|t| t.strip_suffix("**")) {
        return StyledRun {
            text: inner.to_string(),
            bold: true,
            ..StyledRun::default()
        };
    }
    if let Some(inner) = token.strip_prefix("~~").and_then(|t| t.strip_suffix("~~")) {
        return StyledRun {
            text: inner.to_string(),
            strikethrough: true,
            ..StyledRun::default()
        };
    }
    if let Some(inner) = token.strip_prefix('`').and_then(|t| t.strip_suffix('`')) {
        return StyledRun {
            text: inner.to_string(),
            inline_code: true,
            ..StyledRun::default()
        };
    }
    if let Some(inner) = token.strip_prefix('*').and_then(|t| t.strip_suffix('*')) {
        return StyledRun {
            text: inner.to_string(),
            italic: true,
            ..StyledRun::default()
        };
    }
    if let Some(captures) = LINK_TOKEN.captures(token) {
        return StyledRun {
            text: captures[1].to_string(),
            link: Some(captures[2].to_string()),
            ..StyledRun::default()
        };
    }
    StyledRun::plain(token)
}
