//! Markup-to-block translation
//!
//! A single top-to-bottom line scan with one piece of carry-over state: the
//! fenced-code region. Outside a fence, blank lines are skipped and each
//! line is matched against [`LINE_RULES`], an explicit statically ordered
//! table evaluated first-match-wins; a line matching no rule becomes a
//! plain paragraph. The table keeps longer heading prefixes ahead of
//! shorter ones so `## x` never matches the single-`#` rule.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::blocks::BlockDescriptor;
use crate::markup::inline::parse_inline;
use crate::markup::lang;

static ORDERED_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+\.\s+(.*)$").unwrap_or_else(|e| panic!("invalid ordered item pattern: {e}"))
});

/// One entry of the line-rule table.
#[derive(Debug, Clone, Copy)]
enum LineRule {
    Heading(u8),
    TodoChecked,
    TodoUnchecked,
    Bullet,
    Ordered,
    Quote,
    Divider,
}

/// Ordered rule table; evaluation is strictly first-match-wins.
///
/// Todo rules sit ahead of the bullet rule because `- [x] ` begins with the
/// bullet prefix.
const LINE_RULES: &[LineRule] = &[
    LineRule::Heading(9),
    LineRule::Heading(8),
    LineRule::Heading(7),
    LineRule::Heading(6),
    LineRule::Heading(5),
    LineRule::Heading(4),
    LineRule::Heading(3),
    LineRule::Heading(2),
    LineRule::Heading(1),
    LineRule::TodoChecked,
    LineRule::TodoUnchecked,
    LineRule::Bullet,
    LineRule::Ordered,
    LineRule::Quote,
    LineRule::Divider,
];

impl LineRule {
    fn apply(self, line: &str) -> Option<BlockDescriptor> {
        match self {
            LineRule::Heading(level) => {
                let prefix = &"#########"[..level as usize];
                let rest = line.strip_prefix(prefix)?.strip_prefix(' ')?;
                Some(BlockDescriptor::heading(level, parse_inline(rest.trim_start())))
            }
            LineRule::TodoChecked => {
                let rest = line
                    .strip_prefix("- [x] ")
                    .or_else(|| line.strip_prefix("- [X] "))?;
                Some(BlockDescriptor::todo(true, parse_inline(rest)))
            }
            LineRule::TodoUnchecked => {
                let rest = line.strip_prefix("- [ ] ")?;
                Some(BlockDescriptor::todo(false, parse_inline(rest)))
            }
            LineRule::Bullet => {
                let rest = line
                    .strip_prefix("- ")
                    .or_else(|| line.strip_prefix("* "))?;
                Some(BlockDescriptor::bullet(parse_inline(rest)))
            }
            LineRule::Ordered => {
                let captures = ORDERED_ITEM.captures(line)?;
                Some(BlockDescriptor::ordered(parse_inline(&captures[1])))
            }
            LineRule::Quote => {
                let rest = line.strip_prefix("> ")?;
                Some(BlockDescriptor::quote(parse_inline(rest)))
            }
            LineRule::Divider => (line == "---").then(BlockDescriptor::divider),
        }
    }
}

fn match_line(line: &str) -> BlockDescriptor {
    LINE_RULES
        .iter()
        .find_map(|rule| rule.apply(line))
        .unwrap_or_else(|| BlockDescriptor::paragraph(parse_inline(line)))
}

struct FenceState {
    language: i32,
    lines: Vec<String>,
}

impl FenceState {
    fn into_descriptor(self) -> BlockDescriptor {
        BlockDescriptor::code(self.language, self.lines.join("\n"))
    }
}

/// Translate markup text into an ordered sequence of block descriptors.
///
/// Inside a fenced code region, raw lines accumulate verbatim and are never
/// pattern-matched. An unterminated fence is flushed as a code block at end
/// of input.
pub fn translate(markup: &str) -> Vec<BlockDescriptor> {
    let mut descriptors = Vec::new();
    let mut fence: Option<FenceState> = None;

    for raw_line in markup.lines() {
        if let Some(state) = fence.as_mut() {
            if raw_line.trim().starts_with("```") {
                if let Some(state) = fence.take() {
                    descriptors.push(state.into_descriptor());
                }
            } else {
                state.lines.push(raw_line.to_string());
            }
            continue;
        }

        let line = raw_line.trim();
        if let Some(hint) = line.strip_prefix("```") {
            fence = Some(FenceState {
                language: lang::id_for_hint(hint),
                lines: Vec::new(),
            });
            continue;
        }
        if line.is_empty() {
            continue;
        }
        descriptors.push(match_line(line));
    }

    if let Some(state) = fence.take() {
        descriptors.push(state.into_descriptor());
    }
    descriptors
}
