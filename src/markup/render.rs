//! Block-to-markup rendering
//!
//! The inverse of translation: a block sequence (as read from the service)
//! renders back to markup text. Rendering is async because embedded
//! spreadsheet blocks require a remote fetch through the
//! [`TabularSource`] collaborator; that fetch degrades to a link
//! placeholder on failure instead of failing the whole render. Output
//! length is unbounded here; truncation belongs to the response formatter.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::blocks::{Block, BlockType, StyledRun};
use crate::client::ApiError;
use crate::markup::lang;

/// Field definitions and records of an embedded spreadsheet.
#[derive(Debug, Clone, Default)]
pub struct TabularGrid {
    /// Column headers.
    pub fields: Vec<String>,
    /// Row values, one inner vector per record.
    pub records: Vec<Vec<String>>,
}

/// External collaborator that resolves a spreadsheet token to its grid.
#[async_trait]
pub trait TabularSource: Send + Sync {
    /// Fetch field definitions and records for a spreadsheet token.
    async fn fetch_grid(&self, token: &str) -> Result<TabularGrid, ApiError>;
}

/// Renders block trees back into markup text.
#[derive(Default)]
pub struct MarkupRenderer {
    tabular: Option<Arc<dyn TabularSource>>,
}

impl MarkupRenderer {
    /// Renderer without spreadsheet support; sheet blocks become link
    /// placeholders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderer that resolves embedded spreadsheets through `source`.
    pub fn with_tabular(source: Arc<dyn TabularSource>) -> Self {
        Self {
            tabular: Some(source),
        }
    }

    /// Render an ordered block sequence to markup.
    ///
    /// Table cells and their nested paragraphs are rendered inside their
    /// table rather than as top-level lines. Block types with no text
    /// payload are silently skipped; unrecognized types fall back to
    /// best-effort text extraction.
    pub async fn render(&self, blocks: &[Block]) -> String {
        let by_id: HashMap<&str, &Block> = blocks
            .iter()
            .map(|block| (block.block_id.as_str(), block))
            .collect();
        let suppressed = table_interior_ids(blocks, &by_id);

        let mut lines: Vec<String> = Vec::new();
        let mut ordinal = 0usize;
        for block in blocks {
            if suppressed.contains(block.block_id.as_str()) {
                continue;
            }
            if block.block_type != BlockType::Ordered {
                ordinal = 0;
            }
            match block.block_type {
                BlockType::Page | BlockType::File | BlockType::Image | BlockType::TableCell => {
                    continue;
                }
                BlockType::Text | BlockType::Equation => {
                    let text = render_runs(&block.styled_runs());
                    if !text.is_empty() {
                        lines.push(text);
                    }
                }
                BlockType::Heading1
                | BlockType::Heading2
                | BlockType::Heading3
                | BlockType::Heading4
                | BlockType::Heading5
                | BlockType::Heading6
                | BlockType::Heading7
                | BlockType::Heading8
                | BlockType::Heading9 => {
                    let level = block.block_type.heading_level().unwrap_or(1);
                    lines.push(format!(
                        "{} {}",
                        "#".repeat(level as usize),
                        render_runs(&block.styled_runs())
                    ));
                }
                BlockType::Bullet => {
                    lines.push(format!("- {}", render_runs(&block.styled_runs())));
                }
                BlockType::Ordered => {
                    ordinal += 1;
                    lines.push(format!("{ordinal}. {}", render_runs(&block.styled_runs())));
                }
                BlockType::Todo => {
                    let marker = if block.todo_done() { "x" } else { " " };
                    lines.push(format!(
                        "- [{marker}] {}",
                        render_runs(&block.styled_runs())
                    ));
                }
                BlockType::Quote => {
                    lines.push(format!("> {}", render_runs(&block.styled_runs())));
                }
                BlockType::Code => {
                    let language = block.code_language().unwrap_or(lang::PLAINTEXT);
                    lines.push(format!(
                        "```{}\n{}\n```",
                        lang::name_for_id(language),
                        block.plain_text()
                    ));
                }
                BlockType::Divider => lines.push("---".to_string()),
                BlockType::Table => {
                    if let Some(rendered) = render_table(block, &by_id) {
                        lines.push(rendered);
                    }
                }
                BlockType::Sheet => {
                    if let Some(rendered) = self.render_sheet(block).await {
                        lines.push(rendered);
                    }
                }
                BlockType::Callout | BlockType::Unknown(_) => {
                    let text = render_runs(&block.styled_runs());
                    if text.is_empty() {
                        debug!(
                            block_id = %block.block_id,
                            tag = block.block_type.tag(),
                            "skipping block with no extractable text"
                        );
                    } else {
                        lines.push(text);
                    }
                }
            }
        }
        lines.join("\n")
    }

    async fn render_sheet(&self, block: &Block) -> Option<String> {
        let token = block.sheet_token()?;
        let Some(source) = &self.tabular else {
            return Some(sheet_placeholder(&token));
        };
        match source.fetch_grid(&token).await {
            Ok(grid) => Some(render_grid(&grid)),
            Err(error) => {
                warn!(%token, %error, "spreadsheet fetch failed; rendering placeholder link");
                Some(sheet_placeholder(&token))
            }
        }
    }
}

fn sheet_placeholder(token: &str) -> String {
    format!("[Embedded spreadsheet]({token})")
}

/// Ids that belong to table interiors: the cells themselves and the
/// paragraph blocks nested inside them.
fn table_interior_ids<'a>(
    blocks: &'a [Block],
    by_id: &HashMap<&'a str, &'a Block>,
) -> HashSet<&'a str> {
    let mut suppressed: HashSet<&str> = HashSet::new();
    for block in blocks {
        let Some(info) = block.table_info() else {
            continue;
        };
        for cell_id in &info.cells {
            if let Some((id, cell)) = by_id.get_key_value(cell_id.as_str()) {
                suppressed.insert(id);
                for child in &cell.children {
                    if let Some((child_id, _)) = by_id.get_key_value(child.as_str()) {
                        suppressed.insert(child_id);
                    }
                }
            }
        }
    }
    suppressed
}

/// Apply style markers to one run: innermost text, then code, strike,
/// italic and bold markers, link wrapping last.
fn styled_text(run: &StyledRun) -> String {
    let mut text = run.text.clone();
    if run.inline_code {
        text = format!("`{text}`");
    }
    if run.strikethrough {
        text = format!("~~{text}~~");
    }
    if run.italic {
        text = format!("*{text}*");
    }
    if run.bold {
        text = format!("**{text}**");
    }
    if let Some(url) = &run.link {
        text = format!("[{text}]({url})");
    }
    text
}

fn render_runs(runs: &[StyledRun]) -> String {
    runs.iter().map(styled_text).collect()
}

/// Newlines and pipes would break a markup table row apart.
fn sanitize_cell(text: &str) -> String {
    text.replace(['\n', '|'], " ")
}

fn cell_text(cell_id: &str, by_id: &HashMap<&str, &Block>) -> String {
    let Some(cell) = by_id.get(cell_id) else {
        return String::new();
    };
    let parts: Vec<String> = cell
        .children
        .iter()
        .filter_map(|child_id| by_id.get(child_id.as_str()))
        .map(|child| render_runs(&child.styled_runs()))
        .filter(|text| !text.is_empty())
        .collect();
    sanitize_cell(&parts.join(" "))
}

fn render_table(block: &Block, by_id: &HashMap<&str, &Block>) -> Option<String> {
    let info = block.table_info()?;
    if info.row_size == 0 || info.column_size == 0 {
        return None;
    }
    let mut rows: Vec<String> = Vec::with_capacity(info.row_size + 1);
    for row in 0..info.row_size {
        let cells: Vec<String> = (0..info.column_size)
            .map(|column| {
                info.cells
                    .get(row * info.column_size + column)
                    .map(|id| cell_text(id, by_id))
                    .unwrap_or_default()
            })
            .collect();
        rows.push(format!("| {} |", cells.join(" | ")));
        if row == 0 {
            rows.push(format!(
                "|{}",
                " --- |".repeat(info.column_size)
            ));
        }
    }
    Some(rows.join("\n"))
}

fn render_grid(grid: &TabularGrid) -> String {
    let mut rows = Vec::with_capacity(grid.records.len() + 2);
    let columns = grid.fields.len().max(1);
    let header: Vec<String> = grid.fields.iter().map(|f| sanitize_cell(f)).collect();
    rows.push(format!("| {} |", header.join(" | ")));
    rows.push(format!("|{}", " --- |".repeat(columns)));
    for record in &grid.records {
        let cells: Vec<String> = record.iter().map(|v| sanitize_cell(v)).collect();
        rows.push(format!("| {} |", cells.join(" | ")));
    }
    rows.join("\n")
}
