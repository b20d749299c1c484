//! Document mutation planning.
//!
//! The planner turns block descriptors into batched remote mutations:
//! chunked child creation, ranged deletion, replace and move built on top
//! of them, and paginated reads of the full block tree.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::blocks::{Block, BlockDescriptor, BlockType, StyledRun};
use crate::client::{ApiClient, ApiError, CallOptions, Method};
use crate::config::{PlannerConfig, LIST_PAGE_SIZE, MAX_LIST_PAGES};
use crate::markup::MarkupRenderer;

/// Mutation-planning errors.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// A delete or replace range with `end <= start`.
    #[error("invalid block range: end {end} must be greater than start {start}")]
    InvalidRange {
        /// Range start (inclusive).
        start: usize,
        /// Range end (exclusive).
        end: usize,
    },

    /// A move target inside the range being moved.
    #[error("move target {target} falls inside the moved range {start}..{end}")]
    InvalidMoveTarget {
        /// Range start (inclusive).
        start: usize,
        /// Range end (exclusive).
        end: usize,
        /// Requested destination index.
        target: usize,
    },

    /// A range extending past the document's current children.
    #[error("block range {start}..{end} exceeds the document's {len} top-level blocks")]
    RangeOutOfBounds {
        /// Range start (inclusive).
        start: usize,
        /// Range end (exclusive).
        end: usize,
        /// Current top-level block count.
        len: usize,
    },

    /// A remote call failed terminally.
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Deserialize)]
struct BlockPage {
    #[serde(default)]
    items: Vec<Block>,
    #[serde(default)]
    page_token: Option<String>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct CreatedChildren {
    #[serde(default)]
    children: Vec<Block>,
}

#[derive(Debug, Deserialize)]
struct BlockEnvelope {
    block: Block,
}

/// Plans and executes document mutations through an [`ApiClient`].
pub struct MutationPlanner {
    api: Arc<ApiClient>,
    config: PlannerConfig,
}

impl MutationPlanner {
    /// Create a planner with default batching settings.
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self::with_config(api, PlannerConfig::default())
    }

    /// Create a planner with explicit batching settings.
    pub fn with_config(api: Arc<ApiClient>, config: PlannerConfig) -> Self {
        Self { api, config }
    }

    /// Insert `descriptors` as children of `parent_id` starting at
    /// `index`. Returns the number of top-level blocks created.
    ///
    /// Runs of ordinary blocks are flushed in chunks of the configured
    /// batch size; a table interrupts the pending run because its cell
    /// contents need the server-generated cell ids before they can be
    /// written.
    pub async fn insert(
        &self,
        document_id: &str,
        parent_id: &str,
        index: usize,
        descriptors: &[BlockDescriptor],
    ) -> Result<usize, PlannerError> {
        let mut cursor = index;
        let mut pending: Vec<&BlockDescriptor> = Vec::new();

        for descriptor in descriptors {
            if descriptor.is_table() {
                cursor += self.flush_pending(document_id, parent_id, cursor, &mut pending).await?;
                self.insert_table(document_id, parent_id, cursor, descriptor).await?;
                cursor += 1;
            } else {
                pending.push(descriptor);
            }
        }
        cursor += self.flush_pending(document_id, parent_id, cursor, &mut pending).await?;

        Ok(cursor - index)
    }

    /// Delete the top-level children of `parent_id` in `start..end`.
    pub async fn delete_range(
        &self,
        document_id: &str,
        parent_id: &str,
        start: usize,
        end: usize,
    ) -> Result<(), PlannerError> {
        if end <= start {
            return Err(PlannerError::InvalidRange { start, end });
        }

        debug!(document_id, start, end, "Deleting block range");
        let body = json!({ "start_index": start, "end_index": end });
        self.api
            .call(
                Method::Delete,
                &batch_delete_path(document_id, parent_id),
                &revision_query(),
                Some(&body),
                &CallOptions::for_document(document_id),
            )
            .await?;
        Ok(())
    }

    /// Replace `start..end` under `parent_id` with `descriptors`.
    /// Returns the number of blocks inserted.
    pub async fn replace_range(
        &self,
        document_id: &str,
        parent_id: &str,
        start: usize,
        end: usize,
        descriptors: &[BlockDescriptor],
    ) -> Result<usize, PlannerError> {
        self.delete_range(document_id, parent_id, start, end).await?;
        if descriptors.iter().any(BlockDescriptor::is_table) {
            // Let the deletion settle before re-creating structural
            // blocks at the same indices.
            tokio::time::sleep(self.config.settle_delay).await;
        }
        self.insert(document_id, parent_id, start, descriptors).await
    }

    /// Move the top-level blocks in `start..end` to sit before the block
    /// currently at `target`. Returns the number of blocks moved.
    ///
    /// Implemented as read, delete and re-create; a target past the
    /// moved range is adjusted down by the moved count because the
    /// deletion shifts everything after the range.
    pub async fn move_range(
        &self,
        document_id: &str,
        start: usize,
        end: usize,
        target: usize,
    ) -> Result<usize, PlannerError> {
        if end <= start {
            return Err(PlannerError::InvalidRange { start, end });
        }
        if (start..end).contains(&target) {
            return Err(PlannerError::InvalidMoveTarget { start, end, target });
        }

        let blocks = self.fetch_blocks(document_id).await?;
        let root = root_children(&blocks, document_id);
        if end > root.len() || target > root.len() {
            return Err(PlannerError::RangeOutOfBounds {
                start,
                end,
                len: root.len(),
            });
        }

        let by_id: HashMap<&str, &Block> = blocks
            .iter()
            .map(|block| (block.block_id.as_str(), block))
            .collect();
        let descriptors: Vec<BlockDescriptor> = root[start..end]
            .iter()
            .filter_map(|id| by_id.get(id.as_str()))
            .filter_map(|block| block_to_descriptor(block, &by_id))
            .collect();

        self.delete_range(document_id, document_id, start, end).await?;

        let moved = end - start;
        let adjusted = if target >= end { target - moved } else { target };
        self.insert(document_id, document_id, adjusted, &descriptors).await?;
        Ok(moved)
    }

    /// Fetch the document's full block tree, following pagination.
    pub async fn fetch_blocks(&self, document_id: &str) -> Result<Vec<Block>, PlannerError> {
        let mut blocks = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let mut query = vec![("page_size".to_string(), LIST_PAGE_SIZE.to_string())];
            if let Some(token) = &page_token {
                query.push(("page_token".to_string(), token.clone()));
            }
            query.extend(revision_query());

            let page: BlockPage = self
                .api
                .call_data(
                    Method::Get,
                    &blocks_path(document_id),
                    &query,
                    None,
                    &CallOptions::for_document(document_id),
                )
                .await?;

            blocks.extend(page.items);
            if !page.has_more {
                return Ok(blocks);
            }
            page_token = page.page_token;
            if page_token.is_none() {
                warn!(document_id, "Pagination reported more pages without a token");
                return Ok(blocks);
            }
        }

        warn!(
            document_id,
            max_pages = MAX_LIST_PAGES,
            "Stopping block listing at the page cap"
        );
        Ok(blocks)
    }

    /// Fetch the document and render it as markup text.
    pub async fn read_markup(
        &self,
        document_id: &str,
        renderer: &MarkupRenderer,
    ) -> Result<String, PlannerError> {
        let blocks = self.fetch_blocks(document_id).await?;
        Ok(renderer.render(&blocks).await)
    }

    async fn flush_pending(
        &self,
        document_id: &str,
        parent_id: &str,
        index: usize,
        pending: &mut Vec<&BlockDescriptor>,
    ) -> Result<usize, PlannerError> {
        let mut inserted = 0;
        for chunk in pending.chunks(self.config.batch_size) {
            let children: Vec<Value> = chunk.iter().map(|d| d.to_create_wire()).collect();
            debug!(
                document_id,
                count = children.len(),
                index = index + inserted,
                "Creating block batch"
            );
            let body = json!({ "children": children, "index": index + inserted });
            self.api
                .call(
                    Method::Post,
                    &children_path(document_id, parent_id),
                    &revision_query(),
                    Some(&body),
                    &CallOptions::for_document(document_id),
                )
                .await?;
            inserted += chunk.len();
        }
        pending.clear();
        Ok(inserted)
    }

    /// Three-step table creation: create the bare structure, take the
    /// generated cell ids from the create response, then fill each cell
    /// with its pending paragraph. A response that omits the cell ids is
    /// followed by a read-back of the table block.
    async fn insert_table(
        &self,
        document_id: &str,
        parent_id: &str,
        index: usize,
        descriptor: &BlockDescriptor,
    ) -> Result<(), PlannerError> {
        let Some(table) = &descriptor.table else {
            return Ok(());
        };

        let body = json!({ "children": [descriptor.to_create_wire()], "index": index });
        let created: CreatedChildren = self
            .api
            .call_data(
                Method::Post,
                &children_path(document_id, parent_id),
                &revision_query(),
                Some(&body),
                &CallOptions::for_document(document_id),
            )
            .await?;

        let Some(table_block) = created
            .children
            .iter()
            .find(|block| block.block_type == BlockType::Table)
        else {
            warn!(document_id, "Table creation returned no table block");
            return Ok(());
        };

        let cell_ids = match table_block.table_info().filter(|info| !info.cells.is_empty()) {
            Some(info) => info.cells,
            None => {
                self.table_cell_ids(document_id, &table_block.block_id)
                    .await?
            }
        };
        if cell_ids.len() != table.row_size * table.column_size {
            warn!(
                document_id,
                expected = table.row_size * table.column_size,
                actual = cell_ids.len(),
                "Table cell count does not match requested geometry"
            );
        }

        // Lenient zip: extra cells stay empty, extra contents are dropped.
        for (cell_id, runs) in cell_ids.iter().zip(table.cell_contents.iter()) {
            if runs.is_empty() {
                continue;
            }
            let paragraph = BlockDescriptor::paragraph(runs.clone());
            let body = json!({ "children": [paragraph.to_create_wire()], "index": 0 });
            self.api
                .call(
                    Method::Post,
                    &children_path(document_id, cell_id),
                    &revision_query(),
                    Some(&body),
                    &CallOptions::for_document(document_id),
                )
                .await?;
        }
        Ok(())
    }

    /// Read back a freshly created table block and return its generated
    /// cell ids in row-major order.
    async fn table_cell_ids(
        &self,
        document_id: &str,
        table_id: &str,
    ) -> Result<Vec<String>, PlannerError> {
        let envelope: BlockEnvelope = self
            .api
            .call_data(
                Method::Get,
                &block_path(document_id, table_id),
                &revision_query(),
                None,
                &CallOptions::for_document(document_id),
            )
            .await?;

        let block = envelope.block;
        if let Some(info) = block.table_info() {
            if !info.cells.is_empty() {
                return Ok(info.cells);
            }
        }
        Ok(block.children)
    }
}

/// Top-level child ids of the document's page block. The page block
/// shares the document's id.
fn root_children<'a>(blocks: &'a [Block], document_id: &str) -> &'a [String] {
    blocks
        .iter()
        .find(|block| block.block_type == BlockType::Page || block.block_id == document_id)
        .map(|block| block.children.as_slice())
        .unwrap_or(&[])
}

/// Rebuild a creatable descriptor from a fetched block, so a move can
/// re-create what it deleted.
fn block_to_descriptor(
    block: &Block,
    by_id: &HashMap<&str, &Block>,
) -> Option<BlockDescriptor> {
    match block.block_type {
        BlockType::Text => Some(BlockDescriptor::paragraph(block.styled_runs())),
        t if t.heading_level().is_some() => {
            let level = t.heading_level()?;
            Some(BlockDescriptor::heading(level, block.styled_runs()))
        }
        BlockType::Bullet => Some(BlockDescriptor::bullet(block.styled_runs())),
        BlockType::Ordered => Some(BlockDescriptor::ordered(block.styled_runs())),
        BlockType::Quote => Some(BlockDescriptor::quote(block.styled_runs())),
        BlockType::Todo => Some(BlockDescriptor::todo(block.todo_done(), block.styled_runs())),
        BlockType::Code => Some(BlockDescriptor::code(
            block.code_language().unwrap_or(crate::markup::lang::PLAINTEXT),
            block.plain_text(),
        )),
        BlockType::Divider => Some(BlockDescriptor::divider()),
        BlockType::Table => {
            let info = block.table_info()?;
            let cell_contents = info
                .cells
                .iter()
                .map(|cell_id| cell_runs(cell_id, by_id))
                .collect();
            Some(BlockDescriptor::table(
                info.row_size,
                info.column_size,
                cell_contents,
            ))
        }
        _ => {
            warn!(
                block_id = %block.block_id,
                block_type = block.block_type.tag(),
                "Skipping block that cannot be re-created"
            );
            None
        }
    }
}

/// Concatenated runs of a table cell's child paragraphs.
fn cell_runs(cell_id: &str, by_id: &HashMap<&str, &Block>) -> Vec<StyledRun> {
    let Some(cell) = by_id.get(cell_id) else {
        return Vec::new();
    };
    cell.children
        .iter()
        .filter_map(|child| by_id.get(child.as_str()))
        .flat_map(|child| child.styled_runs())
        .collect()
}

fn blocks_path(document_id: &str) -> String {
    format!("/documents/{document_id}/blocks")
}

fn block_path(document_id: &str, block_id: &str) -> String {
    format!("/documents/{document_id}/blocks/{block_id}")
}

fn children_path(document_id: &str, parent_id: &str) -> String {
    format!("/documents/{document_id}/blocks/{parent_id}/children")
}

fn batch_delete_path(document_id: &str, parent_id: &str) -> String {
    format!("/documents/{document_id}/blocks/{parent_id}/children/batch_delete")
}

/// Mutations always address the latest revision.
fn revision_query() -> Vec<(String, String)> {
    vec![("document_revision_id".to_string(), "-1".to_string())]
}
