//! Remote block-document wire model
//!
//! Types mirroring the document service's block tree: every node carries an
//! integer type tag, an optional parent and an ordered child list, plus a
//! type-keyed payload (`text`, `heading1`, `table`, ...). Blocks read from
//! the service carry server-assigned ids; blocks about to be created are
//! described by [`BlockDescriptor`], which has no id until the create call
//! returns one.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::markup::lang;

/// Block type tags, fixed by the remote service contract.
///
/// Tags must match the service exactly: page=1, text=2, heading1..9=3..11,
/// bullet=12, ordered=13, code=14, quote=15, equation=16, todo=17, then the
/// higher fixed values for callout, divider, file, image, sheet, table and
/// table cells. Anything else round-trips through [`BlockType::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BlockType {
    Page,
    Text,
    Heading1,
    Heading2,
    Heading3,
    Heading4,
    Heading5,
    Heading6,
    Heading7,
    Heading8,
    Heading9,
    Bullet,
    Ordered,
    Code,
    Quote,
    Equation,
    Todo,
    Callout,
    Divider,
    File,
    Image,
    Sheet,
    Table,
    TableCell,
    /// Tag not covered by this engine; preserved verbatim.
    Unknown(i32),
}

impl BlockType {
    /// Integer tag as transmitted on the wire.
    pub fn tag(self) -> i32 {
        match self {
            BlockType::Page => 1,
            BlockType::Text => 2,
            BlockType::Heading1 => 3,
            BlockType::Heading2 => 4,
            BlockType::Heading3 => 5,
            BlockType::Heading4 => 6,
            BlockType::Heading5 => 7,
            BlockType::Heading6 => 8,
            BlockType::Heading7 => 9,
            BlockType::Heading8 => 10,
            BlockType::Heading9 => 11,
            BlockType::Bullet => 12,
            BlockType::Ordered => 13,
            BlockType::Code => 14,
            BlockType::Quote => 15,
            BlockType::Equation => 16,
            BlockType::Todo => 17,
            BlockType::Callout => 19,
            BlockType::Divider => 22,
            BlockType::File => 23,
            BlockType::Image => 27,
            BlockType::Sheet => 30,
            BlockType::Table => 31,
            BlockType::TableCell => 32,
            BlockType::Unknown(tag) => tag,
        }
    }

    /// Inverse of [`BlockType::tag`].
    pub fn from_tag(tag: i32) -> Self {
        match tag {
            1 => BlockType::Page,
            2 => BlockType::Text,
            3 => BlockType::Heading1,
            4 => BlockType::Heading2,
            5 => BlockType::Heading3,
            6 => BlockType::Heading4,
            7 => BlockType::Heading5,
            8 => BlockType::Heading6,
            9 => BlockType::Heading7,
            10 => BlockType::Heading8,
            11 => BlockType::Heading9,
            12 => BlockType::Bullet,
            13 => BlockType::Ordered,
            14 => BlockType::Code,
            15 => BlockType::Quote,
            16 => BlockType::Equation,
            17 => BlockType::Todo,
            19 => BlockType::Callout,
            22 => BlockType::Divider,
            23 => BlockType::File,
            27 => BlockType::Image,
            30 => BlockType::Sheet,
            31 => BlockType::Table,
            32 => BlockType::TableCell,
            other => BlockType::Unknown(other),
        }
    }

    /// Heading type for `level`, clamped to the supported 1..=9 range.
    pub fn heading(level: u8) -> Self {
        Self::from_tag(2 + i32::from(level.clamp(1, 9)))
    }

    /// Heading depth (1..=9) when this is a heading type.
    pub fn heading_level(self) -> Option<u8> {
        match self.tag() {
            tag @ 3..=11 => Some((tag - 2) as u8),
            _ => None,
        }
    }

    /// JSON key under which this type's payload lives on the wire.
    pub fn wire_key(self) -> Option<&'static str> {
        Some(match self {
            BlockType::Page => "page",
            BlockType::Text => "text",
            BlockType::Heading1 => "heading1",
            BlockType::Heading2 => "heading2",
            BlockType::Heading3 => "heading3",
            BlockType::Heading4 => "heading4",
            BlockType::Heading5 => "heading5",
            BlockType::Heading6 => "heading6",
            BlockType::Heading7 => "heading7",
            BlockType::Heading8 => "heading8",
            BlockType::Heading9 => "heading9",
            BlockType::Bullet => "bullet",
            BlockType::Ordered => "ordered",
            BlockType::Code => "code",
            BlockType::Quote => "quote",
            BlockType::Equation => "equation",
            BlockType::Todo => "todo",
            BlockType::Callout => "callout",
            BlockType::Divider => "divider",
            BlockType::File => "file",
            BlockType::Image => "image",
            BlockType::Sheet => "sheet",
            BlockType::Table => "table",
            BlockType::TableCell => "table_cell",
            BlockType::Unknown(_) => return None,
        })
    }

    /// Whether the create-children endpoint accepts this type directly.
    ///
    /// Divider, code and callout blocks are not creatable and must be
    /// written as their documented lossy substitutes instead.
    pub fn is_creatable(self) -> bool {
        !matches!(
            self,
            BlockType::Divider | BlockType::Code | BlockType::Callout
        )
    }
}

impl Default for BlockType {
    fn default() -> Self {
        BlockType::Text
    }
}

impl Serialize for BlockType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.tag())
    }
}

impl<'de> Deserialize<'de> for BlockType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(BlockType::from_tag(i32::deserialize(deserializer)?))
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Hyperlink attached to a text run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Target URL.
    pub url: String,
}

/// Style flags carried by a single text run on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextElementStyle {
    /// Bold styling.
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    /// Italic styling.
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    /// Strikethrough styling.
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,
    /// Inline code styling.
    #[serde(default, skip_serializing_if = "is_false")]
    pub inline_code: bool,
    /// Optional hyperlink.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

/// A styled span of text on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    /// The literal text content.
    pub content: String,
    /// Styling, absent for plain text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_element_style: Option<TextElementStyle>,
}

/// One entry of a block's `elements` array.
///
/// Only text runs are modeled; other element kinds (mentions, embedded
/// formulas) deserialize with `text_run: None` and are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextElement {
    /// Text-run payload, when this element is a text run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_run: Option<TextRun>,
}

/// A contiguous span of text sharing one style combination.
///
/// This is the engine's internal text unit; concatenation order is
/// significant. Styles never overlap across runs: each run carries exactly
/// one style combination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledRun {
    /// The literal text.
    pub text: String,
    /// Bold styling.
    pub bold: bool,
    /// Italic styling.
    pub italic: bool,
    /// Strikethrough styling.
    pub strikethrough: bool,
    /// Inline code styling.
    pub inline_code: bool,
    /// Optional hyperlink target.
    pub link: Option<String>,
}

impl StyledRun {
    /// Unstyled run.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// True when no style flag or link is set.
    pub fn is_plain(&self) -> bool {
        !self.bold && !self.italic && !self.strikethrough && !self.inline_code && self.link.is_none()
    }

    /// Wire representation of this run.
    pub fn to_element(&self) -> TextElement {
        let style = if self.is_plain() {
            None
        } else {
            Some(TextElementStyle {
                bold: self.bold,
                italic: self.italic,
                strikethrough: self.strikethrough,
                inline_code: self.inline_code,
                link: self.link.clone().map(|url| Link { url }),
            })
        };
        TextElement {
            text_run: Some(TextRun {
                content: self.text.clone(),
                text_element_style: style,
            }),
        }
    }

    /// Rebuild a run from a wire element; `None` for non-text elements.
    pub fn from_element(element: &TextElement) -> Option<Self> {
        let run = element.text_run.as_ref()?;
        let style = run.text_element_style.clone().unwrap_or_default();
        Some(Self {
            text: run.content.clone(),
            bold: style.bold,
            italic: style.italic,
            strikethrough: style.strikethrough,
            inline_code: style.inline_code,
            link: style.link.map(|l| l.url),
        })
    }
}

/// Serialize runs into a wire `elements` array.
pub fn elements_to_value(runs: &[StyledRun]) -> Value {
    Value::Array(
        runs.iter()
            .map(|run| serde_json::to_value(run.to_element()).unwrap_or(Value::Null))
            .collect(),
    )
}

/// Table geometry and cell ids parsed from a table block payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    /// Number of rows.
    pub row_size: usize,
    /// Number of columns.
    pub column_size: usize,
    /// Cell block ids in row-major order; length should equal
    /// `row_size * column_size`, missing ids render as blank cells.
    pub cells: Vec<String>,
}

/// A node of the remote document tree.
///
/// The type-specific payload stays in `body` under the type's wire key;
/// typed accessors pull out the pieces the engine cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Server-assigned block id.
    pub block_id: String,
    /// Integer-tagged block type.
    pub block_type: BlockType,
    /// Parent block id; absent only for the document root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Ordered child block ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    /// Type-keyed payload and any fields this engine does not model.
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl Block {
    /// Payload object for this block's own type.
    pub fn payload(&self) -> Option<&Value> {
        self.body.get(self.block_type.wire_key()?)
    }

    /// `elements` array of this block's payload, falling back to a scan of
    /// the whole body for unknown types (best-effort text extraction).
    pub fn text_elements(&self) -> Vec<TextElement> {
        let elements = self
            .payload()
            .and_then(|p| p.get("elements"))
            .or_else(|| {
                self.body
                    .values()
                    .find_map(|v| v.get("elements").filter(|e| e.is_array()))
            });
        match elements {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Styled runs reconstructed from this block's text elements.
    pub fn styled_runs(&self) -> Vec<StyledRun> {
        self.text_elements()
            .iter()
            .filter_map(StyledRun::from_element)
            .collect()
    }

    /// Concatenated plain text of all text runs.
    pub fn plain_text(&self) -> String {
        self.styled_runs()
            .iter()
            .map(|run| run.text.as_str())
            .collect()
    }

    /// Table geometry and cell ids, for table blocks.
    pub fn table_info(&self) -> Option<TableInfo> {
        let payload = self.payload()?;
        let property = payload.get("property")?;
        let row_size = property.get("row_size")?.as_u64()? as usize;
        let column_size = property.get("column_size")?.as_u64()? as usize;
        let cells = payload
            .get("cells")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Some(TableInfo {
            row_size,
            column_size,
            cells,
        })
    }

    /// Code-language tag of a code block.
    pub fn code_language(&self) -> Option<i32> {
        self.payload()?
            .get("style")?
            .get("language")?
            .as_i64()
            .map(|v| v as i32)
    }

    /// Checked state of a todo block.
    pub fn todo_done(&self) -> bool {
        self.payload()
            .and_then(|p| p.get("style"))
            .and_then(|s| s.get("done"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Spreadsheet token of a sheet block.
    pub fn sheet_token(&self) -> Option<String> {
        self.payload()?
            .get("token")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Cell contents for a table that has not been created yet.
///
/// The contents must be stripped from the structural create call and are
/// consumed only after the service returns the generated cell ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingTable {
    /// Number of rows.
    pub row_size: usize,
    /// Number of columns.
    pub column_size: usize,
    /// Per-cell paragraph content in row-major order.
    pub cell_contents: Vec<Vec<StyledRun>>,
}

/// A to-be-created block: everything but the server-assigned id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockDescriptor {
    /// Target block type.
    pub block_type: BlockType,
    /// Text content for text-bearing types.
    pub runs: Vec<StyledRun>,
    /// Code-language tag for code blocks.
    pub language: Option<i32>,
    /// Checked state for todo blocks.
    pub checked: bool,
    /// Pending cell contents for table blocks.
    pub table: Option<PendingTable>,
}

impl BlockDescriptor {
    fn text_bearing(block_type: BlockType, runs: Vec<StyledRun>) -> Self {
        Self {
            block_type,
            runs,
            ..Self::default()
        }
    }

    /// Plain paragraph.
    pub fn paragraph(runs: Vec<StyledRun>) -> Self {
        Self::text_bearing(BlockType::Text, runs)
    }

    /// Heading of the given depth, clamped to 1..=9.
    pub fn heading(level: u8, runs: Vec<StyledRun>) -> Self {
        Self::text_bearing(BlockType::heading(level), runs)
    }

    /// Bulleted list item.
    pub fn bullet(runs: Vec<StyledRun>) -> Self {
        Self::text_bearing(BlockType::Bullet, runs)
    }

    /// Ordered list item.
    pub fn ordered(runs: Vec<StyledRun>) -> Self {
        Self::text_bearing(BlockType::Ordered, runs)
    }

    /// Block quote.
    pub fn quote(runs: Vec<StyledRun>) -> Self {
        Self::text_bearing(BlockType::Quote, runs)
    }

    /// Todo item.
    pub fn todo(checked: bool, runs: Vec<StyledRun>) -> Self {
        Self {
            checked,
            ..Self::text_bearing(BlockType::Todo, runs)
        }
    }

    /// Fenced code block with a resolved language tag.
    pub fn code(language: i32, source: impl Into<String>) -> Self {
        Self {
            language: Some(language),
            ..Self::text_bearing(BlockType::Code, vec![StyledRun::plain(source)])
        }
    }

    /// Horizontal divider.
    pub fn divider() -> Self {
        Self {
            block_type: BlockType::Divider,
            ..Self::default()
        }
    }

    /// Table with pending cell contents.
    pub fn table(row_size: usize, column_size: usize, cell_contents: Vec<Vec<StyledRun>>) -> Self {
        Self {
            block_type: BlockType::Table,
            table: Some(PendingTable {
                row_size,
                column_size,
                cell_contents,
            }),
            ..Self::default()
        }
    }

    /// Whether this descriptor needs the multi-step table protocol.
    pub fn is_table(&self) -> bool {
        self.table.is_some() || self.block_type == BlockType::Table
    }

    fn source_text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    /// Wire form accepted by the create-children endpoint.
    ///
    /// Non-creatable types are substituted by their documented lossy
    /// approximations: a dash rule for dividers, a `[lang]`-tagged
    /// inline-code paragraph for code blocks, a plain paragraph for
    /// callouts. Table descriptors emit structure only; cell contents are
    /// stripped and submitted separately once cell ids exist.
    pub fn to_create_wire(&self) -> Value {
        match self.block_type {
            BlockType::Table => {
                let (rows, cols) = self
                    .table
                    .as_ref()
                    .map(|t| (t.row_size, t.column_size))
                    .unwrap_or((1, 1));
                json!({
                    "block_type": BlockType::Table.tag(),
                    "table": { "property": { "row_size": rows, "column_size": cols } }
                })
            }
            BlockType::Divider => json!({
                "block_type": BlockType::Text.tag(),
                "text": { "elements": elements_to_value(&[StyledRun::plain("---")]) }
            }),
            BlockType::Code => {
                let language = self.language.unwrap_or(lang::PLAINTEXT);
                let tag = StyledRun::plain(format!("[{}] ", lang::name_for_id(language)));
                let body = StyledRun {
                    text: self.source_text(),
                    inline_code: true,
                    ..StyledRun::default()
                };
                json!({
                    "block_type": BlockType::Text.tag(),
                    "text": { "elements": elements_to_value(&[tag, body]) }
                })
            }
            BlockType::Callout => json!({
                "block_type": BlockType::Text.tag(),
                "text": { "elements": elements_to_value(&self.runs) }
            }),
            BlockType::Todo => json!({
                "block_type": BlockType::Todo.tag(),
                "todo": {
                    "elements": elements_to_value(&self.runs),
                    "style": { "done": self.checked }
                }
            }),
            other => {
                let key = other.wire_key().unwrap_or("text");
                json!({
                    "block_type": other.tag(),
                    key: { "elements": elements_to_value(&self.runs) }
                })
            }
        }
    }

    /// Faithful read-side block for this descriptor, with a caller-chosen
    /// id. Used when previewing what a descriptor renders to; the create
    /// path goes through [`BlockDescriptor::to_create_wire`] instead.
    pub fn to_block(&self, block_id: impl Into<String>) -> Block {
        let mut body = Map::new();
        match self.block_type {
            BlockType::Table => {
                let (rows, cols) = self
                    .table
                    .as_ref()
                    .map(|t| (t.row_size, t.column_size))
                    .unwrap_or((1, 1));
                body.insert(
                    "table".to_string(),
                    json!({ "property": { "row_size": rows, "column_size": cols }, "cells": [] }),
                );
            }
            BlockType::Divider => {
                body.insert("divider".to_string(), json!({}));
            }
            BlockType::Code => {
                body.insert(
                    "code".to_string(),
                    json!({
                        "elements": elements_to_value(&self.runs),
                        "style": { "language": self.language.unwrap_or(lang::PLAINTEXT), "wrap": false }
                    }),
                );
            }
            BlockType::Todo => {
                body.insert(
                    "todo".to_string(),
                    json!({
                        "elements": elements_to_value(&self.runs),
                        "style": { "done": self.checked }
                    }),
                );
            }
            other => {
                let key = other.wire_key().unwrap_or("text");
                body.insert(
                    key.to_string(),
                    json!({ "elements": elements_to_value(&self.runs) }),
                );
            }
        }
        Block {
            block_id: block_id.into(),
            block_type: self.block_type,
            parent_id: None,
            children: Vec::new(),
            body,
        }
    }
}
