//! Block tree data model.
//!
//! Blocks arrive from a [`TreeStore`](crate::store::TreeStore) in the shape
//! `{"id": .., "type": "<kind>", "has_children": .., "<kind>": {..}}` and are
//! decoded into [`Block`], whose [`BlockContent`] only admits the payload that
//! belongs to each kind.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Opaque identifier of a block in the remote tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for BlockId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquationContent {
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RichTextKind {
    Text { text: TextContent },
    Equation { equation: EquationContent },
    /// Mentions are never produced here, only carried through untouched.
    Mention { mention: Value },
}

/// One run of a block's displayable content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    #[serde(flatten)]
    pub kind: RichTextKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
    /// Rendered text as reported by the store. Read-only on the wire.
    #[serde(default, skip_serializing)]
    pub plain_text: Option<String>,
}

impl RichText {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: RichTextKind::Text {
                text: TextContent {
                    content: content.into(),
                    link: None,
                },
            },
            annotations: None,
            plain_text: None,
        }
    }

    pub fn equation(expression: impl Into<String>) -> Self {
        Self {
            kind: RichTextKind::Equation {
                equation: EquationContent {
                    expression: expression.into(),
                },
            },
            annotations: None,
            plain_text: None,
        }
    }

    pub fn is_equation(&self) -> bool {
        matches!(self.kind, RichTextKind::Equation { .. })
    }
}

/// Block kinds that carry a `rich_text` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKind {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    BulletedListItem,
    NumberedListItem,
    ToDo,
    Toggle,
    Quote,
    Callout,
}

impl TextKind {
    pub const ALL: [TextKind; 10] = [
        TextKind::Paragraph,
        TextKind::Heading1,
        TextKind::Heading2,
        TextKind::Heading3,
        TextKind::BulletedListItem,
        TextKind::NumberedListItem,
        TextKind::ToDo,
        TextKind::Toggle,
        TextKind::Quote,
        TextKind::Callout,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TextKind::Paragraph => "paragraph",
            TextKind::Heading1 => "heading_1",
            TextKind::Heading2 => "heading_2",
            TextKind::Heading3 => "heading_3",
            TextKind::BulletedListItem => "bulleted_list_item",
            TextKind::NumberedListItem => "numbered_list_item",
            TextKind::ToDo => "to_do",
            TextKind::Toggle => "toggle",
            TextKind::Quote => "quote",
            TextKind::Callout => "callout",
        }
    }

    pub fn from_wire(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == kind)
    }

    /// Whether children of this kind are nested sub-content that should be
    /// walked after the block itself.
    pub fn nests_content(self) -> bool {
        matches!(
            self,
            TextKind::BulletedListItem | TextKind::NumberedListItem | TextKind::ToDo | TextKind::Toggle
        )
    }
}

/// Kinds without rich text whose children are ordinary document content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    ColumnList,
    Column,
    SyncedBlock,
}

impl ContainerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContainerKind::ColumnList => "column_list",
            ContainerKind::Column => "column",
            ContainerKind::SyncedBlock => "synced_block",
        }
    }

    pub fn from_wire(kind: &str) -> Option<Self> {
        match kind {
            "column_list" => Some(ContainerKind::ColumnList),
            "column" => Some(ContainerKind::Column),
            "synced_block" => Some(ContainerKind::SyncedBlock),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextBlock {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    /// Only present on `to_do` blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub cells: Vec<Vec<RichText>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockContent {
    Text(TextKind, RichTextBlock),
    Table,
    TableRow(TableRow),
    Equation(EquationContent),
    Container(ContainerKind),
    Unsupported(String),
}

impl BlockContent {
    pub fn type_name(&self) -> &str {
        match self {
            BlockContent::Text(kind, _) => kind.as_str(),
            BlockContent::Table => "table",
            BlockContent::TableRow(_) => "table_row",
            BlockContent::Equation(_) => "equation",
            BlockContent::Container(kind) => kind.as_str(),
            BlockContent::Unsupported(kind) => kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawBlock")]
pub struct Block {
    pub id: BlockId,
    pub has_children: bool,
    pub content: BlockContent,
}

#[derive(Deserialize)]
struct RawBlock {
    id: BlockId,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    has_children: bool,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl TryFrom<RawBlock> for Block {
    type Error = String;

    fn try_from(mut raw: RawBlock) -> Result<Self, Self::Error> {
        let payload = raw.payload.remove(&raw.kind).unwrap_or(Value::Null);
        let decode_err = |e: serde_json::Error| format!("invalid {} payload: {e}", raw.kind);

        let content = if let Some(kind) = TextKind::from_wire(&raw.kind) {
            let mut body: RichTextBlock = if payload.is_null() {
                RichTextBlock::default()
            } else {
                serde_json::from_value(payload).map_err(decode_err)?
            };
            if kind != TextKind::ToDo {
                body.checked = None;
            }
            BlockContent::Text(kind, body)
        } else if let Some(kind) = ContainerKind::from_wire(&raw.kind) {
            BlockContent::Container(kind)
        } else {
            match raw.kind.as_str() {
                "table" => BlockContent::Table,
                "table_row" => {
                    BlockContent::TableRow(serde_json::from_value(payload).map_err(decode_err)?)
                }
                "equation" => {
                    BlockContent::Equation(serde_json::from_value(payload).map_err(decode_err)?)
                }
                other => BlockContent::Unsupported(other.to_string()),
            }
        };

        Ok(Block {
            id: raw.id,
            has_children: raw.has_children,
            content,
        })
    }
}

/// Payload of a block created as part of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewBlock {
    Paragraph(Vec<RichText>),
    Equation(String),
}

impl NewBlock {
    pub fn type_name(&self) -> &'static str {
        match self {
            NewBlock::Paragraph(_) => "paragraph",
            NewBlock::Equation(_) => "equation",
        }
    }

    /// The content a store holds once this payload has been created.
    pub fn into_content(self) -> BlockContent {
        match self {
            NewBlock::Paragraph(rich_text) => BlockContent::Text(
                TextKind::Paragraph,
                RichTextBlock {
                    rich_text,
                    checked: None,
                },
            ),
            NewBlock::Equation(expression) => {
                BlockContent::Equation(EquationContent { expression })
            }
        }
    }
}

#[derive(Serialize)]
struct RichTextBody<'a> {
    rich_text: &'a [RichText],
    #[serde(skip_serializing_if = "Option::is_none")]
    checked: Option<bool>,
}

#[derive(Serialize)]
struct ExpressionBody<'a> {
    expression: &'a str,
}

impl Serialize for NewBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("object", "block")?;
        map.serialize_entry("type", self.type_name())?;
        match self {
            NewBlock::Paragraph(rich_text) => map.serialize_entry(
                "paragraph",
                &RichTextBody {
                    rich_text,
                    checked: None,
                },
            )?,
            NewBlock::Equation(expression) => {
                map.serialize_entry("equation", &ExpressionBody { expression })?
            }
        }
        map.end()
    }
}

/// Content sent when a block is rewritten in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockUpdate {
    RichText {
        kind: TextKind,
        rich_text: Vec<RichText>,
        checked: Option<bool>,
    },
    TableRow {
        cells: Vec<Vec<RichText>>,
    },
}

impl BlockUpdate {
    pub fn type_name(&self) -> &'static str {
        match self {
            BlockUpdate::RichText { kind, .. } => kind.as_str(),
            BlockUpdate::TableRow { .. } => "table_row",
        }
    }
}

#[derive(Serialize)]
struct CellsBody<'a> {
    cells: &'a [Vec<RichText>],
}

impl Serialize for BlockUpdate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            BlockUpdate::RichText {
                kind,
                rich_text,
                checked,
            } => map.serialize_entry(
                kind.as_str(),
                &RichTextBody {
                    rich_text,
                    checked: *checked,
                },
            )?,
            BlockUpdate::TableRow { cells } => {
                map.serialize_entry("table_row", &CellsBody { cells })?
            }
        }
        map.end()
    }
}
