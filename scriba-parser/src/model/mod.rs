//! The typed document tree produced by the block grammar.
//!
//! Nodes are created during the single top-to-bottom parse and never mutated
//! afterward, except for the deferred footnote/cross-reference resolution pass that
//! runs once the full tree exists (forward references are legal).

use serde::Serialize;

mod attributes;
mod inlines;
mod lists;
mod metadata;
mod section;
mod tables;

pub use attributes::{AttributeName, AttributeStore, AttributeValue};
pub use inlines::{
    Callout, CrossReference, Footnote, IndexTerm, InlineImage, InlineNode, Link, Span, SpanForm,
    SpanStyle,
};
pub use lists::{DescriptionList, DescriptionListItem, List, ListItem, ListKind, OrderedStyle};
pub use metadata::BlockMetadata;
pub use section::Section;
pub use tables::{
    Cell, CellContent, CellStyle, ColumnSpec, ColumnWidth, HorizontalAlignment, Row, Table,
    VerticalAlignment,
};

use crate::{Diagnostic, SafeMode};

/// Source line span of a node, 1-indexed and inclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub start_line: usize,
    pub end_line: usize,
}

impl Location {
    #[must_use]
    pub fn new(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line,
        }
    }
}

/// The root node: owns the attribute store, the safe-mode level, the backend
/// identifier and the ordered top-level blocks. Created once per parse.
#[derive(Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Document {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Vec<InlineNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<Revision>,
    pub attributes: AttributeStore,
    pub safe_mode: SafeMode,
    /// Output backend identifier consumed by the (external) renderer layer.
    pub backend: String,
    pub blocks: Vec<Block>,
    /// Structural and directive-resolution defects collected during parsing, kept out
    /// of the content itself.
    pub diagnostics: Vec<Diagnostic>,
    pub location: Location,
}

/// Author information from the document header line (`Name <email>`).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Author {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Revision information from the document header line (`v1.0, 2024-01-01: remark`).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Revision {
    pub number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

/// A block-level node, tagged by context.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "context", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Block {
    Section(Section),
    Paragraph(Paragraph),
    Admonition(Admonition),
    Delimited(DelimitedBlock),
    List(List),
    DescriptionList(DescriptionList),
    Table(TableBlock),
    Image(ImageBlock),
    ThematicBreak(Break),
    PageBreak(Break),
}

/// A run of contiguous non-blank lines with the full substitution pipeline applied.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Paragraph {
    #[serde(skip_serializing_if = "BlockMetadata::is_default")]
    pub metadata: BlockMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Vec<InlineNode>>,
    pub content: Vec<InlineNode>,
    pub location: Location,
}

/// An admonition paragraph or block (`NOTE: text`, `[WARNING]`).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Admonition {
    pub variant: AdmonitionVariant,
    #[serde(skip_serializing_if = "BlockMetadata::is_default")]
    pub metadata: BlockMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Vec<InlineNode>>,
    pub blocks: Vec<Block>,
    pub location: Location,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmonitionVariant {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl AdmonitionVariant {
    pub(crate) fn from_label(label: &str) -> Option<Self> {
        match label {
            "NOTE" => Some(Self::Note),
            "TIP" => Some(Self::Tip),
            "IMPORTANT" => Some(Self::Important),
            "WARNING" => Some(Self::Warning),
            "CAUTION" => Some(Self::Caution),
            _ => None,
        }
    }
}

/// The context a delimited block was fenced with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DelimitedKind {
    /// `--`
    Open,
    /// `----` and markdown-style fenced code
    Listing,
    /// `....`
    Literal,
    /// `====`
    Example,
    /// `****`
    Sidebar,
    /// `____`
    Quote,
    /// `++++`
    Passthrough,
}

impl DelimitedKind {
    /// Verbatim contexts never run the full substitution pipeline on their content.
    #[must_use]
    pub fn is_verbatim(self) -> bool {
        matches!(self, Self::Listing | Self::Literal | Self::Passthrough)
    }
}

/// Payload of a delimited block: nested blocks for compound contexts, substituted
/// verbatim text for listing/literal contexts, raw text for passthrough.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DelimitedContent {
    Blocks(Vec<Block>),
    Verbatim(Vec<InlineNode>),
    Raw(String),
}

/// A region bounded by matching start/end fence lines.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct DelimitedBlock {
    pub kind: DelimitedKind,
    #[serde(skip_serializing_if = "BlockMetadata::is_default")]
    pub metadata: BlockMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Vec<InlineNode>>,
    pub content: DelimitedContent,
    pub location: Location,
}

/// A table block: the [`Table`] payload plus attached metadata.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct TableBlock {
    #[serde(skip_serializing_if = "BlockMetadata::is_default")]
    pub metadata: BlockMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Vec<InlineNode>>,
    pub table: Table,
    pub location: Location,
}

/// A block image macro (`image::target[alt]`).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct ImageBlock {
    #[serde(skip_serializing_if = "BlockMetadata::is_default")]
    pub metadata: BlockMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Vec<InlineNode>>,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    pub location: Location,
}

/// A thematic break (`'''`) or page break (`<<<`).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Break {
    #[serde(skip_serializing_if = "BlockMetadata::is_default")]
    pub metadata: BlockMetadata,
    pub location: Location,
}
