//! List types.

use serde::Serialize;

use super::{Block, BlockMetadata, InlineNode, Location};

/// Ordered-vs-unordered list kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Unordered,
    Ordered,
}

/// Numbering style of an ordered list, implied by its marker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderedStyle {
    #[default]
    Arabic,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
}

/// A bulleted or numbered list.
///
/// Sibling items share one marker family; a marker-family change starts a new list,
/// either nested under the current item or as a sibling block.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct List {
    pub kind: ListKind,
    /// The marker of the first item, e.g. `*`, `**`, `.`, `1.`, `a.`.
    pub marker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<OrderedStyle>,
    #[serde(skip_serializing_if = "BlockMetadata::is_default")]
    pub metadata: BlockMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Vec<InlineNode>>,
    pub items: Vec<ListItem>,
    pub location: Location,
}

/// A single list item: principal inline text plus any nested list or blocks attached
/// through a `+` continuation line.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct ListItem {
    pub marker: String,
    pub principal: Vec<InlineNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    pub location: Location,
}

/// A description (labeled) list: `term:: description`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct DescriptionList {
    #[serde(skip_serializing_if = "BlockMetadata::is_default")]
    pub metadata: BlockMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Vec<InlineNode>>,
    pub items: Vec<DescriptionListItem>,
    pub location: Location,
}

/// One term/description pair of a description list.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct DescriptionListItem {
    pub term: Vec<InlineNode>,
    /// The delimiter used: `::`, `:::`, `::::`, or `;;`.
    pub delimiter: String,
    /// Inline content on the same line as the term, after the delimiter.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub principal: Vec<InlineNode>,
    /// Block content indented under the term or attached via continuation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub description: Vec<Block>,
    pub location: Location,
}
