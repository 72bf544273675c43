//! Table types.

use serde::Serialize;

use super::{Block, InlineNode, Location};

/// Horizontal alignment for table cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical alignment for table cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlignment {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// Column width specification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ColumnWidth {
    /// Relative weight (e.g. 1, 2, 3).
    Proportional(u32),
    /// Percentage of the table width.
    Percentage(u32),
    /// Content decides (`~`).
    Auto,
}

impl Default for ColumnWidth {
    fn default() -> Self {
        ColumnWidth::Proportional(1)
    }
}

/// Content style of a column or an individual cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum CellStyle {
    /// Paragraph-level markup (`d`).
    #[default]
    Default,
    /// Emphasis (`e`).
    Emphasis,
    /// Strong (`s`).
    Strong,
    /// Monospace (`m`).
    Monospace,
    /// Header styling (`h`).
    Header,
    /// Literal text, verbatim substitutions only (`l`).
    Literal,
    /// Verse: preserved line breaks, normal substitutions (`v`).
    Verse,
    /// Full block content, recursively parsed (`a`).
    Nested,
}

impl CellStyle {
    pub(crate) fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'd' => Some(Self::Default),
            'e' => Some(Self::Emphasis),
            's' => Some(Self::Strong),
            'm' => Some(Self::Monospace),
            'h' => Some(Self::Header),
            'l' => Some(Self::Literal),
            'v' => Some(Self::Verse),
            'a' => Some(Self::Nested),
            _ => None,
        }
    }
}

/// Per-column format from the `cols` attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[non_exhaustive]
pub struct ColumnSpec {
    pub width: ColumnWidth,
    pub halign: HorizontalAlignment,
    pub valign: VerticalAlignment,
    pub style: CellStyle,
}

/// A table: column specs plus header/body/footer row groups.
///
/// Every row, once cell span multipliers are expanded, covers exactly the declared
/// column count; the grammar records a diagnostic and pads/truncates otherwise.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Table {
    pub columns: Vec<ColumnSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<Row>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<Row>,
    pub rows: Vec<Row>,
    pub location: Location,
}

/// A row of cells.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Row {
    pub cells: Vec<Cell>,
}

/// Payload of a cell, depending on its effective style.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum CellContent {
    /// Inline-substituted text (default, emphasis, strong, monospace, header, verse).
    Inline(Vec<InlineNode>),
    /// Verbatim text (literal style).
    Verbatim(Vec<InlineNode>),
    /// Recursively parsed block content (nested style).
    Blocks(Vec<Block>),
}

/// A single table cell.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Cell {
    pub colspan: u32,
    pub rowspan: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halign: Option<HorizontalAlignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valign: Option<VerticalAlignment>,
    pub style: CellStyle,
    pub content: CellContent,
}
