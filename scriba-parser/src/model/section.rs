use serde::Serialize;

use super::{Block, BlockMetadata, InlineNode, Location};

/// Section nesting depth. Level 0 is the document title.
pub type SectionLevel = u8;

/// A section of the document.
///
/// Sections form a strict tree: a section's level is at most its parent's level plus
/// one (the grammar clamps violations and records a diagnostic). Numbering and TOC
/// context are derived by traversal; there are no back-references.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Section {
    pub level: SectionLevel,
    pub title: Vec<InlineNode>,
    /// Explicit anchor from `[[id]]` or an inline `[[id]]` suffix on the title line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "BlockMetadata::is_default")]
    pub metadata: BlockMetadata,
    pub blocks: Vec<Block>,
    pub location: Location,
}
