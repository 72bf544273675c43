//! Inline node types produced by the substitution engine.

use serde::Serialize;

/// An inline element. Exclusively owned by the block, list item, cell, or section
/// title that contains it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum InlineNode {
    /// Substituted text. Special characters appear entity-escaped (`&lt;`).
    Text { value: String },
    /// Passthrough content restored verbatim, exempt from every pass.
    Raw { value: String },
    Span(Span),
    Link(Link),
    Image(InlineImage),
    Footnote(Footnote),
    CrossReference(CrossReference),
    IndexTerm(IndexTerm),
    Callout(Callout),
    /// A forced line break from a trailing ` +`.
    LineBreak,
}

impl InlineNode {
    pub(crate) fn text(value: impl Into<String>) -> Self {
        InlineNode::Text {
            value: value.into(),
        }
    }
}

/// Whether a quoted-text span was matched by an unconstrained (doubled, mid-word) or
/// constrained (word-bounded) marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanForm {
    Constrained,
    Unconstrained,
}

/// Style of a quoted-text span.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum SpanStyle {
    Strong,
    Emphasis,
    Monospace,
    Mark,
    Superscript,
    Subscript,
}

/// A quoted-text span: `*strong*`, `_emphasis_`, `` `monospace` ``, `#mark#`,
/// `^super^`, `~sub~`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Span {
    pub style: SpanStyle,
    pub form: SpanForm,
    pub content: Vec<InlineNode>,
}

/// A link: an autolinked URL or an explicit `link:target[text]` macro.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Link {
    pub target: String,
    /// Link text; empty means the target doubles as the text.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub text: Vec<InlineNode>,
}

/// An inline image macro (`image:target[alt]`).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct InlineImage {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// A footnote macro. The number is assigned in document order by the deferred
/// resolution pass once the full tree exists.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct Footnote {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: Vec<InlineNode>,
    /// 1-based document-order number; 0 until resolved.
    pub number: u32,
}

/// A cross-reference (`<<target>>`, `<<target,text>>`, or `xref:target[text]`).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct CrossReference {
    pub target: String,
    /// Explicit link text; `None` falls back to the referenced section title when the
    /// deferred resolution pass can find it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<InlineNode>>,
}

/// An index term: `(((a, b)))` (concealed) or `((a))` (visible).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[non_exhaustive]
pub struct IndexTerm {
    pub terms: Vec<String>,
    pub visible: bool,
}

/// A callout marker `<N>` inside verbatim content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct Callout {
    pub number: u32,
}
