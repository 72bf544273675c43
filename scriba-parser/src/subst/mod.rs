//! The substitution engine: named, composable text-transform passes applied to
//! inline text in a fixed, semantically significant order.
//!
//! Pass order is load-bearing. When all passes are active they run as: special-char
//! escaping, quoted-text styling, attribute interpolation, inline macros, typographic
//! replacements, post-replacements, callout markers. Each block context declares which
//! subset is active; verbatim contexts run far fewer passes than prose, passthrough
//! contexts run none.
//!
//! Structural passes (quotes, macros) rewrite the text with control-character markers
//! and placeholder tokens; [`Substitutor::finalize`] turns the marked text into the
//! final [`InlineNode`] tree. Passthrough content is extracted into placeholder slots
//! before any pass can touch it and restored verbatim at the very end.

use crate::{
    AttributeStore, InlineNode, Span, SpanForm, SpanStyle,
    diagnostics::Diagnostics,
};

mod attributes;
mod macros;
mod quotes;
mod replacements;
mod special_chars;

/// A named substitution pass.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[non_exhaustive]
pub enum Substitution {
    SpecialChars,
    Quotes,
    Attributes,
    Macros,
    Replacements,
    PostReplacements,
    Callouts,
}

impl From<&str> for Substitution {
    fn from(value: &str) -> Self {
        match value {
            "quotes" | "q" => Substitution::Quotes,
            "attributes" | "a" => Substitution::Attributes,
            "macros" | "m" => Substitution::Macros,
            "replacements" | "r" => Substitution::Replacements,
            "post_replacements" | "p" => Substitution::PostReplacements,
            "callouts" => Substitution::Callouts,
            "specialchars" | "c" | "" => Substitution::SpecialChars,
            unknown => {
                tracing::warn!(substitution = %unknown, "unknown substitution name, using specialchars");
                Substitution::SpecialChars
            }
        }
    }
}

/// Escaping only.
pub const BASIC: &[Substitution] = &[Substitution::SpecialChars];

/// Attribute-entry values and other header text.
pub const HEADER: &[Substitution] = &[Substitution::SpecialChars, Substitution::Attributes];

/// Normal prose: everything except callouts.
pub const NORMAL: &[Substitution] = &[
    Substitution::SpecialChars,
    Substitution::Quotes,
    Substitution::Attributes,
    Substitution::Macros,
    Substitution::Replacements,
    Substitution::PostReplacements,
];

/// Listing and literal content: escaping plus callout markers.
pub const VERBATIM: &[Substitution] = &[Substitution::SpecialChars, Substitution::Callouts];

/// Passthrough content: nothing at all.
pub const PASS: &[Substitution] = &[];

// Control characters the structural passes weave into the working text. None of them
// can occur in normalized input lines.
pub(crate) const PLACEHOLDER_DELIM: char = '\u{7}';
pub(crate) const SPAN_OPEN: char = '\u{e}';
pub(crate) const SPAN_CLOSE: char = '\u{f}';
pub(crate) const LINE_BREAK_MARKER: char = '\u{1b}';

/// One-char codes identifying a span's style and form inside open/close markers.
pub(crate) fn span_code(style: SpanStyle, form: SpanForm) -> char {
    match (style, form) {
        (SpanStyle::Strong, SpanForm::Constrained) => '\u{11}',
        (SpanStyle::Strong, SpanForm::Unconstrained) => '\u{12}',
        (SpanStyle::Emphasis, SpanForm::Constrained) => '\u{13}',
        (SpanStyle::Emphasis, SpanForm::Unconstrained) => '\u{14}',
        (SpanStyle::Monospace, SpanForm::Constrained) => '\u{15}',
        (SpanStyle::Monospace, SpanForm::Unconstrained) => '\u{16}',
        (SpanStyle::Mark, SpanForm::Constrained) => '\u{17}',
        (SpanStyle::Mark, SpanForm::Unconstrained) => '\u{18}',
        (SpanStyle::Superscript, SpanForm::Constrained | SpanForm::Unconstrained) => '\u{19}',
        (SpanStyle::Subscript, SpanForm::Constrained | SpanForm::Unconstrained) => '\u{1a}',
    }
}

fn decode_span_code(code: char) -> Option<(SpanStyle, SpanForm)> {
    match code {
        '\u{11}' => Some((SpanStyle::Strong, SpanForm::Constrained)),
        '\u{12}' => Some((SpanStyle::Strong, SpanForm::Unconstrained)),
        '\u{13}' => Some((SpanStyle::Emphasis, SpanForm::Constrained)),
        '\u{14}' => Some((SpanStyle::Emphasis, SpanForm::Unconstrained)),
        '\u{15}' => Some((SpanStyle::Monospace, SpanForm::Constrained)),
        '\u{16}' => Some((SpanStyle::Monospace, SpanForm::Unconstrained)),
        '\u{17}' => Some((SpanStyle::Mark, SpanForm::Constrained)),
        '\u{18}' => Some((SpanStyle::Mark, SpanForm::Unconstrained)),
        '\u{19}' => Some((SpanStyle::Superscript, SpanForm::Unconstrained)),
        '\u{1a}' => Some((SpanStyle::Subscript, SpanForm::Unconstrained)),
        _ => None,
    }
}

/// A deferred node held in a placeholder slot until [`Substitutor::finalize`] runs.
///
/// Macro payloads stay as marked text so the spans woven into them by earlier passes
/// are parsed together with the rest of the text.
#[derive(Debug)]
pub(crate) enum Slot {
    Ready(InlineNode),
    Link { target: String, text: String },
    Image { target: String, alt: Option<String> },
    Footnote { id: Option<String>, text: String },
    CrossReference { target: String, text: Option<String> },
}

/// Applies substitution passes for one parse. Holds the placeholder slot table; owned
/// exclusively by the in-progress parse.
#[derive(Debug)]
pub(crate) struct Substitutor<'a> {
    pub(crate) attributes: &'a AttributeStore,
    pub(crate) diagnostics: &'a mut Diagnostics,
    /// First source line of the text being substituted, for diagnostics.
    pub(crate) line: usize,
    slots: Vec<Slot>,
}

impl<'a> Substitutor<'a> {
    pub(crate) fn new(
        attributes: &'a AttributeStore,
        diagnostics: &'a mut Diagnostics,
        line: usize,
    ) -> Self {
        Self {
            attributes,
            diagnostics,
            line,
            slots: Vec::new(),
        }
    }

    pub(crate) fn push_slot(&mut self, slot: Slot) -> String {
        let index = self.slots.len();
        self.slots.push(slot);
        format!("{PLACEHOLDER_DELIM}{index}{PLACEHOLDER_DELIM}")
    }

    /// Run `subs` over `text` in declared order and build the inline tree.
    pub(crate) fn apply(&mut self, text: &str, subs: &[Substitution]) -> Vec<InlineNode> {
        if subs.is_empty() {
            if text.is_empty() {
                return Vec::new();
            }
            return vec![InlineNode::Raw {
                value: text.to_string(),
            }];
        }

        let mut working = text.to_string();

        // Passthrough content must survive every pass untouched, so it is pulled out
        // into slots before the first pass runs and restored verbatim at the end.
        if subs.contains(&Substitution::Macros) {
            working = self.extract_passthroughs(&working);
        }

        for substitution in subs {
            working = match substitution {
                Substitution::SpecialChars => special_chars::escape(&working),
                Substitution::Quotes => quotes::substitute(&working),
                Substitution::Attributes => self.substitute_attributes(&working),
                Substitution::Macros => self.substitute_macros(&working),
                Substitution::Replacements => replacements::substitute(&working),
                Substitution::PostReplacements => replacements::substitute_post(&working),
                Substitution::Callouts => self.substitute_callouts(&working),
            };
        }

        self.finalize(&working)
    }

    /// Parse marked working text into the final node tree, restoring placeholder
    /// slots (passthroughs verbatim, macros with their payloads parsed).
    pub(crate) fn finalize(&mut self, text: &str) -> Vec<InlineNode> {
        let mut stack: Vec<(SpanStyle, SpanForm, Vec<InlineNode>)> = Vec::new();
        let mut nodes: Vec<InlineNode> = Vec::new();
        let mut buffer = String::new();
        let mut chars = text.chars().peekable();

        fn flush(buffer: &mut String, out: &mut Vec<InlineNode>) {
            if !buffer.is_empty() {
                out.push(InlineNode::text(std::mem::take(buffer)));
            }
        }

        while let Some(c) = chars.next() {
            let out = stack.last_mut().map_or(&mut nodes, |(.., children)| children);
            match c {
                PLACEHOLDER_DELIM => {
                    let mut digits = String::new();
                    for d in chars.by_ref() {
                        if d == PLACEHOLDER_DELIM {
                            break;
                        }
                        digits.push(d);
                    }
                    flush(&mut buffer, out);
                    if let Some(node) = digits
                        .parse::<usize>()
                        .ok()
                        .and_then(|index| self.resolve_slot(index))
                    {
                        let out = stack.last_mut().map_or(&mut nodes, |(.., c)| c);
                        out.push(node);
                    }
                }
                SPAN_OPEN => {
                    if let Some((style, form)) = chars.next().and_then(decode_span_code) {
                        flush(&mut buffer, out);
                        stack.push((style, form, Vec::new()));
                    }
                }
                SPAN_CLOSE => {
                    let code = chars.next().and_then(decode_span_code);
                    flush(&mut buffer, out);
                    match (code, stack.pop()) {
                        (Some(_), Some((style, form, content))) => {
                            let out = stack.last_mut().map_or(&mut nodes, |(.., c)| c);
                            out.push(InlineNode::Span(Span {
                                style,
                                form,
                                content,
                            }));
                        }
                        _ => {}
                    }
                }
                LINE_BREAK_MARKER => {
                    flush(&mut buffer, out);
                    let out = stack.last_mut().map_or(&mut nodes, |(.., c)| c);
                    out.push(InlineNode::LineBreak);
                }
                other => buffer.push(other),
            }
        }
        {
            let out = stack.last_mut().map_or(&mut nodes, |(.., children)| children);
            flush(&mut buffer, out);
        }
        // Unbalanced opens flatten into their parent rather than vanishing.
        while let Some((_, _, children)) = stack.pop() {
            let out = stack.last_mut().map_or(&mut nodes, |(.., c)| c);
            out.extend(children);
        }
        nodes
    }

    fn resolve_slot(&mut self, index: usize) -> Option<InlineNode> {
        if index >= self.slots.len() {
            return None;
        }
        let slot = std::mem::replace(
            &mut self.slots[index],
            Slot::Ready(InlineNode::text(String::new())),
        );
        Some(match slot {
            Slot::Ready(node) => node,
            Slot::Link { target, text } => InlineNode::Link(crate::Link {
                target,
                text: self.finalize(&text),
            }),
            Slot::Image { target, alt } => {
                InlineNode::Image(crate::InlineImage { target, alt })
            }
            Slot::Footnote { id, text } => InlineNode::Footnote(crate::Footnote {
                id,
                text: self.finalize(&text),
                number: 0,
            }),
            Slot::CrossReference { target, text } => {
                InlineNode::CrossReference(crate::CrossReference {
                    target,
                    text: text.map(|t| self.finalize(&t)),
                })
            }
        })
    }
}

/// Convenience wrapper: substitute `text` with `subs` into an inline tree.
pub(crate) fn apply(
    text: &str,
    subs: &[Substitution],
    attributes: &AttributeStore,
    diagnostics: &mut Diagnostics,
    line: usize,
) -> Vec<InlineNode> {
    Substitutor::new(attributes, diagnostics, line).apply(text, subs)
}

/// Resolve a `subs="..."` override list into a pass set, preserving declared order.
pub(crate) fn parse_subs_list(value: &str) -> Vec<Substitution> {
    value
        .split(',')
        .map(str::trim)
        .map(Substitution::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subst(text: &str, subs: &[Substitution]) -> Vec<InlineNode> {
        let attributes = AttributeStore::default();
        let mut diagnostics = Diagnostics::default();
        apply(text, subs, &attributes, &mut diagnostics, 1)
    }

    #[test]
    fn test_plain_text() {
        let nodes = subst("hello world", NORMAL);
        assert_eq!(nodes, vec![InlineNode::text("hello world")]);
    }

    #[test]
    fn test_pass_set_none_is_raw() {
        let nodes = subst("*kept* <as-is>", PASS);
        assert_eq!(
            nodes,
            vec![InlineNode::Raw {
                value: "*kept* <as-is>".to_string()
            }]
        );
    }

    #[test]
    fn test_strong_then_emphasis_nesting() {
        // Strong constrained is attempted before emphasis constrained; the pass order
        // is observable in the nesting.
        let nodes = subst("*_both_*", NORMAL);
        match nodes.as_slice() {
            [InlineNode::Span(strong)] => {
                assert_eq!(strong.style, SpanStyle::Strong);
                match strong.content.as_slice() {
                    [InlineNode::Span(emphasis)] => {
                        assert_eq!(emphasis.style, SpanStyle::Emphasis);
                        assert_eq!(emphasis.content, vec![InlineNode::text("both")]);
                    }
                    other => panic!("expected nested emphasis, got {other:?}"),
                }
            }
            other => panic!("expected strong span, got {other:?}"),
        }
    }

    #[test]
    fn test_passthrough_restored_verbatim() {
        let nodes = subst("before +++<b>raw</b>+++ after", NORMAL);
        assert_eq!(
            nodes,
            vec![
                InlineNode::text("before "),
                InlineNode::Raw {
                    value: "<b>raw</b>".to_string()
                },
                InlineNode::text(" after"),
            ]
        );
    }

    #[test]
    fn test_verbatim_set_keeps_markup_literal() {
        let nodes = subst("*not strong* <tag>", VERBATIM);
        assert_eq!(nodes, vec![InlineNode::text("*not strong* &lt;tag&gt;")]);
    }

    #[test]
    fn test_subs_list_parsing() {
        assert_eq!(
            parse_subs_list("quotes,attributes"),
            vec![Substitution::Quotes, Substitution::Attributes]
        );
    }
}
