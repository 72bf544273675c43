//! Inline macros: passthroughs, links, images, footnotes, cross-references and index
//! terms.
//!
//! Matched macros are replaced with numbered placeholder tokens so the later
//! typographic passes cannot corrupt their targets; the placeholders resolve to nodes
//! when the working text is finalized. Cross-reference and callout syntax is matched
//! against the already-escaped text (`&lt;&lt;id&gt;&gt;`), which is how the reference
//! grammar behaves.

use crate::{Callout, IndexTerm, InlineNode};

use super::{Slot, Substitutor};

const AUTOLINK_SCHEMES: &[&str] = &["https://", "http://", "ftp://"];

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn prev_char(text: &str, index: usize) -> Option<char> {
    text[..index].chars().next_back()
}

/// Scan `text[start..]` for a bracketed payload opening at `start`. Returns the
/// payload (with `\]` unescaped) and the index just past the closing bracket.
fn bracket_payload(text: &str, start: usize) -> Option<(String, usize)> {
    if !text[start..].starts_with('[') {
        return None;
    }
    let mut payload = String::new();
    let mut iter = text[start + 1..].char_indices();
    while let Some((offset, c)) = iter.next() {
        match c {
            '\\' => match iter.next() {
                Some((_, ']')) => payload.push(']'),
                Some((_, other)) => {
                    payload.push('\\');
                    payload.push(other);
                }
                None => payload.push('\\'),
            },
            ']' => return Some((payload, start + 1 + offset + 1)),
            other => payload.push(other),
        }
    }
    None
}

impl Substitutor<'_> {
    /// Extract inline passthroughs (`+++text+++`, `$$text$$`, `pass:[text]`) into
    /// placeholder slots before any pass runs. The content is restored verbatim as
    /// the final step of substitution.
    pub(crate) fn extract_passthroughs(&mut self, text: &str) -> String {
        let mut working = self.extract_fenced_passthrough(text, "+++");
        working = self.extract_fenced_passthrough(&working, "$$");
        working = self.extract_pass_macro(&working);
        working
    }

    fn extract_fenced_passthrough(&mut self, text: &str, fence: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut cursor = 0;
        while let Some(found) = text[cursor..].find(fence) {
            let start = cursor + found;
            if prev_char(text, start) == Some('\\') {
                result.push_str(&text[cursor..start - 1]);
                result.push_str(fence);
                cursor = start + fence.len();
                continue;
            }
            let content_start = start + fence.len();
            let Some(relative) = text[content_start..].find(fence) else {
                result.push_str(&text[cursor..content_start]);
                cursor = content_start;
                continue;
            };
            let end = content_start + relative;
            result.push_str(&text[cursor..start]);
            let placeholder = self.push_slot(Slot::Ready(InlineNode::Raw {
                value: text[content_start..end].to_string(),
            }));
            result.push_str(&placeholder);
            cursor = end + fence.len();
        }
        result.push_str(&text[cursor..]);
        result
    }

    fn extract_pass_macro(&mut self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut cursor = 0;
        while let Some(found) = text[cursor..].find("pass:") {
            let start = cursor + found;
            if prev_char(text, start).is_some_and(is_word) {
                result.push_str(&text[cursor..start + 5]);
                cursor = start + 5;
                continue;
            }
            if prev_char(text, start) == Some('\\') {
                result.push_str(&text[cursor..start - 1]);
                result.push_str("pass:");
                cursor = start + 5;
                continue;
            }
            let Some((payload, end)) = bracket_payload(text, start + 5) else {
                result.push_str(&text[cursor..start + 5]);
                cursor = start + 5;
                continue;
            };
            result.push_str(&text[cursor..start]);
            let placeholder = self.push_slot(Slot::Ready(InlineNode::Raw { value: payload }));
            result.push_str(&placeholder);
            cursor = end;
        }
        result.push_str(&text[cursor..]);
        result
    }

    /// The inline-macro pass proper: explicit target macros first, then short-form
    /// cross-references, index terms, and autolinks.
    pub(crate) fn substitute_macros(&mut self, text: &str) -> String {
        let mut working = self.substitute_target_macro(text, "link:", |sub, target, payload| {
            Some(sub.push_slot(Slot::Link {
                target: target.to_string(),
                text: payload.to_string(),
            }))
        });
        working = self.substitute_target_macro(&working, "image:", |sub, target, payload| {
            let alt = if payload.is_empty() {
                None
            } else {
                // Positional attributes beyond the alt text are renderer concerns.
                payload.split(',').next().map(str::to_string)
            };
            Some(sub.push_slot(Slot::Image {
                target: target.to_string(),
                alt,
            }))
        });
        working = self.substitute_footnotes(&working);
        working = self.substitute_target_macro(&working, "xref:", |sub, target, payload| {
            let label = if payload.is_empty() {
                None
            } else {
                Some(payload.to_string())
            };
            Some(sub.push_slot(Slot::CrossReference {
                target: target.to_string(),
                text: label,
            }))
        });
        working = self.substitute_short_xrefs(&working);
        working = self.substitute_index_terms(&working);
        working = self.substitute_autolinks(&working);
        working
    }

    /// Generic `name:target[payload]` scanner. `build` returns the replacement
    /// placeholder, or `None` to leave the candidate untouched.
    fn substitute_target_macro(
        &mut self,
        text: &str,
        name: &str,
        build: impl Fn(&mut Self, &str, &str) -> Option<String>,
    ) -> String {
        let mut result = String::with_capacity(text.len());
        let mut cursor = 0;
        while let Some(found) = text[cursor..].find(name) {
            let start = cursor + found;
            if prev_char(text, start).is_some_and(is_word) {
                result.push_str(&text[cursor..start + name.len()]);
                cursor = start + name.len();
                continue;
            }
            if prev_char(text, start) == Some('\\') {
                result.push_str(&text[cursor..start - 1]);
                result.push_str(name);
                cursor = start + name.len();
                continue;
            }
            let target_start = start + name.len();
            let target_len = text[target_start..]
                .chars()
                .take_while(|c| !c.is_whitespace() && *c != '[' && *c != ']' && !c.is_control())
                .map(char::len_utf8)
                .sum::<usize>();
            let target = &text[target_start..target_start + target_len];
            let replaced = if target.is_empty() {
                None
            } else {
                bracket_payload(text, target_start + target_len).and_then(|(payload, end)| {
                    build(self, target, &payload).map(|placeholder| (placeholder, end))
                })
            };
            match replaced {
                Some((placeholder, end)) => {
                    result.push_str(&text[cursor..start]);
                    result.push_str(&placeholder);
                    cursor = end;
                }
                None => {
                    result.push_str(&text[cursor..start + name.len()]);
                    cursor = start + name.len();
                }
            }
        }
        result.push_str(&text[cursor..]);
        result
    }

    /// `footnote:[text]` and `footnote:id[text]`. Numbers are assigned by the
    /// deferred resolution pass.
    fn substitute_footnotes(&mut self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut cursor = 0;
        while let Some(found) = text[cursor..].find("footnote:") {
            let start = cursor + found;
            if prev_char(text, start).is_some_and(is_word) {
                result.push_str(&text[cursor..start + 9]);
                cursor = start + 9;
                continue;
            }
            if prev_char(text, start) == Some('\\') {
                result.push_str(&text[cursor..start - 1]);
                result.push_str("footnote:");
                cursor = start + 9;
                continue;
            }
            let id_start = start + 9;
            let id_len = text[id_start..]
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                .map(char::len_utf8)
                .sum::<usize>();
            match bracket_payload(text, id_start + id_len) {
                Some((payload, end)) => {
                    let id = if id_len == 0 {
                        None
                    } else {
                        Some(text[id_start..id_start + id_len].to_string())
                    };
                    result.push_str(&text[cursor..start]);
                    let placeholder = self.push_slot(Slot::Footnote { id, text: payload });
                    result.push_str(&placeholder);
                    cursor = end;
                }
                None => {
                    result.push_str(&text[cursor..start + 9]);
                    cursor = start + 9;
                }
            }
        }
        result.push_str(&text[cursor..]);
        result
    }

    /// `&lt;&lt;target&gt;&gt;` and `&lt;&lt;target,text&gt;&gt;` (escaped form of
    /// `<<...>>`).
    fn substitute_short_xrefs(&mut self, text: &str) -> String {
        const OPEN: &str = "&lt;&lt;";
        const CLOSE: &str = "&gt;&gt;";
        let mut result = String::with_capacity(text.len());
        let mut cursor = 0;
        while let Some(found) = text[cursor..].find(OPEN) {
            let start = cursor + found;
            if prev_char(text, start) == Some('\\') {
                result.push_str(&text[cursor..start - 1]);
                result.push_str(OPEN);
                cursor = start + OPEN.len();
                continue;
            }
            let content_start = start + OPEN.len();
            let Some(relative) = text[content_start..].find(CLOSE) else {
                result.push_str(&text[cursor..content_start]);
                cursor = content_start;
                continue;
            };
            let end = content_start + relative;
            let content = &text[content_start..end];
            let (target, label) = match content.split_once(',') {
                Some((target, label)) => (target.trim(), Some(label.trim().to_string())),
                None => (content.trim(), None),
            };
            if target.is_empty() || target.contains(char::is_whitespace) {
                result.push_str(&text[cursor..content_start]);
                cursor = content_start;
                continue;
            }
            result.push_str(&text[cursor..start]);
            let placeholder = self.push_slot(Slot::CrossReference {
                target: target.to_string(),
                text: label,
            });
            result.push_str(&placeholder);
            cursor = end + CLOSE.len();
        }
        result.push_str(&text[cursor..]);
        result
    }

    /// `(((a, b)))` (concealed) and `((term))` (visible). The triple form must be
    /// attempted first.
    fn substitute_index_terms(&mut self, text: &str) -> String {
        let working = self.substitute_index_form(text, "(((", ")))", false);
        self.substitute_index_form(&working, "((", "))", true)
    }

    fn substitute_index_form(
        &mut self,
        text: &str,
        open: &str,
        close: &str,
        visible: bool,
    ) -> String {
        let mut result = String::with_capacity(text.len());
        let mut cursor = 0;
        while let Some(found) = text[cursor..].find(open) {
            let start = cursor + found;
            if prev_char(text, start) == Some('\\') {
                result.push_str(&text[cursor..start - 1]);
                result.push_str(open);
                cursor = start + open.len();
                continue;
            }
            let content_start = start + open.len();
            let Some(relative) = text[content_start..].find(close) else {
                result.push_str(&text[cursor..content_start]);
                cursor = content_start;
                continue;
            };
            let end = content_start + relative;
            let content = &text[content_start..end];
            if content.is_empty() || content.contains('(') || content.contains(')') {
                result.push_str(&text[cursor..content_start]);
                cursor = content_start;
                continue;
            }
            let terms: Vec<String> = content
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            result.push_str(&text[cursor..start]);
            let placeholder = self.push_slot(Slot::Ready(InlineNode::IndexTerm(IndexTerm {
                terms,
                visible,
            })));
            result.push_str(&placeholder);
            cursor = end + close.len();
        }
        result.push_str(&text[cursor..]);
        result
    }

    /// Bare URLs, optionally followed by `[text]`.
    fn substitute_autolinks(&mut self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut cursor = 0;
        'outer: while cursor < text.len() {
            let mut earliest: Option<usize> = None;
            for scheme in AUTOLINK_SCHEMES {
                if let Some(found) = text[cursor..].find(scheme) {
                    let start = cursor + found;
                    earliest = Some(earliest.map_or(start, |e| e.min(start)));
                }
            }
            let Some(start) = earliest else {
                break 'outer;
            };
            if prev_char(text, start).is_some_and(|c| is_word(c) || c == ':' || c == '/') {
                // Part of a longer token (already-consumed macro target or similar).
                result.push_str(&text[cursor..start + 4]);
                cursor = start + 4;
                continue;
            }
            if prev_char(text, start) == Some('\\') {
                result.push_str(&text[cursor..start - 1]);
                cursor = start;
                let len = text[start..]
                    .chars()
                    .take_while(|c| !c.is_whitespace() && !c.is_control() && *c != '[')
                    .map(char::len_utf8)
                    .sum::<usize>();
                result.push_str(&text[start..start + len]);
                cursor = start + len;
                continue;
            }
            let mut url_len = text[start..]
                .chars()
                .take_while(|c| !c.is_whitespace() && !c.is_control() && *c != '[')
                .map(char::len_utf8)
                .sum::<usize>();
            while url_len > 0
                && text[start..start + url_len].ends_with([',', '.', ';', ':', '!', '?', ')'])
            {
                url_len -= 1;
            }
            let url = &text[start..start + url_len];
            let scheme_len = AUTOLINK_SCHEMES
                .iter()
                .find(|scheme| url.starts_with(**scheme))
                .map_or(url.len(), |scheme| scheme.len());
            if url.len() <= scheme_len {
                // A bare scheme with no host is not a link.
                result.push_str(&text[cursor..start + url_len]);
                cursor = start + url_len;
                continue;
            }
            let (label, end) = match bracket_payload(text, start + url_len) {
                Some((payload, end)) => (payload, end),
                None => (String::new(), start + url_len),
            };
            result.push_str(&text[cursor..start]);
            let placeholder = self.push_slot(Slot::Link {
                target: url.to_string(),
                text: label,
            });
            result.push_str(&placeholder);
            cursor = end;
        }
        result.push_str(&text[cursor..]);
        result
    }

    /// Callout markers in verbatim content: `&lt;N&gt;` on already-escaped text.
    pub(crate) fn substitute_callouts(&mut self, text: &str) -> String {
        const OPEN: &str = "&lt;";
        const CLOSE: &str = "&gt;";
        let mut result = String::with_capacity(text.len());
        let mut cursor = 0;
        while let Some(found) = text[cursor..].find(OPEN) {
            let start = cursor + found;
            let digit_start = start + OPEN.len();
            let digit_len = text[digit_start..]
                .chars()
                .take_while(char::is_ascii_digit)
                .count();
            let candidate_ok = digit_len > 0
                && text[digit_start + digit_len..].starts_with(CLOSE)
                && prev_char(text, start) != Some('\\');
            if !candidate_ok {
                result.push_str(&text[cursor..digit_start]);
                cursor = digit_start;
                continue;
            }
            let number: u32 = match text[digit_start..digit_start + digit_len].parse() {
                Ok(number) => number,
                Err(_) => {
                    result.push_str(&text[cursor..digit_start]);
                    cursor = digit_start;
                    continue;
                }
            };
            result.push_str(&text[cursor..start]);
            let placeholder =
                self.push_slot(Slot::Ready(InlineNode::Callout(Callout { number })));
            result.push_str(&placeholder);
            cursor = digit_start + digit_len + CLOSE.len();
        }
        result.push_str(&text[cursor..]);
        result
    }
}
