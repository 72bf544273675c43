//! Quoted-text styling.
//!
//! An ordered rule table scanned top to bottom; each rule is applied globally before
//! the next begins, so earlier rules wrap later ones (`*_x_*` nests emphasis inside
//! strong, never the reverse). For a given glyph family the unconstrained (doubled,
//! mid-word) rule is listed before the constrained (word-bounded) one. The table
//! order is behavior-defining; do not re-derive it.

use crate::{SpanForm, SpanStyle};

use super::{SPAN_CLOSE, SPAN_OPEN, span_code};

#[derive(Debug, Clone, Copy)]
pub(crate) struct QuoteRule {
    pub(crate) style: SpanStyle,
    pub(crate) form: SpanForm,
    pub(crate) delimiter: &'static str,
}

const fn rule(style: SpanStyle, form: SpanForm, delimiter: &'static str) -> QuoteRule {
    QuoteRule {
        style,
        form,
        delimiter,
    }
}

pub(crate) const QUOTE_RULES: &[QuoteRule] = &[
    rule(SpanStyle::Strong, SpanForm::Unconstrained, "**"),
    rule(SpanStyle::Strong, SpanForm::Constrained, "*"),
    rule(SpanStyle::Emphasis, SpanForm::Unconstrained, "__"),
    rule(SpanStyle::Emphasis, SpanForm::Constrained, "_"),
    rule(SpanStyle::Monospace, SpanForm::Unconstrained, "``"),
    rule(SpanStyle::Monospace, SpanForm::Constrained, "`"),
    rule(SpanStyle::Monospace, SpanForm::Unconstrained, "++"),
    rule(SpanStyle::Monospace, SpanForm::Constrained, "+"),
    rule(SpanStyle::Mark, SpanForm::Unconstrained, "##"),
    rule(SpanStyle::Mark, SpanForm::Constrained, "#"),
    rule(SpanStyle::Superscript, SpanForm::Unconstrained, "^"),
    rule(SpanStyle::Subscript, SpanForm::Unconstrained, "~"),
];

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn prev_char(text: &str, index: usize) -> Option<char> {
    text[..index].chars().next_back()
}

fn char_at(text: &str, index: usize) -> Option<char> {
    text[index..].chars().next()
}

/// Apply every quote rule in table order.
pub(crate) fn substitute(text: &str) -> String {
    let mut working = text.to_string();
    for quote_rule in QUOTE_RULES {
        working = apply_rule(&working, quote_rule);
    }
    working
}

fn apply_rule(text: &str, quote_rule: &QuoteRule) -> String {
    let delimiter = quote_rule.delimiter;
    let open = format!("{SPAN_OPEN}{}", span_code(quote_rule.style, quote_rule.form));
    let close = format!("{SPAN_CLOSE}{}", span_code(quote_rule.style, quote_rule.form));

    let mut result = String::with_capacity(text.len());
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find(delimiter) {
        let start = cursor + found;

        // A backslash immediately before the marker suppresses this one match; the
        // backslash is consumed, the marker rendered literally.
        if prev_char(text, start) == Some('\\') {
            result.push_str(&text[cursor..start - 1]);
            result.push_str(delimiter);
            cursor = start + delimiter.len();
            continue;
        }

        let matched = match quote_rule.form {
            SpanForm::Unconstrained => match_unconstrained(text, start, delimiter),
            SpanForm::Constrained => match_constrained(text, start, delimiter),
        };

        match matched {
            Some(end) => {
                result.push_str(&text[cursor..start]);
                result.push_str(&open);
                result.push_str(&text[start + delimiter.len()..end]);
                result.push_str(&close);
                cursor = end + delimiter.len();
            }
            None => {
                result.push_str(&text[cursor..start + delimiter.len()]);
                cursor = start + delimiter.len();
            }
        }
    }
    result.push_str(&text[cursor..]);
    result
}

/// Unconstrained: no boundary requirements, content must be non-empty.
fn match_unconstrained(text: &str, start: usize, delimiter: &str) -> Option<usize> {
    let content_start = start + delimiter.len();
    let relative = text[content_start..].find(delimiter)?;
    if relative == 0 {
        return None;
    }
    Some(content_start + relative)
}

/// Constrained: the opening marker must not follow a word character, must precede
/// non-space content, and the closing marker must follow non-space content and not
/// precede a word character.
fn match_constrained(text: &str, start: usize, delimiter: &str) -> Option<usize> {
    if prev_char(text, start).is_some_and(is_word) {
        return None;
    }
    let content_start = start + delimiter.len();
    match char_at(text, content_start) {
        Some(c) if !c.is_whitespace() => {}
        _ => return None,
    }

    let mut search = content_start;
    while let Some(relative) = text[search..].find(delimiter) {
        let end = search + relative;
        if end == content_start {
            return None;
        }
        let before_ok = prev_char(text, end).is_some_and(|c| !c.is_whitespace() && c != '\\');
        let after_ok = !char_at(text, end + delimiter.len()).is_some_and(is_word);
        if before_ok && after_ok {
            return Some(end);
        }
        search = end + delimiter.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains_code(text: &str, style: SpanStyle, form: SpanForm) -> bool {
        text.contains(span_code(style, form))
    }

    #[test]
    fn test_constrained_strong() {
        let result = substitute("a *bold* word");
        assert!(contains_code(&result, SpanStyle::Strong, SpanForm::Constrained));
        assert!(!result.contains('*'));
    }

    #[test]
    fn test_midword_constrained_is_rejected() {
        let result = substitute("un*frag*mented");
        assert_eq!(result, "un*frag*mented");
    }

    #[test]
    fn test_midword_unconstrained_matches() {
        let result = substitute("un**frag**mented");
        assert!(contains_code(&result, SpanStyle::Strong, SpanForm::Unconstrained));
    }

    #[test]
    fn test_backslash_escape_consumed() {
        let result = substitute(r"\*literal*");
        assert_eq!(result, "*literal*");
    }

    #[test]
    fn test_unconstrained_priority_over_constrained() {
        // `**x**` must match the unconstrained rule, not constrained twice.
        let result = substitute("**x**");
        assert!(contains_code(&result, SpanStyle::Strong, SpanForm::Unconstrained));
        assert!(!contains_code(&result, SpanStyle::Strong, SpanForm::Constrained));
    }

    #[test]
    fn test_empty_span_is_not_a_match() {
        assert_eq!(substitute("a ** b"), "a ** b");
    }
}
