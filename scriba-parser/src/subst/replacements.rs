//! Typographic replacements and post-replacements.
//!
//! An ordered rule list; each rule is applied globally across the text before the
//! next rule begins. Arrow patterns match the escaped forms (`-&gt;`) since
//! special-character escaping has already run.

use super::LINE_BREAK_MARKER;

type BoundaryCheck = fn(Option<char>, Option<char>) -> bool;

struct Replacement {
    pattern: &'static str,
    replacement: &'static str,
    /// Extra constraint on the characters immediately before and after the match.
    boundary: Option<BoundaryCheck>,
}

const fn plain(pattern: &'static str, replacement: &'static str) -> Replacement {
    Replacement {
        pattern,
        replacement,
        boundary: None,
    }
}

fn not_dash_before(prev: Option<char>, _next: Option<char>) -> bool {
    prev != Some('-')
}

fn not_dash_after(_prev: Option<char>, next: Option<char>) -> bool {
    next != Some('-')
}

fn no_dash_adjacent(prev: Option<char>, next: Option<char>) -> bool {
    prev != Some('-') && next != Some('-')
}

fn word_adjacent(prev: Option<char>, next: Option<char>) -> bool {
    prev.is_some_and(char::is_alphanumeric) && next.is_some_and(char::is_alphanumeric)
}

const REPLACEMENTS: &[Replacement] = &[
    plain("(C)", "&#169;"),
    plain("(R)", "&#174;"),
    plain("(TM)", "&#8482;"),
    plain("...", "&#8230;"),
    Replacement {
        pattern: "--&gt;",
        replacement: "&#8594;",
        boundary: Some(not_dash_before),
    },
    Replacement {
        pattern: "&lt;--",
        replacement: "&#8592;",
        boundary: Some(not_dash_after),
    },
    Replacement {
        pattern: "-&gt;",
        replacement: "&#8594;",
        boundary: Some(not_dash_before),
    },
    Replacement {
        pattern: "&lt;-",
        replacement: "&#8592;",
        boundary: Some(not_dash_after),
    },
    plain("=&gt;", "&#8658;"),
    plain("&lt;=", "&#8656;"),
    Replacement {
        pattern: "--",
        replacement: "&#8212;",
        boundary: Some(no_dash_adjacent),
    },
    Replacement {
        pattern: "'",
        replacement: "&#8217;",
        boundary: Some(word_adjacent),
    },
];

/// Apply every typographic rule in table order.
pub(crate) fn substitute(text: &str) -> String {
    let mut working = text.to_string();
    for replacement in REPLACEMENTS {
        working = apply_replacement(&working, replacement);
    }
    working
}

fn apply_replacement(text: &str, replacement: &Replacement) -> String {
    let pattern = replacement.pattern;
    let mut result = String::with_capacity(text.len());
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find(pattern) {
        let start = cursor + found;
        let prev = text[..start].chars().next_back();
        let next = text[start + pattern.len()..].chars().next();

        if prev == Some('\\') {
            result.push_str(&text[cursor..start - 1]);
            result.push_str(pattern);
            cursor = start + pattern.len();
            continue;
        }
        if replacement.boundary.is_some_and(|check| !check(prev, next)) {
            // Not a match here; emit one character and rescan, since an overlapping
            // occurrence may still qualify.
            let step = text[start..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
            result.push_str(&text[cursor..start + step]);
            cursor = start + step;
            continue;
        }
        result.push_str(&text[cursor..start]);
        result.push_str(replacement.replacement);
        cursor = start + pattern.len();
    }
    result.push_str(&text[cursor..]);
    result
}

/// Post-replacements: a line ending in spaces plus `+` becomes a forced line break
/// instead of joining with the next line.
pub(crate) fn substitute_post(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in text.split('\n') {
        let trimmed = line.trim_end();
        if let Some(before) = trimmed.strip_suffix('+') {
            if before.ends_with(' ') && !before.trim_end().is_empty() {
                let mut replaced = before.trim_end().to_string();
                replaced.push(LINE_BREAK_MARKER);
                lines.push(replaced);
                continue;
            }
        }
        lines.push(line.to_string());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_replacements() {
        assert_eq!(substitute("(C) 2024"), "&#169; 2024");
        assert_eq!(substitute("Brand(TM)"), "Brand&#8482;");
    }

    #[test]
    fn test_arrows_on_escaped_text() {
        assert_eq!(substitute("a -&gt; b"), "a &#8594; b");
        assert_eq!(substitute("a &lt;= b"), "a &#8656; b");
        assert_eq!(substitute("a --&gt; b"), "a &#8594; b");
    }

    #[test]
    fn test_em_dash() {
        assert_eq!(substitute("yes--no"), "yes&#8212;no");
    }

    #[test]
    fn test_apostrophe() {
        assert_eq!(substitute("it's"), "it&#8217;s");
        assert_eq!(substitute("'quoted'"), "'quoted'");
    }

    #[test]
    fn test_escaped_replacement_suppressed() {
        assert_eq!(substitute(r"\(C) 2024"), "(C) 2024");
    }

    #[test]
    fn test_ellipsis() {
        assert_eq!(substitute("wait..."), "wait&#8230;");
    }

    #[test]
    fn test_post_replacement_line_break() {
        let result = substitute_post("first +\nsecond");
        assert_eq!(result, format!("first{LINE_BREAK_MARKER}\nsecond"));
    }

    #[test]
    fn test_lone_plus_line_is_not_a_break() {
        assert_eq!(substitute_post("+\nnext"), "+\nnext");
    }
}
