//! Process-wide constant tables.
//!
//! These are immutable, read-only data shared by every parse. Per-document state
//! (attribute store, tree) is never global.

/// Built-in character intrinsics consulted when an attribute reference does not match
/// a stored attribute. Values are emitted verbatim into already-escaped text, which is
/// why the angle-bracket and ampersand intrinsics carry entity syntax.
pub(crate) const INTRINSIC_ENTITIES: &[(&str, &str)] = &[
    ("amp", "&amp;"),
    ("apostrophe", "'"),
    ("asterisk", "*"),
    ("backslash", "\\"),
    ("backtick", "`"),
    ("brvbar", "&#166;"),
    ("caret", "^"),
    ("cpp", "C++"),
    ("deg", "&#176;"),
    ("empty", ""),
    ("endsb", "]"),
    ("gt", "&gt;"),
    ("lt", "&lt;"),
    ("nbsp", "&#160;"),
    ("plus", "&#43;"),
    ("sp", " "),
    ("startsb", "["),
    ("tilde", "~"),
    ("two-colons", "::"),
    ("two-semicolons", ";;"),
    ("vbar", "|"),
    ("wj", "&#8288;"),
    ("zwsp", "&#8203;"),
];

/// Attribute names the document body may not override at `SafeMode::Server` and above,
/// in addition to any names locked by the host application.
pub(crate) const RENDERING_ATTRIBUTES: &[&str] = &["backend", "doctype"];

/// Lookup an intrinsic entity by name.
pub(crate) fn intrinsic(name: &str) -> Option<&'static str> {
    INTRINSIC_ENTITIES
        .binary_search_by_key(&name, |(n, _)| n)
        .ok()
        .and_then(|idx| INTRINSIC_ENTITIES.get(idx).map(|(_, v)| *v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intrinsics_are_sorted_for_binary_search() {
        let mut names: Vec<&str> = INTRINSIC_ENTITIES.iter().map(|(n, _)| *n).collect();
        names.sort_unstable();
        let sorted: Vec<&str> = INTRINSIC_ENTITIES.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_intrinsic_lookup() {
        assert_eq!(intrinsic("sp"), Some(" "));
        assert_eq!(intrinsic("nbsp"), Some("&#160;"));
        assert_eq!(intrinsic("no-such-entity"), None);
    }
}
