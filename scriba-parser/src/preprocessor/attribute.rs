//! Attribute-entry directive lines: `:name: value`, `:name!:` / `:!name:` to unset.

use crate::{
    AttributeStore, SafeMode,
    constants::RENDERING_ATTRIBUTES,
    diagnostics::Diagnostics,
    subst::Substitutor,
};

/// A parsed attribute-entry line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum AttributeEntry {
    Set { name: String, value: String },
    Unset { name: String },
}

peg::parser! {
    grammar attribute_parser() for str {
        pub(crate) rule attribute_entry() -> AttributeEntry
            = ":" unset() name:name() ":" { AttributeEntry::Unset { name } }
            / ":" name:name() unset() ":" { AttributeEntry::Unset { name } }
            / ":" name:name() ":" whitespace()? value:value() {
                AttributeEntry::Set { name, value: value.trim_end().to_string() }
            }

        rule unset() = "!"

        rule name() -> String
            = n:$(['a'..='z' | 'A'..='Z' | '0'..='9' | '_'] ['a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_']*) {
                n.to_string()
            }

        rule value() -> String
            = v:$([^ '\n']*) { v.to_string() }

        rule whitespace() = quiet!{[' ' | '\t']+}
    }
}

/// Parse an attribute-entry line, or `None` if the line is not one.
pub(crate) fn parse_line(line: &str) -> Option<AttributeEntry> {
    attribute_parser::attribute_entry(line).ok()
}

/// Whether a set-entry value asks for continuation onto the next line
/// (`\s+\+\s*$` on the raw line).
pub(crate) fn wants_continuation(line: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed
        .strip_suffix('+')
        .is_some_and(|before| before.ends_with([' ', '\t']) && !before.trim_end().is_empty())
}

/// Strip the continuation marker from a value fragment.
pub(crate) fn strip_continuation(line: &str) -> &str {
    let trimmed = line.trim_end();
    match trimmed.strip_suffix('+') {
        Some(before) if before.ends_with([' ', '\t']) => before.trim_end(),
        _ => trimmed,
    }
}

/// Apply a parsed entry to the store, honoring the safe-mode locking policy.
///
/// At `Server` and above, entries naming a rendering-affecting or host-locked
/// attribute are ignored with a warning rather than applied.
pub(crate) fn apply_entry(
    entry: AttributeEntry,
    store: &mut AttributeStore,
    safe_mode: SafeMode,
    diagnostics: &mut Diagnostics,
    line_number: usize,
) {
    let name = match &entry {
        AttributeEntry::Set { name, .. } | AttributeEntry::Unset { name } => name.clone(),
    };
    if safe_mode.locks_rendering_attributes()
        && (RENDERING_ATTRIBUTES.contains(&name.as_str()) || store.is_locked(&name))
    {
        diagnostics.warn(
            Some(line_number),
            format!("ignoring attribute entry for locked attribute: {name}"),
        );
        return;
    }
    match entry {
        AttributeEntry::Set { name, value } => {
            if value.is_empty() {
                store.set(name, true);
            } else {
                // Interpolate against the values in effect right now; attribute
                // changes are not retroactive.
                let value =
                    Substitutor::new(store, diagnostics, line_number).substitute_attributes(&value);
                store.set(name, value);
            }
        }
        AttributeEntry::Unset { name } => store.unset(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_attribute() {
        assert_eq!(
            parse_line(":name: value"),
            Some(AttributeEntry::Set {
                name: "name".to_string(),
                value: "value".to_string()
            })
        );
    }

    #[test]
    fn test_parse_unset_both_forms() {
        assert_eq!(
            parse_line(":!name:"),
            Some(AttributeEntry::Unset {
                name: "name".to_string()
            })
        );
        assert_eq!(
            parse_line(":name!:"),
            Some(AttributeEntry::Unset {
                name: "name".to_string()
            })
        );
    }

    #[test]
    fn test_parse_bare_flag() {
        assert_eq!(
            parse_line(":toc:"),
            Some(AttributeEntry::Set {
                name: "toc".to_string(),
                value: String::new()
            })
        );
    }

    #[test]
    fn test_not_an_entry() {
        assert_eq!(parse_line("just text"), None);
        assert_eq!(parse_line("::"), None);
    }

    #[test]
    fn test_continuation_detection() {
        assert!(wants_continuation(":name: first part +"));
        assert!(wants_continuation(":name: first part + "));
        assert!(!wants_continuation(":name: c++"));
        assert_eq!(strip_continuation(":name: first part +"), ":name: first part");
    }

    #[test]
    fn test_apply_respects_locking() {
        let mut store = AttributeStore::default();
        store.set("backend", "html5");
        let mut diagnostics = Diagnostics::default();
        apply_entry(
            AttributeEntry::Set {
                name: "backend".to_string(),
                value: "docbook".to_string(),
            },
            &mut store,
            SafeMode::Server,
            &mut diagnostics,
            1,
        );
        assert_eq!(store.value("backend"), Some("html5"));
        assert_eq!(diagnostics.into_entries().len(), 1);
    }

    #[test]
    fn test_apply_interpolates_current_values() {
        let mut store = AttributeStore::default();
        store.set("major", "2");
        let mut diagnostics = Diagnostics::default();
        apply_entry(
            AttributeEntry::Set {
                name: "version".to_string(),
                value: "{major}.1".to_string(),
            },
            &mut store,
            SafeMode::Unsafe,
            &mut diagnostics,
            1,
        );
        assert_eq!(store.value("version"), Some("2.1"));
    }
}
