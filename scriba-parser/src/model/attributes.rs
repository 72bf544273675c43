use rustc_hash::{FxHashMap, FxHashSet};
use serde::{
    Serialize,
    ser::{SerializeMap, Serializer},
};

/// An `AttributeName` represents the name of a document attribute.
pub type AttributeName = String;

/// An `AttributeValue` represents the value of a document attribute.
///
/// An attribute value is a string, or a boolean where `false` is the explicit unset
/// marker left behind by `:name!:`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Bool(bool),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// The document-scoped attribute store.
///
/// Entries are created, overwritten, or deleted at any point during parsing by
/// directive lines; the value at the moment a given substitution runs is what that
/// substitution sees. Locked names (host-supplied, or rendering-affecting names under
/// `SafeMode::Server` and above) refuse document-body writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeStore {
    entries: FxHashMap<AttributeName, AttributeValue>,
    locked: FxHashSet<AttributeName>,
}

impl AttributeStore {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.entries.get(name)
    }

    /// Whether `name` is present and not explicitly unset.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        !matches!(
            self.entries.get(name),
            None | Some(AttributeValue::Bool(false))
        )
    }

    /// The string form of `name`'s value, if it is set. A bare flag (`:name:`) reads
    /// as the empty string.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        match self.entries.get(name) {
            Some(AttributeValue::String(value)) => Some(value),
            Some(AttributeValue::Bool(true)) => Some(""),
            Some(AttributeValue::Bool(false)) | None => None,
        }
    }

    pub fn set(&mut self, name: impl Into<AttributeName>, value: impl Into<AttributeValue>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Leave the explicit unset marker so later `{name}` references do not fall back
    /// to an intrinsic or to literal text silently.
    pub fn unset(&mut self, name: impl Into<AttributeName>) {
        self.entries.insert(name.into(), AttributeValue::Bool(false));
    }

    #[must_use]
    pub fn is_locked(&self, name: &str) -> bool {
        self.locked.contains(name)
    }

    /// Mark `name` as host-locked; document entries for it will be ignored at
    /// `SafeMode::Server` and above.
    pub fn lock(&mut self, name: impl Into<AttributeName>) {
        self.locked.insert(name.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Serialize for AttributeStore {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Serialize deterministically, sorted by name.
        let mut names: Vec<&AttributeName> = self.entries.keys().collect();
        names.sort_unstable();
        let mut state = serializer.serialize_map(Some(names.len()))?;
        for name in names {
            state.serialize_entry(name, &self.entries[name])?;
        }
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get() {
        let mut store = AttributeStore::default();
        store.set("version", "1.2");
        assert_eq!(store.value("version"), Some("1.2"));
        assert!(store.is_set("version"));
    }

    #[test]
    fn test_unset_leaves_marker() {
        let mut store = AttributeStore::default();
        store.set("name", "value");
        store.unset("name");
        assert!(!store.is_set("name"));
        assert_eq!(store.get("name"), Some(&AttributeValue::Bool(false)));
        assert_eq!(store.value("name"), None);
    }

    #[test]
    fn test_flag_reads_as_empty_string() {
        let mut store = AttributeStore::default();
        store.set("toc", true);
        assert!(store.is_set("toc"));
        assert_eq!(store.value("toc"), Some(""));
    }

    #[test]
    fn test_locking() {
        let mut store = AttributeStore::default();
        store.lock("backend");
        assert!(store.is_locked("backend"));
        assert!(!store.is_locked("doctype"));
    }
}
