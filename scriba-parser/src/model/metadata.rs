use serde::Serialize;

/// Metadata attached to a block by the lines immediately preceding it: an anchor
/// (`[[id]]`), an attribute list (`[style,positional,name=value]`), or both. The block
/// title line (`.Title`) is carried separately since titles are substituted inline
/// text.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[non_exhaustive]
pub struct BlockMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Positional attributes after the style slot, in source order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub positional: Vec<String>,
    /// Named attributes in source order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub named: Vec<(String, String)>,
}

impl BlockMetadata {
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.style.is_none()
            && self.id.is_none()
            && self.roles.is_empty()
            && self.options.is_empty()
            && self.positional.is_empty()
            && self.named.is_empty()
    }

    /// Value of a named attribute.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&str> {
        self.named
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    /// Fold another metadata line into this one. Earlier lines win for the
    /// single-valued slots; list-valued slots accumulate.
    pub fn merge(&mut self, other: BlockMetadata) {
        if self.style.is_none() {
            self.style = other.style;
        }
        if self.id.is_none() {
            self.id = other.id;
        }
        self.roles.extend(other.roles);
        self.options.extend(other.options);
        self.positional.extend(other.positional);
        self.named.extend(other.named);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_default() {
        assert!(BlockMetadata::default().is_default());
    }

    #[test]
    fn test_merge_keeps_first_single_valued() {
        let mut first = BlockMetadata {
            id: Some("a".to_string()),
            ..BlockMetadata::default()
        };
        let second = BlockMetadata {
            id: Some("b".to_string()),
            style: Some("quote".to_string()),
            ..BlockMetadata::default()
        };
        first.merge(second);
        assert_eq!(first.id.as_deref(), Some("a"));
        assert_eq!(first.style.as_deref(), Some("quote"));
    }

    #[test]
    fn test_named_lookup() {
        let metadata = BlockMetadata {
            named: vec![("cols".to_string(), "1,2".to_string())],
            ..BlockMetadata::default()
        };
        assert_eq!(metadata.named("cols"), Some("1,2"));
        assert_eq!(metadata.named("rows"), None);
    }
}
