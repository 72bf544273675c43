use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Safe mode to use when processing a document. Four escalating trust levels gate what
/// document content is permitted to do to the filesystem and to rendering
/// configuration.
///
/// The gate is consulted in two places: the include resolver (before touching any
/// path) and the attribute store (before honoring an entry that would change
/// security-relevant configuration). A violation never aborts the parse; the offending
/// directive degrades to an inert placeholder with a logged warning.
#[derive(Debug, Clone, Default, PartialOrd, Ord, PartialEq, Eq, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeMode {
    /// No restrictions at all.
    Unsafe = 0,

    /// Include targets must resolve inside the base directory subtree. Paths escaping
    /// it are refused and replaced with an unresolved-directive placeholder.
    Safe = 1,

    /// Additionally ignores document attribute entries that would affect how the
    /// document is rendered (`backend`, `doctype`, and any host-locked name).
    Server = 10,

    /// Additionally disables every filesystem read triggered from document content,
    /// includes first among them. This is the default.
    #[default]
    Secure = 20,
}

impl SafeMode {
    /// Whether include directives may read from the filesystem at all.
    #[must_use]
    pub fn allows_include_reads(self) -> bool {
        self < SafeMode::Secure
    }

    /// Whether include targets must stay within the base directory subtree.
    #[must_use]
    pub fn confines_includes(self) -> bool {
        self >= SafeMode::Safe
    }

    /// Whether rendering-affecting attribute entries from the document body are
    /// ignored.
    #[must_use]
    pub fn locks_rendering_attributes(self) -> bool {
        self >= SafeMode::Server
    }
}

impl FromStr for SafeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unsafe" => Ok(Self::Unsafe),
            "safe" => Ok(Self::Safe),
            "server" => Ok(Self::Server),
            "secure" => Ok(Self::Secure),
            _ => Err(format!(
                "invalid safe mode: '{s}', expected: unsafe, safe, server, secure"
            )),
        }
    }
}
