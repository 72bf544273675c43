use std::path::PathBuf;

use crate::{AttributeStore, AttributeValue, SafeMode};

/// Default bound on combined block/list nesting depth. A pathological input with
/// thousands of nested delimited regions fails with a resource diagnostic instead of
/// exhausting the stack.
pub const DEFAULT_MAX_NESTING: usize = 64;

/// Configuration bundle accepted by the parse entry points.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Options {
    pub safe_mode: SafeMode,
    pub attributes: AttributeStore,
    /// Directory for resolving relative include targets, and the containment root
    /// under `SafeMode::Safe` and above. Defaults to the source file's parent for
    /// `parse_file`, the process working directory otherwise.
    pub base_dir: Option<PathBuf>,
    /// Whether the document header (title, author and revision lines) is parsed.
    pub header_footer: bool,
    pub max_nesting: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            safe_mode: SafeMode::default(),
            attributes: AttributeStore::default(),
            base_dir: None,
            header_footer: true,
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

impl Options {
    /// Create a new `OptionsBuilder` for fluent configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use scriba_parser::{Options, SafeMode};
    ///
    /// let options = Options::builder()
    ///     .with_safe_mode(SafeMode::Safe)
    ///     .with_attribute("icons", "font")
    ///     .build();
    /// ```
    #[must_use]
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// Create a new `Options` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Builder for [`Options`].
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct OptionsBuilder {
    safe_mode: SafeMode,
    attributes: AttributeStore,
    base_dir: Option<PathBuf>,
    no_header_footer: bool,
    max_nesting: Option<usize>,
}

impl OptionsBuilder {
    /// Set the safe mode for parsing.
    #[must_use]
    pub fn with_safe_mode(mut self, safe_mode: SafeMode) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    /// Add an initial document attribute, as if set by the host before the first
    /// document line.
    #[must_use]
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.set(name, value);
        self
    }

    /// Add a host-locked attribute: set its value and refuse document-body overrides
    /// at `SafeMode::Server` and above.
    #[must_use]
    pub fn with_locked_attribute(
        mut self,
        name: impl Into<String> + Clone,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.set(name.clone(), value);
        self.attributes.lock(name);
        self
    }

    /// Set the base directory for resolving relative include targets.
    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Skip the document header: the first lines are parsed as ordinary content.
    #[must_use]
    pub fn without_header_footer(mut self) -> Self {
        self.no_header_footer = true;
        self
    }

    /// Override the nesting-depth bound.
    #[must_use]
    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = Some(max_nesting);
        self
    }

    /// Build the `Options` from this builder.
    #[must_use]
    pub fn build(self) -> Options {
        Options {
            safe_mode: self.safe_mode,
            attributes: self.attributes,
            base_dir: self.base_dir,
            header_footer: !self.no_header_footer,
            max_nesting: self.max_nesting.unwrap_or(DEFAULT_MAX_NESTING),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.safe_mode, SafeMode::Secure);
        assert!(options.header_footer);
        assert_eq!(options.max_nesting, DEFAULT_MAX_NESTING);
    }

    #[test]
    fn test_builder() {
        let options = Options::builder()
            .with_safe_mode(SafeMode::Server)
            .with_attribute("icons", "font")
            .with_locked_attribute("backend", "html5")
            .without_header_footer()
            .with_max_nesting(8)
            .build();
        assert_eq!(options.safe_mode, SafeMode::Server);
        assert_eq!(options.attributes.value("icons"), Some("font"));
        assert!(options.attributes.is_locked("backend"));
        assert!(!options.header_footer);
        assert_eq!(options.max_nesting, 8);
    }
}
