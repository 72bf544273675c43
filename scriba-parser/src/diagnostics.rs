use std::fmt;

use serde::Serialize;

/// Severity of a collected diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A recoverable defect found while parsing: a structural problem, an unresolvable
/// directive, or a refused operation under the active safe mode.
///
/// Diagnostics are collected on the [`Document`](crate::Document) rather than
/// interleaved into its content, so callers can surface them without corrupting
/// rendered output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// 1-indexed source line the diagnostic refers to, when known.
    pub line: Option<usize>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Collector threaded through the preprocessor, the substitution engine and the block
/// grammar. Owned by a single in-progress parse; never shared between documents.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub(crate) fn warn(&mut self, line: Option<usize>, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(?line, %message);
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            line,
            message,
        });
    }

    pub(crate) fn error(&mut self, line: Option<usize>, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(?line, %message);
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            line,
            message,
        });
    }

    pub(crate) fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}
