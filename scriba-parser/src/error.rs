use std::path::PathBuf;

/// Hard failures of the parse entry points.
///
/// Malformed *documents* never produce these: structural defects and unresolvable
/// directives degrade to diagnostics on the returned [`Document`](crate::Document).
/// `Error` is reserved for embedder mistakes (bad configuration) and resource
/// exhaustion, the only cases where a parse is allowed to abort.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid safe mode: {0}")]
    InvalidSafeMode(String),

    #[error("base directory does not exist: {0}")]
    InvalidBaseDir(PathBuf),

    #[error("nesting limit of {0} exceeded at line {1}")]
    NestingLimitExceeded(usize, usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unrecognized encoding in file: {0}")]
    UnrecognizedEncodingInFile(String),

    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nesting_limit_display() {
        let error = Error::NestingLimitExceeded(64, 120);
        assert_eq!(format!("{error}"), "nesting limit of 64 exceeded at line 120");
    }

    #[test]
    fn test_invalid_base_dir_display() {
        let error = Error::InvalidBaseDir(PathBuf::from("/no/such/dir"));
        assert_eq!(
            format!("{error}"),
            "base directory does not exist: /no/such/dir"
        );
    }
}
