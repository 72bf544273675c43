//! The include directive: `include::target[attrs]`.
//!
//! Parsing and file access live here; the expansion loop in the parent module splices
//! the resolved lines (or the unresolved-directive placeholder) into the output.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

use crate::error::Error;

/// A parsed include directive.
#[derive(Debug)]
pub(crate) struct Include {
    pub(crate) target: String,
    pub(crate) level_offset: Option<isize>,
    pub(crate) line_ranges: Vec<LinesRange>,
    pub(crate) tags: Vec<String>,
    pub(crate) indent: Option<usize>,
    pub(crate) encoding: Option<String>,
    pub(crate) opts: Vec<String>,
}

/// A line range an include may select: a single line or a `start..end` range where
/// `end` may be `-1` for end-of-file.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum LinesRange {
    Single(usize),
    Range(usize, isize),
}

peg::parser! {
    grammar include_parser() for str {
        pub(crate) rule include() -> (String, Vec<(String, String)>)
            = "include::" target:target() "[" attrs:attributes()? "]" {
                (target, attrs.unwrap_or_default())
            }

        rule target() -> String
            = t:$((!['[' | ' ' | '\t'] [_])+) {
                t.to_string()
            }

        rule attributes() -> Vec<(String, String)>
            = pair:attribute_pair() pairs:("," p:attribute_pair() { p })* {
                let mut attrs = vec![pair];
                attrs.extend(pairs);
                attrs
            }

        rule attribute_pair() -> (String, String)
            = k:attribute_key() "=" v:attribute_value() {
                (k, v)
            }
            / o:attribute_key() { (o, String::new()) }

        rule attribute_key() -> String
            = k:$(['a'..='z' | 'A'..='Z']+) {
                k.to_string()
            }

        rule attribute_value() -> String
            = "\"" v:$((!['"'] [_])*) "\"" { v.to_string() }
        / v:$((![','] ![']'] [_])*) { v.to_string() }
    }
}

impl FromStr for LinesRange {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((start, end)) = s.split_once("..") {
            let start = start.trim().parse().map_err(|_| ())?;
            let end = end.trim().parse().map_err(|_| ())?;
            Ok(LinesRange::Range(start, end))
        } else {
            Ok(LinesRange::Single(s.trim().parse().map_err(|_| ())?))
        }
    }
}

impl LinesRange {
    fn parse_list(value: &str) -> Vec<Self> {
        let separator = if value.contains(';') { ';' } else { ',' };
        value
            .split(separator)
            .filter_map(|part| LinesRange::from_str(part).ok())
            .collect()
    }
}

impl Include {
    /// Parse an include directive line, or `None` if the line is not one.
    pub(crate) fn parse(line: &str) -> Option<Self> {
        let (target, attrs) = include_parser::include(line).ok()?;
        let mut include = Include {
            target,
            level_offset: None,
            line_ranges: Vec::new(),
            tags: Vec::new(),
            indent: None,
            encoding: None,
            opts: Vec::new(),
        };
        for (key, value) in attrs {
            match key.as_str() {
                "leveloffset" => {
                    include.level_offset = value.trim_start_matches('+').parse().ok();
                }
                "lines" => include.line_ranges.extend(LinesRange::parse_list(&value)),
                "tag" => include.tags.push(value),
                "tags" => include.tags.extend(value.split(';').map(str::to_string)),
                "indent" => include.indent = value.parse().ok(),
                "encoding" => include.encoding = Some(value),
                "opts" | "optional" if value.is_empty() => {
                    include.opts.push(key);
                }
                "opts" => include.opts.extend(value.split(',').map(str::to_string)),
                unknown => {
                    tracing::warn!(?unknown, "unknown attribute key in include directive");
                }
            }
        }
        Some(include)
    }

    pub(crate) fn is_optional(&self) -> bool {
        self.opts.iter().any(|o| o == "optional")
    }

    /// Select the requested line ranges from the included content.
    pub(crate) fn select_lines(&self, content_lines: Vec<String>) -> Vec<String> {
        if self.line_ranges.is_empty() {
            return content_lines;
        }
        let mut lines = Vec::new();
        for range in &self.line_ranges {
            match range {
                LinesRange::Single(number) => {
                    if *number >= 1 && let Some(line) = content_lines.get(number - 1) {
                        lines.push(line.clone());
                    }
                }
                LinesRange::Range(start, end) => {
                    if *start < 1 {
                        tracing::warn!(?start, "invalid start line in include directive");
                        continue;
                    }
                    let start = start - 1;
                    let end = if *end == -1 {
                        content_lines.len()
                    } else if *end >= 1 {
                        usize::try_from(*end).map_or(content_lines.len(), |e| {
                            e.min(content_lines.len())
                        })
                    } else {
                        tracing::warn!(?end, "invalid end line in include directive");
                        continue;
                    };
                    if start < end {
                        lines.extend(content_lines[start..end].iter().cloned());
                    }
                }
            }
        }
        lines
    }
}

/// BOM (Byte Order Mark) patterns for encoding detection.
const BOM_PATTERNS: &[(&[u8], &Encoding, usize, &str)] = &[
    (&[0xEF, 0xBB, 0xBF], UTF_8, 3, "UTF-8"),
    (&[0xFF, 0xFE], UTF_16LE, 2, "UTF-16 LE"),
    (&[0xFE, 0xFF], UTF_16BE, 2, "UTF-16 BE"),
];

/// Read a file and decode it based on BOM or an explicit encoding label.
///
/// # Errors
/// Fails if the file cannot be read, the encoding label is unknown, or the content is
/// not valid UTF-8 and carries no BOM.
pub(crate) fn read_and_decode_file(
    file_path: &Path,
    encoding: Option<&str>,
) -> Result<String, Error> {
    let bytes = std::fs::read(file_path)?;

    if let Some(enc_label) = encoding {
        if let Some(encoding) = Encoding::for_label(enc_label.as_bytes()) {
            let (cow, _, had_errors) = encoding.decode(&bytes);
            if had_errors {
                tracing::error!(
                    path = ?file_path.display(),
                    encoding = %enc_label,
                    "decoding encountered errors"
                );
            }
            return Ok(cow.into_owned());
        }
        return Err(Error::UnknownEncoding(enc_label.to_string()));
    }

    for (bom, encoding, skip, name) in BOM_PATTERNS {
        if bytes.starts_with(bom)
            && let Some(content) = bytes.get(*skip..)
        {
            let (cow, _, had_errors) = encoding.decode(content);
            if had_errors {
                tracing::error!(
                    path = ?file_path.display(),
                    encoding = name,
                    "decoding encountered errors"
                );
            }
            return Ok(cow.into_owned());
        }
    }

    let (cow, _, had_errors) = UTF_8.decode(&bytes);
    if !had_errors {
        return Ok(cow.into_owned());
    }
    Err(Error::UnrecognizedEncodingInFile(
        file_path.display().to_string(),
    ))
}

/// Whether `path` resolves inside the `root` subtree. Both sides canonicalize, so
/// `..` segments and symlinks cannot escape the containment check.
pub(crate) fn is_contained(path: &Path, root: &Path) -> bool {
    match (path.canonicalize(), root.canonicalize()) {
        (Ok(path), Ok(root)) => path.starts_with(root),
        _ => false,
    }
}

/// Resolve an include target relative to the including file's directory.
pub(crate) fn resolve_target(target: &str, parent_dir: &Path) -> PathBuf {
    let target_path = Path::new(target);
    if target_path.is_absolute() {
        target_path.to_path_buf()
    } else {
        parent_dir.join(target_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_include() {
        let include = Include::parse("include::target.sba[]").unwrap();
        assert_eq!(include.target, "target.sba");
        assert!(include.line_ranges.is_empty());
    }

    #[test]
    fn test_parse_include_with_attributes() {
        let include =
            Include::parse("include::target.sba[leveloffset=+1,lines=1..5,tag=example]").unwrap();
        assert_eq!(include.level_offset, Some(1));
        assert_eq!(include.line_ranges, vec![LinesRange::Range(1, 5)]);
        assert_eq!(include.tags, vec!["example"]);
    }

    #[test]
    fn test_parse_optional_include() {
        let include = Include::parse("include::missing.sba[opts=optional]").unwrap();
        assert!(include.is_optional());
    }

    #[test]
    fn test_not_an_include() {
        assert!(Include::parse("include without directive").is_none());
        assert!(Include::parse("exclude::target[]").is_none());
    }

    #[test]
    fn test_select_single_and_ranges() {
        let content: Vec<String> = (1..=6).map(|n| format!("line {n}")).collect();
        let include = Include::parse("include::f[lines=1;3..4]").unwrap();
        assert_eq!(
            include.select_lines(content.clone()),
            vec!["line 1", "line 3", "line 4"]
        );
        let include = Include::parse("include::f[lines=5..-1]").unwrap();
        assert_eq!(include.select_lines(content), vec!["line 5", "line 6"]);
    }

    #[test]
    fn test_resolve_relative_target() {
        let resolved = resolve_target("sub/file.sba", Path::new("/docs"));
        assert_eq!(resolved, PathBuf::from("/docs/sub/file.sba"));
    }
}
