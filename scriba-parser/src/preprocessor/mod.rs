//! The preprocessor: eager, line-producing expansion of include and conditional
//! directives, run before the block grammar ever sees the lines.
//!
//! Directive failures never abort the parse. A missing or refused include target is
//! replaced with an explicit "Unresolved directive" placeholder line and a warning;
//! unterminated or mismatched conditionals degrade the same way.

use std::path::{Path, PathBuf};

use crate::{
    AttributeStore, Options,
    diagnostics::Diagnostics,
    error::Error,
    subst::Substitutor,
};

mod attribute;
mod conditional;
mod include;

pub(crate) use attribute::{AttributeEntry, apply_entry, parse_line as parse_attribute_line};
pub(crate) use include::read_and_decode_file;

use include::Include;

/// Includes nested deeper than this are refused with a diagnostic.
const MAX_INCLUDE_DEPTH: usize = 16;

#[derive(Debug, Default)]
pub(crate) struct Preprocessor;

/// State carried through one expansion, including recursively processed includes.
struct Expansion<'a> {
    options: &'a Options,
    /// Working attribute values for conditional evaluation and include-target
    /// interpolation. The grammar re-applies attribute entries authoritatively as it
    /// encounters them in the output.
    attributes: AttributeStore,
    diagnostics: &'a mut Diagnostics,
    /// Containment root for include resolution under `SafeMode::Safe` and above.
    base_dir: PathBuf,
    include_depth: usize,
}

/// One open conditional region.
struct CondFrame {
    active: bool,
    names: Vec<String>,
    line: usize,
}

impl Preprocessor {
    pub(crate) fn process(
        &self,
        input: &str,
        file_path: Option<&Path>,
        options: &Options,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<String>, Error> {
        let base_dir = match &options.base_dir {
            Some(dir) => dir.clone(),
            None => file_path
                .and_then(Path::parent)
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
        };
        let mut expansion = Expansion {
            options,
            attributes: options.attributes.clone(),
            diagnostics,
            base_dir,
            include_depth: 0,
        };
        let mut output = Vec::with_capacity(input.lines().count());
        expansion.expand(input, file_path, &mut output);
        Ok(output)
    }

    pub(crate) fn process_file(
        &self,
        file_path: &Path,
        options: &Options,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<String>, Error> {
        let input = read_and_decode_file(file_path, None)?;
        self.process(&input, Some(file_path), options, diagnostics)
    }
}

impl Expansion<'_> {
    fn source_name(file_path: Option<&Path>) -> String {
        file_path.map_or_else(|| "<input>".to_string(), |p| p.display().to_string())
    }

    fn expand(&mut self, input: &str, file_path: Option<&Path>, output: &mut Vec<String>) {
        let lines: Vec<&str> = input.lines().map(str::trim_end).collect();
        let mut cond_stack: Vec<CondFrame> = Vec::new();
        let mut index = 0;

        while index < lines.len() {
            let line = lines[index];
            let line_number = index + 1;
            let active = cond_stack.iter().all(|frame| frame.active);

            if line.starts_with("endif::") && line.ends_with("[]") {
                match conditional::parse_endif(line) {
                    Some(endif) => match cond_stack.pop() {
                        Some(frame) => {
                            let closes = match &endif.attribute {
                                Some(name) => {
                                    frame.names.is_empty() || frame.names.contains(name)
                                }
                                None => true,
                            };
                            if !closes {
                                self.diagnostics.warn(
                                    Some(line_number),
                                    format!(
                                        "endif name does not match conditional opened at line {}",
                                        frame.line
                                    ),
                                );
                            }
                        }
                        None => {
                            self.diagnostics
                                .warn(Some(line_number), "endif without open conditional");
                        }
                    },
                    None => {
                        self.diagnostics
                            .warn(Some(line_number), "malformed endif directive");
                    }
                }
                index += 1;
                continue;
            }

            if is_conditional_directive(line) {
                match conditional::parse_line(line) {
                    Some(directive) => {
                        if let Some(content) = directive.content() {
                            // Single-line form: the bracket content is the entire
                            // conditional region.
                            if active
                                && directive.is_true(
                                    &self.attributes,
                                    self.diagnostics,
                                    line_number,
                                )
                            {
                                output.push(content.to_string());
                            }
                        } else {
                            let taken = active
                                && directive.is_true(
                                    &self.attributes,
                                    self.diagnostics,
                                    line_number,
                                );
                            cond_stack.push(CondFrame {
                                active: taken,
                                names: directive.names().to_vec(),
                                line: line_number,
                            });
                        }
                    }
                    None => {
                        self.diagnostics.warn(
                            Some(line_number),
                            "malformed conditional directive; keeping line as text",
                        );
                        if active {
                            output.push(line.to_string());
                        }
                    }
                }
                index += 1;
                continue;
            }

            if !active {
                index += 1;
                continue;
            }

            // A leading backslash escapes a directive line; the backslash is consumed.
            if let Some(escaped) = line.strip_prefix('\\') {
                if is_conditional_directive(escaped)
                    || (escaped.starts_with("endif::") && escaped.ends_with("[]"))
                    || (escaped.starts_with("include::") && escaped.ends_with(']'))
                {
                    output.push(escaped.to_string());
                    index += 1;
                    continue;
                }
            }

            if line.starts_with("include::") && line.ends_with(']') {
                self.expand_include(line, line_number, file_path, output);
                index += 1;
                continue;
            }

            if line.starts_with(':') {
                if let Some(entry) = attribute::parse_line(line) {
                    index = self.expand_attribute_entry(entry, line, index, &lines, output);
                    continue;
                }
            }

            output.push(line.to_string());
            index += 1;
        }

        for frame in &cond_stack {
            self.diagnostics.warn(
                Some(frame.line),
                "conditional directive not closed by end of input",
            );
        }
    }

    /// Apply an attribute entry (joining continuation lines) and emit the joined
    /// entry for the grammar. Returns the next line index.
    fn expand_attribute_entry(
        &mut self,
        entry: AttributeEntry,
        line: &str,
        index: usize,
        lines: &[&str],
        output: &mut Vec<String>,
    ) -> usize {
        let line_number = index + 1;
        let mut next = index + 1;
        let joined = if matches!(entry, AttributeEntry::Set { .. }) && attribute::wants_continuation(line)
        {
            let mut joined = attribute::strip_continuation(line).to_string();
            while next < lines.len() {
                let continuation = lines[next].trim();
                joined.push(' ');
                joined.push_str(attribute::strip_continuation(continuation));
                let more = attribute::wants_continuation(continuation);
                next += 1;
                if !more {
                    break;
                }
            }
            joined
        } else {
            line.to_string()
        };

        match attribute::parse_line(&joined) {
            Some(joined_entry) => {
                attribute::apply_entry(
                    joined_entry,
                    &mut self.attributes,
                    self.options.safe_mode,
                    self.diagnostics,
                    line_number,
                );
                output.push(joined);
            }
            None => output.push(line.to_string()),
        }
        next
    }

    fn expand_include(
        &mut self,
        line: &str,
        line_number: usize,
        file_path: Option<&Path>,
        output: &mut Vec<String>,
    ) {
        let source = Self::source_name(file_path);
        let Some(include) = Include::parse(line) else {
            self.diagnostics
                .warn(Some(line_number), "malformed include directive");
            output.push(line.to_string());
            return;
        };

        let target = Substitutor::new(&self.attributes, self.diagnostics, line_number)
            .substitute_attributes(&include.target);
        let placeholder = format!("Unresolved directive in {source} - include::{target}[]");

        if !self.options.safe_mode.allows_include_reads() {
            self.diagnostics.warn(
                Some(line_number),
                format!(
                    "include directive refused by safe mode {:?}: {target}",
                    self.options.safe_mode
                ),
            );
            output.push(placeholder);
            return;
        }
        if self.include_depth >= MAX_INCLUDE_DEPTH {
            self.diagnostics.warn(
                Some(line_number),
                format!("include depth limit ({MAX_INCLUDE_DEPTH}) exceeded: {target}"),
            );
            output.push(placeholder);
            return;
        }

        let parent_dir = file_path
            .and_then(Path::parent)
            .map_or_else(|| self.base_dir.clone(), Path::to_path_buf);
        let resolved = include::resolve_target(&target, &parent_dir);

        if !resolved.exists() {
            if !include.is_optional() {
                self.diagnostics.warn(
                    Some(line_number),
                    format!("include target not found: {}", resolved.display()),
                );
                output.push(placeholder);
            }
            return;
        }
        if self.options.safe_mode.confines_includes()
            && !include::is_contained(&resolved, &self.base_dir)
        {
            // Logged as a security warning; the document still renders.
            self.diagnostics.warn(
                Some(line_number),
                format!(
                    "include target escapes the base directory and was refused: {}",
                    resolved.display()
                ),
            );
            output.push(placeholder);
            return;
        }

        let content = match read_and_decode_file(&resolved, include.encoding.as_deref()) {
            Ok(content) => content,
            Err(error) => {
                self.diagnostics.warn(
                    Some(line_number),
                    format!("failed to read include target {}: {error}", resolved.display()),
                );
                output.push(placeholder);
                return;
            }
        };

        if !include.tags.is_empty() {
            tracing::warn!(tags = ?include.tags, "tag-filtered includes are not supported");
        }
        if let Some(level_offset) = include.level_offset {
            tracing::warn!(level_offset, "leveloffset is recorded but not applied");
        }
        if let Some(indent) = include.indent {
            tracing::warn!(indent, "indent is recorded but not applied");
        }

        let selected = include.select_lines(content.lines().map(str::to_string).collect());
        // Re-run the full expansion over the included lines so nested includes and
        // conditionals are filtered recursively.
        self.include_depth += 1;
        self.expand(&selected.join("\n"), Some(&resolved), output);
        self.include_depth -= 1;
    }
}

fn is_conditional_directive(line: &str) -> bool {
    (line.starts_with("ifdef::") || line.starts_with("ifndef::") || line.starts_with("ifeval::"))
        && line.ends_with(']')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn process(input: &str, options: &Options) -> (Vec<String>, Vec<crate::Diagnostic>) {
        let mut diagnostics = Diagnostics::default();
        let output = Preprocessor
            .process(input, None, options, &mut diagnostics)
            .unwrap();
        (output, diagnostics.into_entries())
    }

    #[test]
    fn test_ifdef_keeps_content_when_set() {
        let input = ":feature:\n\nifdef::feature[]\ncontent\nendif::[]\n";
        let (output, diagnostics) = process(input, &Options::default());
        assert_eq!(output, vec![":feature:", "", "content"]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_ifdef_drops_content_when_unset() {
        let input = "ifdef::feature[]\ncontent\nendif::[]\nafter";
        let (output, _) = process(input, &Options::default());
        assert_eq!(output, vec!["after"]);
    }

    #[test]
    fn test_ifndef_inverts() {
        let input = "ifndef::feature[]\ncontent\nendif::[]";
        let (output, _) = process(input, &Options::default());
        assert_eq!(output, vec!["content"]);
    }

    #[test]
    fn test_nested_conditionals() {
        let input = ":outer:\n\nifdef::outer[]\nkept\nifdef::inner[]\ndropped\nendif::[]\nalso kept\nendif::[]";
        let (output, diagnostics) = process(input, &Options::default());
        assert_eq!(output, vec![":outer:", "", "kept", "also kept"]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_single_line_conditional() {
        let input = ":feature:\nifdef::feature[inline content]\nifdef::other[gone]";
        let (output, _) = process(input, &Options::default());
        assert_eq!(output, vec![":feature:", "inline content"]);
    }

    #[test]
    fn test_named_endif() {
        let input = ":a:\nifdef::a[]\ncontent\nendif::a[]";
        let (output, diagnostics) = process(input, &Options::default());
        assert_eq!(output, vec![":a:", "content"]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_mismatched_endif_warns_but_closes() {
        let input = "ifdef::a[]\ncontent\nendif::other[]\nafter";
        let (output, diagnostics) = process(input, &Options::default());
        assert_eq!(output, vec!["after"]);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_unterminated_conditional_warns() {
        let input = "ifdef::missing[]\nnever closed";
        let (output, diagnostics) = process(input, &Options::default());
        assert!(output.is_empty());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_escaped_directive_kept_literal() {
        let input = "\\ifdef::feature[]\n\\include::file.sba[]";
        let (output, _) = process(input, &Options::default());
        assert_eq!(output, vec!["ifdef::feature[]", "include::file.sba[]"]);
    }

    #[test]
    fn test_attribute_continuation_joins_with_single_space() {
        let input = ":description: first part +\nsecond part\ntext {description}";
        let (output, _) = process(input, &Options::default());
        assert_eq!(
            output,
            vec![":description: first part second part", "text {description}"]
        );
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_include_refused_under_secure_mode() {
        let input = "include::other.sba[]";
        let (output, diagnostics) = process(input, &Options::default());
        assert_eq!(
            output,
            vec!["Unresolved directive in <input> - include::other.sba[]"]
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(logs_contain("refused by safe mode"));
    }

    #[test]
    fn test_missing_include_produces_placeholder() {
        let options = Options::builder()
            .with_safe_mode(crate::SafeMode::Unsafe)
            .build();
        let input = "include::definitely-missing.sba[]";
        let (output, diagnostics) = process(input, &options);
        assert_eq!(
            output,
            vec!["Unresolved directive in <input> - include::definitely-missing.sba[]"]
        );
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_optional_missing_include_is_silent() {
        let options = Options::builder()
            .with_safe_mode(crate::SafeMode::Unsafe)
            .build();
        let input = "before\ninclude::definitely-missing.sba[opts=optional]\nafter";
        let (output, diagnostics) = process(input, &options);
        assert_eq!(output, vec!["before", "after"]);
        assert!(diagnostics.is_empty());
    }
}
