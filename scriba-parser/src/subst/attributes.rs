//! Attribute-reference interpolation: `{name}` and `{name?value}`.

use crate::constants::intrinsic;

use super::Substitutor;

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl Substitutor<'_> {
    /// Replace `{name}` references with the attribute's current value. Names missing
    /// from the store fall back to the built-in character intrinsics; a name matching
    /// neither is left as literal text with a diagnostic. `{name?value}` expands to
    /// `value` only when `name` is set and non-empty, to nothing otherwise.
    pub(crate) fn substitute_attributes(&mut self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(open) = rest.find('{') {
            result.push_str(&rest[..open]);
            let after_open = &rest[open + 1..];

            // A backslash escapes the reference; it is consumed, the braces kept.
            if result.ends_with('\\') {
                result.pop();
                result.push('{');
                rest = after_open;
                continue;
            }

            let Some((reference, remainder)) = split_reference(after_open) else {
                result.push('{');
                rest = after_open;
                continue;
            };

            match parse_reference(reference) {
                Reference::Conditional { name, value } => {
                    if self.attributes.value(name).is_some_and(|v| !v.is_empty()) {
                        result.push_str(value);
                    }
                }
                Reference::Plain(name) => {
                    if let Some(value) = self.attributes.value(name) {
                        result.push_str(value);
                    } else if let Some(value) = intrinsic(name) {
                        result.push_str(value);
                    } else {
                        self.diagnostics.warn(
                            Some(self.line),
                            format!("unresolved attribute reference: {{{name}}}"),
                        );
                        result.push('{');
                        result.push_str(name);
                        result.push('}');
                    }
                }
                Reference::NotAReference => {
                    result.push('{');
                    result.push_str(reference);
                    result.push('}');
                }
            }
            rest = remainder;
        }
        result.push_str(rest);
        result
    }
}

/// Split `name}rest` into the reference body and the remainder after `}`.
fn split_reference(s: &str) -> Option<(&str, &str)> {
    let close = s.find('}')?;
    Some((&s[..close], &s[close + 1..]))
}

enum Reference<'a> {
    Plain(&'a str),
    Conditional { name: &'a str, value: &'a str },
    NotAReference,
}

fn parse_reference(body: &str) -> Reference<'_> {
    if let Some(question) = body.find('?') {
        let (name, value) = (&body[..question], &body[question + 1..]);
        if !name.is_empty() && name.chars().all(is_name_char) {
            return Reference::Conditional { name, value };
        }
        return Reference::NotAReference;
    }
    if !body.is_empty() && body.chars().all(is_name_char) {
        return Reference::Plain(body);
    }
    Reference::NotAReference
}
