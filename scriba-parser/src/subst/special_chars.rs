//! Special-character escaping. Always the first pass, so later passes can emit raw
//! entity syntax safely.

/// Escape `<`, `>` and `&` to their entities. Ampersands that already start an entity
/// are left alone, so running the pass over previously escaped text never
/// double-escapes.
pub(crate) fn escape(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);
    for (index, c) in text.char_indices() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' if !is_entity(&text[index..]) => result.push_str("&amp;"),
            other => result.push(other),
        }
    }
    result
}

/// Whether `s` (starting with `&`) begins a character entity: `&name;`, `&#NNNN;` or
/// `&#xHH;`.
fn is_entity(s: &str) -> bool {
    let rest = &s[1..];
    if let Some(numeric) = rest.strip_prefix('#') {
        let (digits, radix): (&str, u32) = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16),
            None => (numeric, 10),
        };
        let len = digits
            .chars()
            .take_while(|c| c.is_digit(radix))
            .count();
        (1..=8).contains(&len) && digits[len..].starts_with(';')
    } else {
        let len = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .count();
        len >= 2
            && rest.starts_with(|c: char| c.is_ascii_alphabetic())
            && rest[len..].starts_with(';')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_angle_brackets_and_ampersand() {
        assert_eq!(escape("a < b > c & d"), "a &lt; b &gt; c &amp; d");
    }

    #[test]
    fn test_does_not_double_escape_entities() {
        assert_eq!(escape("&lt;already&gt;"), "&lt;already&gt;");
        assert_eq!(escape("&#160;"), "&#160;");
        assert_eq!(escape("&#x2014;"), "&#x2014;");
    }

    #[test]
    fn test_bare_ampersand_is_escaped() {
        assert_eq!(escape("AT&T"), "AT&amp;T");
        assert_eq!(escape("fish & chips;"), "fish &amp; chips;");
    }

    #[test]
    fn test_idempotent() {
        let once = escape("a < b & c");
        assert_eq!(escape(&once), once);
    }
}
