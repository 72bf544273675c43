//! List parsing: unordered, ordered and description lists, nesting, and `+`
//! continuation lines.

use crate::{
    Block, DescriptionList, DescriptionListItem, List, ListItem, ListKind, Location, OrderedStyle,
    error::Error,
    reader::Reader,
    subst,
};

use super::{BlockParser, Pending, classify_fence, is_comment_line};

/// Marker families. Sibling items must share one family (and run depth, for the
/// dotted/starred families); any change starts a new list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MarkerFamily {
    Asterisk,
    Dash,
    Dot,
    Arabic,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
}

impl MarkerFamily {
    fn kind(self) -> ListKind {
        match self {
            MarkerFamily::Asterisk | MarkerFamily::Dash => ListKind::Unordered,
            MarkerFamily::Dot
            | MarkerFamily::Arabic
            | MarkerFamily::LowerAlpha
            | MarkerFamily::UpperAlpha
            | MarkerFamily::LowerRoman
            | MarkerFamily::UpperRoman => ListKind::Ordered,
        }
    }

    fn style(self) -> Option<OrderedStyle> {
        match self {
            MarkerFamily::Asterisk | MarkerFamily::Dash => None,
            MarkerFamily::Dot | MarkerFamily::Arabic => Some(OrderedStyle::Arabic),
            MarkerFamily::LowerAlpha => Some(OrderedStyle::LowerAlpha),
            MarkerFamily::UpperAlpha => Some(OrderedStyle::UpperAlpha),
            MarkerFamily::LowerRoman => Some(OrderedStyle::LowerRoman),
            MarkerFamily::UpperRoman => Some(OrderedStyle::UpperRoman),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Marker {
    pub(super) family: MarkerFamily,
    /// Run length for the `*`/`.` families, 1 otherwise.
    pub(super) depth: usize,
    pub(super) text: String,
}

impl Marker {
    fn key(&self) -> (MarkerFamily, usize) {
        (self.family, self.depth)
    }
}

/// Classify a list-marker line. Returns the marker and the principal text after it.
pub(super) fn split_marker(line: &str) -> Option<(Marker, &str)> {
    let stripped = line.trim_start();

    // `*`, `**`, ... and `.`-runs; `-` has no run form.
    for (c, family) in [('*', MarkerFamily::Asterisk), ('.', MarkerFamily::Dot)] {
        let run = stripped.chars().take_while(|&x| x == c).count();
        if run >= 1 && run <= 5 {
            if let Some(rest) = stripped[run..].strip_prefix(' ') {
                let rest = rest.trim_start();
                if !rest.is_empty() {
                    return Some((
                        Marker {
                            family,
                            depth: run,
                            text: stripped[..run].to_string(),
                        },
                        rest,
                    ));
                }
            }
        }
    }
    if let Some(rest) = stripped.strip_prefix("- ") {
        let rest = rest.trim_start();
        if !rest.is_empty() {
            return Some((
                Marker {
                    family: MarkerFamily::Dash,
                    depth: 1,
                    text: "-".to_string(),
                },
                rest,
            ));
        }
    }

    // Explicit ordered markers: `1.`, `a.`, `A.`, `i)`, `I)`.
    let (marker_len, family) = classify_ordered_marker(stripped)?;
    let rest = stripped[marker_len..].strip_prefix(' ')?.trim_start();
    if rest.is_empty() {
        return None;
    }
    Some((
        Marker {
            family,
            depth: 1,
            text: stripped[..marker_len].to_string(),
        },
        rest,
    ))
}

fn classify_ordered_marker(s: &str) -> Option<(usize, MarkerFamily)> {
    let digits = s.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && s[digits..].starts_with('.') {
        return Some((digits + 1, MarkerFamily::Arabic));
    }
    let mut chars = s.chars();
    let first = chars.next()?;
    let second = chars.next()?;
    if second == '.' {
        if first.is_ascii_lowercase() {
            return Some((2, MarkerFamily::LowerAlpha));
        }
        if first.is_ascii_uppercase() {
            return Some((2, MarkerFamily::UpperAlpha));
        }
    }
    let lower_roman = s.chars().take_while(|c| "ivxlcdm".contains(*c)).count();
    if lower_roman > 0 && s[lower_roman..].starts_with(')') {
        return Some((lower_roman + 1, MarkerFamily::LowerRoman));
    }
    let upper_roman = s.chars().take_while(|c| "IVXLCDM".contains(*c)).count();
    if upper_roman > 0 && s[upper_roman..].starts_with(')') {
        return Some((upper_roman + 1, MarkerFamily::UpperRoman));
    }
    None
}

pub(super) fn classify_marker(line: &str) -> Option<Marker> {
    split_marker(line).map(|(marker, _)| marker)
}

/// Classify a description-list line: `term:: principal`. The delimiter must be
/// followed by whitespace or end the line.
pub(super) fn classify_description_item(line: &str) -> Option<(&str, &str, &str)> {
    if line.starts_with(':') {
        return None;
    }
    for delimiter in ["::::", ":::", "::", ";;"] {
        if let Some(position) = line.find(delimiter) {
            let term = line[..position].trim();
            let after = &line[position + delimiter.len()..];
            if term.is_empty() {
                continue;
            }
            if after.is_empty() {
                return Some((term, delimiter, ""));
            }
            if after.starts_with([' ', '\t']) {
                return Some((term, delimiter, after.trim()));
            }
        }
    }
    None
}

/// Whether this line can interrupt a list item's principal text.
fn interrupts_item(line: &str, reader: &Reader) -> bool {
    let trimmed = line.trim_end();
    trimmed.is_empty()
        || trimmed == "+"
        || is_comment_line(trimmed)
        || split_marker(trimmed).is_some()
        || classify_description_item(trimmed).is_some()
        || classify_fence(trimmed).is_some()
        || reader.matches_any_terminator(trimmed)
}

impl BlockParser<'_> {
    pub(super) fn parse_list(
        &mut self,
        reader: &mut Reader,
        first: Marker,
        pending: Pending,
        active: &mut Vec<(MarkerFamily, usize)>,
    ) -> Result<Block, Error> {
        let start_line = reader.line_number();
        self.enter_nested(start_line)?;
        active.push(first.key());

        let mut items: Vec<ListItem> = Vec::new();
        loop {
            let Some(line) = reader.peek_line() else {
                break;
            };
            let text = line.text.trim_end().to_string();
            let number = line.number;

            if text.is_empty() {
                // A blank line ends the list unless a further item or continuation
                // follows directly.
                reader.skip_blank_lines();
                let continues = reader.peek_line().is_some_and(|next| {
                    let t = next.text.trim_end();
                    t == "+" || split_marker(t).is_some() || classify_description_item(t).is_some()
                });
                if continues {
                    continue;
                }
                break;
            }
            if reader.at_terminator() || reader.matches_any_terminator(&text) {
                break;
            }
            if is_comment_line(&text) {
                self.skip_comment(reader);
                continue;
            }
            if text == "+" {
                // Block continuation: attach the following block to the current item.
                let Some(last) = items.last_mut() else {
                    break;
                };
                reader.consume_line();
                if let Some(block) = self.next_block(reader, Pending::default())? {
                    last.blocks.push(block);
                }
                continue;
            }

            match split_marker(&text) {
                Some((marker, rest)) if marker.key() == first.key() => {
                    reader.consume_line();
                    let mut principal_lines = vec![rest.to_string()];
                    while let Some(next) = reader.peek_line() {
                        if interrupts_item(&next.text, reader) {
                            break;
                        }
                        let Some(next) = reader.consume_line() else {
                            break;
                        };
                        principal_lines.push(next.text.trim().to_string());
                    }
                    let end = number + principal_lines.len() - 1;
                    let principal =
                        self.substitute(&principal_lines.join("\n"), subst::NORMAL, number);
                    items.push(ListItem {
                        marker: marker.text,
                        principal,
                        blocks: Vec::new(),
                        location: Location::new(number, end),
                    });
                }
                Some((marker, _)) => {
                    if active.contains(&marker.key()) || items.is_empty() {
                        // An ancestor's marker: this item belongs further out.
                        break;
                    }
                    let nested =
                        self.parse_list(reader, marker, Pending::default(), active)?;
                    if let Some(last) = items.last_mut() {
                        last.blocks.push(nested);
                    }
                }
                None => {
                    if classify_description_item(&text).is_some() && !items.is_empty() {
                        let nested = self.parse_description_list(reader, Pending::default())?;
                        if let Some(last) = items.last_mut() {
                            last.blocks.push(nested);
                        }
                        continue;
                    }
                    break;
                }
            }
        }

        active.pop();
        self.leave_nested();
        let end_line = reader.line_number().saturating_sub(1);
        let title = self.pending_title(pending.title.as_deref(), start_line);
        Ok(Block::List(List {
            kind: first.family.kind(),
            marker: first.text,
            style: first.family.style(),
            metadata: pending.metadata,
            title,
            items,
            location: Location::new(start_line, end_line),
        }))
    }

    pub(super) fn parse_description_list(
        &mut self,
        reader: &mut Reader,
        pending: Pending,
    ) -> Result<Block, Error> {
        let start_line = reader.line_number();
        self.enter_nested(start_line)?;

        let mut items: Vec<DescriptionListItem> = Vec::new();
        let mut first_delimiter: Option<String> = None;

        loop {
            let Some(line) = reader.peek_line() else {
                break;
            };
            let text = line.text.trim_end().to_string();
            let number = line.number;

            if text.is_empty() {
                reader.skip_blank_lines();
                let continues = reader.peek_line().is_some_and(|next| {
                    let t = next.text.trim_end();
                    t == "+" || classify_description_item(t).is_some()
                });
                if continues {
                    continue;
                }
                break;
            }
            if reader.at_terminator() || reader.matches_any_terminator(&text) {
                break;
            }
            if is_comment_line(&text) {
                self.skip_comment(reader);
                continue;
            }
            if text == "+" {
                let Some(last) = items.last_mut() else {
                    break;
                };
                reader.consume_line();
                if let Some(block) = self.next_block(reader, Pending::default())? {
                    last.description.push(block);
                }
                continue;
            }
            if let Some(marker) = classify_marker(&text) {
                // A bulleted list nested in the current description.
                let Some(_) = items.last() else { break };
                let mut active = Vec::new();
                let nested = self.parse_list(reader, marker, Pending::default(), &mut active)?;
                if let Some(last) = items.last_mut() {
                    last.description.push(nested);
                }
                continue;
            }

            let Some((term, delimiter, principal)) = classify_description_item(&text) else {
                break;
            };
            match &first_delimiter {
                None => first_delimiter = Some(delimiter.to_string()),
                Some(first) if first != delimiter => {
                    // A longer delimiter nests a child list under the last item; a
                    // shorter one belongs to an enclosing list.
                    if delimiter.len() <= first.len() || items.is_empty() {
                        break;
                    }
                    let nested = self.parse_description_list(reader, Pending::default())?;
                    if let Some(last) = items.last_mut() {
                        last.description.push(nested);
                    }
                    continue;
                }
                Some(_) => {}
            }

            let term = term.to_string();
            let delimiter = delimiter.to_string();
            let principal = principal.to_string();
            reader.consume_line();

            // Indented follow-up lines form the description paragraph.
            let mut description_lines: Vec<String> = Vec::new();
            while let Some(next) = reader.peek_line() {
                let t = next.text.clone();
                if t.trim().is_empty()
                    || !t.starts_with([' ', '\t'])
                    || classify_description_item(t.trim_end()).is_some()
                    || split_marker(t.trim_end()).is_some()
                {
                    break;
                }
                reader.consume_line();
                description_lines.push(t.trim().to_string());
            }

            let term_nodes = self.substitute(&term, subst::NORMAL, number);
            let principal_nodes = if principal.is_empty() {
                Vec::new()
            } else {
                self.substitute(&principal, subst::NORMAL, number)
            };
            let mut description = Vec::new();
            if !description_lines.is_empty() {
                let content =
                    self.substitute(&description_lines.join("\n"), subst::NORMAL, number);
                description.push(Block::Paragraph(crate::Paragraph {
                    metadata: crate::BlockMetadata::default(),
                    title: None,
                    content,
                    location: Location::new(number + 1, number + description_lines.len()),
                }));
            }

            items.push(DescriptionListItem {
                term: term_nodes,
                delimiter,
                principal: principal_nodes,
                description,
                location: Location::new(number, number + description_lines.len()),
            });
        }

        self.leave_nested();
        let end_line = reader.line_number().saturating_sub(1);
        let title = self.pending_title(pending.title.as_deref(), start_line);
        Ok(Block::DescriptionList(DescriptionList {
            metadata: pending.metadata,
            title,
            items,
            location: Location::new(start_line, end_line),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unordered_markers() {
        let (marker, rest) = split_marker("* item text").unwrap();
        assert_eq!(marker.family, MarkerFamily::Asterisk);
        assert_eq!(marker.depth, 1);
        assert_eq!(rest, "item text");

        let (marker, _) = split_marker("** nested").unwrap();
        assert_eq!(marker.depth, 2);

        let (marker, _) = split_marker("- dashed").unwrap();
        assert_eq!(marker.family, MarkerFamily::Dash);
    }

    #[test]
    fn test_ordered_markers() {
        assert_eq!(
            split_marker(". item").unwrap().0.family,
            MarkerFamily::Dot
        );
        assert_eq!(
            split_marker("3. item").unwrap().0.family,
            MarkerFamily::Arabic
        );
        assert_eq!(
            split_marker("b. item").unwrap().0.family,
            MarkerFamily::LowerAlpha
        );
        assert_eq!(
            split_marker("IV) item").unwrap().0.family,
            MarkerFamily::UpperRoman
        );
    }

    #[test]
    fn test_marker_requires_space_and_text() {
        assert!(split_marker("*bold* text").is_none());
        assert!(split_marker("* ").is_none());
        assert!(split_marker("plain text").is_none());
    }

    #[test]
    fn test_description_item() {
        assert_eq!(
            classify_description_item("term:: the description"),
            Some(("term", "::", "the description"))
        );
        assert_eq!(
            classify_description_item("term::"),
            Some(("term", "::", ""))
        );
        assert_eq!(
            classify_description_item("deep:::: text"),
            Some(("deep", "::::", "text"))
        );
        // A macro target is not a description term.
        assert_eq!(classify_description_item("image::pic.png[]"), None);
        assert_eq!(classify_description_item(":attr: value"), None);
    }
}
