//! Block metadata lines: attribute lists (`[style,pos,name=value]`), anchors
//! (`[[id]]`) and block titles (`.Title`). These attach to the next block; none of
//! them produces a tree node of its own.

use crate::model::BlockMetadata;

peg::parser! {
    grammar attrlist_parser() for str {
        /// `[[id]]` or `[[id,reftext]]`
        pub(crate) rule anchor() -> (String, Option<String>)
            = "[[" id:anchor_id() reftext:("," r:$((![']'] [_])+) { r.trim().to_string() })? "]]" {
                (id, reftext)
            }

        rule anchor_id() -> String
            = id:$(['a'..='z' | 'A'..='Z' | '_'] ['a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | ':' | '.']*) {
                id.to_string()
            }

        /// `[positional, name=value, ...]`
        pub(crate) rule attrlist() -> Vec<(Option<String>, String)>
            = "[" items:(item() ** ",") "]" { items }

        rule item() -> (Option<String>, String)
            = whitespace()? name:name() "=" value:value() whitespace()? {
                (Some(name), value)
            }
            / whitespace()? value:value() whitespace()? { (None, value) }

        rule name() -> String
            = n:$(['a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_']+) { n.to_string() }

        rule value() -> String
            = "\"" v:$((!['"'] [_])*) "\"" { v.to_string() }
            / "'" v:$((!['\''] [_])*) "'" { v.to_string() }
            / v:$((![',' | ']'] [_])*) { v.trim().to_string() }

        rule whitespace() = quiet!{[' ' | '\t']+}
    }
}

/// Parse an anchor line. Returns the id (reftext is recorded in the id slot only).
pub(crate) fn parse_anchor(line: &str) -> Option<String> {
    attrlist_parser::anchor(line.trim_end()).ok().map(|(id, _)| id)
}

/// Parse an attribute-list line into block metadata.
///
/// The first positional occupies the style slot and may carry `#id` and `.role`
/// shorthand suffixes. The `role` and `options`/`opts` named attributes feed the
/// corresponding list slots; everything else lands in `positional`/`named`.
pub(crate) fn parse_attrlist(line: &str) -> Option<BlockMetadata> {
    let items = attrlist_parser::attrlist(line.trim_end()).ok()?;
    let mut metadata = BlockMetadata::default();
    let mut first_positional = true;

    for (name, value) in items {
        match name {
            Some(name) => match name.as_str() {
                "id" => metadata.id = Some(value),
                "role" => metadata
                    .roles
                    .extend(value.split_whitespace().map(str::to_string)),
                "options" | "opts" => metadata
                    .options
                    .extend(value.split(',').map(|o| o.trim().to_string())),
                _ => metadata.named.push((name, value)),
            },
            None if first_positional => {
                first_positional = false;
                if !value.is_empty() {
                    apply_style_shorthand(&mut metadata, &value);
                }
            }
            None => {
                if !value.is_empty() {
                    metadata.positional.push(value);
                }
            }
        }
    }
    Some(metadata)
}

/// Split a style token like `quote#id.role1.role2` into its parts.
fn apply_style_shorthand(metadata: &mut BlockMetadata, token: &str) {
    let mut style_end = token.len();
    for (index, c) in token.char_indices() {
        if c == '#' || c == '.' {
            style_end = index;
            break;
        }
    }
    if style_end > 0 {
        metadata.style = Some(token[..style_end].to_string());
    }
    let mut rest = &token[style_end..];
    while !rest.is_empty() {
        let marker = rest.chars().next();
        let tail = &rest[1..];
        let end = tail
            .find(['#', '.'])
            .unwrap_or(tail.len());
        let part = &tail[..end];
        match marker {
            Some('#') if !part.is_empty() => metadata.id = Some(part.to_string()),
            Some('.') if !part.is_empty() => metadata.roles.push(part.to_string()),
            _ => {}
        }
        rest = &tail[end..];
    }
}

/// Whether a line is a block title (`.Title`), returning the raw title text.
pub(crate) fn parse_block_title(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('.')?;
    let first = rest.chars().next()?;
    if first == '.' || first.is_whitespace() {
        return None;
    }
    Some(rest)
}

/// Whether the line is an anchor line (`[[...]]`).
pub(crate) fn is_anchor_line(line: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed.starts_with("[[") && trimmed.ends_with("]]")
}

/// Whether the line could be an attribute list (`[...]` but not `[[...]]`).
pub(crate) fn is_attrlist_line(line: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed.len() >= 2
        && trimmed.starts_with('[')
        && !trimmed.starts_with("[[")
        && trimmed.ends_with(']')
}
