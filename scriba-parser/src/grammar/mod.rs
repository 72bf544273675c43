//! The block grammar: a recursive-descent pass over the [`Reader`] that classifies
//! each non-blank line with a priority-ordered rule list and builds the typed tree.
//!
//! Classification order per line: terminator fences, comments, delimited fences,
//! metadata lines, section titles (single-line and title+underline), list markers,
//! breaks and block macros, and finally paragraph accretion. The order is fixed;
//! rules are attempted top to bottom with early exit on first match.

use crate::{
    Admonition, AdmonitionVariant, AttributeStore, Author, Block, BlockMetadata, Break,
    DelimitedBlock, DelimitedContent, DelimitedKind, ImageBlock, InlineNode, Location, Options,
    Paragraph, Revision, Section,
    diagnostics::Diagnostics,
    error::Error,
    preprocessor::{apply_entry, parse_attribute_line},
    reader::{Reader, Terminator},
    subst,
};

mod attrlist;
mod list;
mod table;

/// Everything the entry point needs to assemble a `Document`.
#[derive(Debug)]
pub(crate) struct ParsedDocument {
    pub(crate) title: Option<Vec<InlineNode>>,
    pub(crate) author: Option<Author>,
    pub(crate) revision: Option<Revision>,
    pub(crate) attributes: AttributeStore,
    pub(crate) blocks: Vec<Block>,
    pub(crate) diagnostics: Diagnostics,
}

/// Metadata lines waiting for the block they attach to.
#[derive(Debug, Default)]
struct Pending {
    metadata: BlockMetadata,
    title: Option<String>,
}

/// What a fence line opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceKind {
    Delimited(DelimitedKind),
    /// Markdown-style code fence; closes length-insensitively.
    Fenced,
    Table,
    Comment,
}

#[derive(Debug)]
struct Fence {
    kind: FenceKind,
    terminator: Terminator,
}

/// A classified section title, not yet consumed from the reader.
#[derive(Debug)]
struct SectionTitle {
    level: u8,
    text: String,
    id: Option<String>,
    lines: usize,
    line_number: usize,
}

pub(crate) struct BlockParser<'a> {
    options: &'a Options,
    attributes: AttributeStore,
    diagnostics: Diagnostics,
    /// Combined delimited-block and list nesting depth.
    depth: usize,
}

impl<'a> BlockParser<'a> {
    pub(crate) fn new(options: &'a Options, diagnostics: Diagnostics) -> Self {
        Self {
            options,
            attributes: options.attributes.clone(),
            diagnostics,
            depth: 0,
        }
    }

    pub(crate) fn parse_document(mut self, reader: &mut Reader) -> Result<ParsedDocument, Error> {
        let mut title = None;
        let mut author = None;
        let mut revision = None;

        if self.options.header_footer {
            (title, author, revision) = self.parse_header(reader)?;
        }

        // With a document title present, body sections clamp against level 0.
        let body_parent = title.as_ref().map(|_| 0);
        let mut blocks = Vec::new();
        self.parse_blocks(reader, body_parent, true, &mut blocks)?;
        debug_assert!(!reader.has_more(), "top-level parse consumes all input");

        Ok(ParsedDocument {
            title,
            author,
            revision,
            attributes: self.attributes,
            blocks,
            diagnostics: self.diagnostics,
        })
    }

    #[allow(clippy::type_complexity)]
    fn parse_header(
        &mut self,
        reader: &mut Reader,
    ) -> Result<(Option<Vec<InlineNode>>, Option<Author>, Option<Revision>), Error> {
        // Leading comments and attribute entries may precede the title.
        loop {
            reader.skip_blank_lines();
            let Some(line) = reader.peek_line() else {
                return Ok((None, None, None));
            };
            let text = line.text.clone();
            let number = line.number;
            if is_comment_line(&text) {
                self.skip_comment(reader);
            } else if let Some(entry) = parse_attribute_line(&text) {
                reader.consume_line();
                apply_entry(
                    entry,
                    &mut self.attributes,
                    self.options.safe_mode,
                    &mut self.diagnostics,
                    number,
                );
            } else {
                break;
            }
        }

        let Some(section_title) = self.classify_section_title(reader) else {
            return Ok((None, None, None));
        };
        if section_title.level != 0 {
            // Not a document title; leave it for the body.
            return Ok((None, None, None));
        }
        for _ in 0..section_title.lines {
            reader.consume_line();
        }
        self.attributes.set("doctitle", section_title.text.clone());
        let title_nodes = self.substitute(
            &section_title.text,
            subst::NORMAL,
            section_title.line_number,
        );

        let author = self.parse_author_line(reader);
        let revision = if author.is_some() {
            self.parse_revision_line(reader)
        } else {
            None
        };

        // Remaining header attribute entries, up to the first blank line.
        while let Some(line) = reader.peek_line() {
            let text = line.text.clone();
            let number = line.number;
            if text.trim().is_empty() {
                break;
            }
            if is_comment_line(&text) {
                self.skip_comment(reader);
                continue;
            }
            let Some(entry) = parse_attribute_line(&text) else {
                break;
            };
            reader.consume_line();
            apply_entry(
                entry,
                &mut self.attributes,
                self.options.safe_mode,
                &mut self.diagnostics,
                number,
            );
        }

        Ok((Some(title_nodes), author, revision))
    }

    fn parse_author_line(&mut self, reader: &mut Reader) -> Option<Author> {
        let line = reader.peek_line()?;
        let text = line.text.trim().to_string();
        if text.is_empty()
            || text.starts_with('=')
            || text.starts_with('[')
            || is_comment_line(&text)
            || parse_attribute_line(&text).is_some()
        {
            return None;
        }
        reader.consume_line();

        let (name_part, email) = match (text.find('<'), text.rfind('>')) {
            (Some(open), Some(close)) if close > open => (
                text[..open].trim().to_string(),
                Some(text[open + 1..close].to_string()),
            ),
            _ => (text, None),
        };
        let mut words = name_part.split_whitespace();
        let firstname = words.next().map(str::to_string);
        let lastname = words.next_back().map(str::to_string);

        self.attributes.set("author", name_part.clone());
        if let Some(first) = &firstname {
            self.attributes.set("firstname", first.clone());
        }
        if let Some(last) = &lastname {
            self.attributes.set("lastname", last.clone());
        }
        if let Some(email) = &email {
            self.attributes.set("email", email.clone());
        }

        Some(Author {
            name: name_part,
            firstname,
            lastname,
            email,
        })
    }

    fn parse_revision_line(&mut self, reader: &mut Reader) -> Option<Revision> {
        let line = reader.peek_line()?;
        let text = line.text.trim().to_string();
        let candidate = text.strip_prefix('v').unwrap_or(&text);
        if !candidate.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        reader.consume_line();

        let (number, rest) = match candidate.split_once(',') {
            Some((number, rest)) => (number.trim().to_string(), rest.trim()),
            None => (candidate.trim().to_string(), ""),
        };
        let (date, remark) = match rest.split_once(':') {
            Some((date, remark)) => (
                non_empty(date.trim()),
                non_empty(remark.trim()),
            ),
            None => (non_empty(rest), None),
        };

        self.attributes.set("revnumber", number.clone());
        if let Some(date) = &date {
            self.attributes.set("revdate", date.clone());
        }
        if let Some(remark) = &remark {
            self.attributes.set("revremark", remark.clone());
        }

        Some(Revision {
            number,
            date,
            remark,
        })
    }

    /// Parse blocks until the innermost terminator, a shallower section title, or end
    /// of input. At top level a shallower title cannot return to an outer scope, so
    /// it is clamped into sequence with a diagnostic instead.
    fn parse_blocks(
        &mut self,
        reader: &mut Reader,
        parent_level: Option<u8>,
        at_top: bool,
        out: &mut Vec<Block>,
    ) -> Result<(), Error> {
        loop {
            let mut pending = Pending::default();
            reader.skip_blank_lines();
            self.collect_metadata(reader, &mut pending);

            let Some(line) = reader.peek_line() else {
                break;
            };
            if line.text.trim().is_empty() {
                // Blank after metadata lines: the metadata attaches to nothing.
                continue;
            }
            if reader.at_terminator() {
                break;
            }
            if reader.matches_any_terminator(&line.text) {
                // A fence further up the stack closes everything below it.
                break;
            }

            if let Some(mut section_title) = self.classify_section_title(reader) {
                if let Some(parent) = parent_level {
                    if section_title.level <= parent {
                        if !at_top {
                            break;
                        }
                        self.diagnostics.error(
                            Some(section_title.line_number),
                            format!(
                                "section level {} out of sequence; clamping to {}",
                                section_title.level,
                                parent + 1
                            ),
                        );
                        section_title.level = parent + 1;
                    }
                }
                let section = self.parse_section(reader, section_title, parent_level, pending)?;
                out.push(Block::Section(section));
                continue;
            }

            if let Some(block) = self.next_block(reader, pending)? {
                out.push(block);
            }
        }
        Ok(())
    }

    fn parse_section(
        &mut self,
        reader: &mut Reader,
        section_title: SectionTitle,
        parent_level: Option<u8>,
        pending: Pending,
    ) -> Result<Section, Error> {
        for _ in 0..section_title.lines {
            reader.consume_line();
        }
        let mut level = section_title.level;
        if let Some(parent) = parent_level {
            if level > parent + 1 {
                self.diagnostics.error(
                    Some(section_title.line_number),
                    format!(
                        "section level {level} skips levels under parent level {parent}; clamping to {}",
                        parent + 1
                    ),
                );
                level = parent + 1;
            }
        }

        let title = self.substitute(
            &section_title.text,
            subst::NORMAL,
            section_title.line_number,
        );
        let mut blocks = Vec::new();
        self.parse_blocks(reader, Some(level), false, &mut blocks)?;
        let end_line = reader.line_number().saturating_sub(1);

        Ok(Section {
            level,
            title,
            id: section_title.id.or(pending.metadata.id.clone()),
            metadata: pending.metadata,
            blocks,
            location: Location::new(section_title.line_number, end_line),
        })
    }

    /// Accumulate contiguous metadata lines (attribute entries apply immediately;
    /// titles, anchors and attribute lists attach to the next block).
    fn collect_metadata(&mut self, reader: &mut Reader, pending: &mut Pending) {
        while let Some(line) = reader.peek_line() {
            let text = line.text.trim_end().to_string();
            let number = line.number;
            if is_comment_line(&text) {
                self.skip_comment(reader);
                continue;
            }
            if text.starts_with(':') {
                if let Some(entry) = parse_attribute_line(&text) {
                    reader.consume_line();
                    apply_entry(
                        entry,
                        &mut self.attributes,
                        self.options.safe_mode,
                        &mut self.diagnostics,
                        number,
                    );
                    continue;
                }
            }
            if attrlist::is_anchor_line(&text) {
                if let Some(id) = attrlist::parse_anchor(&text) {
                    reader.consume_line();
                    if pending.metadata.id.is_none() {
                        pending.metadata.id = Some(id);
                    }
                    continue;
                }
            }
            if attrlist::is_attrlist_line(&text) {
                if let Some(metadata) = attrlist::parse_attrlist(&text) {
                    reader.consume_line();
                    pending.metadata.merge(metadata);
                    continue;
                }
            }
            if pending.title.is_none() && classify_fence(&text).is_none() {
                if let Some(title) = attrlist::parse_block_title(&text) {
                    reader.consume_line();
                    pending.title = Some(title.to_string());
                    continue;
                }
            }
            break;
        }
    }

    /// Classify the next block and build its node. Section titles are handled by the
    /// caller; everything else lands here, attempted in fixed priority order.
    fn next_block(&mut self, reader: &mut Reader, pending: Pending) -> Result<Option<Block>, Error> {
        let Some(line) = reader.peek_line() else {
            return Ok(None);
        };
        let text = line.text.clone();
        let trimmed = text.trim_end();
        let number = line.number;

        if is_comment_line(trimmed) {
            self.skip_comment(reader);
            return Ok(None);
        }
        if let Some(fence) = classify_fence(trimmed) {
            return self.parse_delimited(reader, fence, pending);
        }
        if trimmed.starts_with("image::") && trimmed.ends_with(']') {
            if let Some(block) = self.parse_image_block(reader, &pending, trimmed, number) {
                return Ok(Some(block));
            }
        }
        if is_thematic_break(trimmed) {
            reader.consume_line();
            return Ok(Some(Block::ThematicBreak(Break {
                metadata: pending.metadata,
                location: Location::new(number, number),
            })));
        }
        if trimmed == "<<<" {
            reader.consume_line();
            return Ok(Some(Block::PageBreak(Break {
                metadata: pending.metadata,
                location: Location::new(number, number),
            })));
        }
        if let Some(marker) = list::classify_marker(trimmed) {
            let mut active = Vec::new();
            return Ok(Some(self.parse_list(reader, marker, pending, &mut active)?));
        }
        if list::classify_description_item(trimmed).is_some() {
            return Ok(Some(self.parse_description_list(reader, pending)?));
        }
        if text.starts_with([' ', '\t']) && !trimmed.is_empty() {
            return Ok(Some(self.parse_literal_paragraph(reader, pending)));
        }
        Ok(Some(self.parse_paragraph(reader, pending)))
    }

    fn parse_image_block(
        &mut self,
        reader: &mut Reader,
        pending: &Pending,
        line: &str,
        number: usize,
    ) -> Option<Block> {
        let rest = line.strip_prefix("image::")?;
        let bracket = rest.find('[')?;
        let target = &rest[..bracket];
        if target.is_empty() || target.contains(char::is_whitespace) {
            return None;
        }
        let alt = rest[bracket + 1..].strip_suffix(']')?;
        reader.consume_line();
        let title = self.pending_title(pending.title.as_deref(), number);
        Some(Block::Image(ImageBlock {
            metadata: pending.metadata.clone(),
            title,
            target: target.to_string(),
            alt: non_empty(alt.split(',').next().unwrap_or("")),
            location: Location::new(number, number),
        }))
    }

    fn parse_delimited(
        &mut self,
        reader: &mut Reader,
        fence: Fence,
        pending: Pending,
    ) -> Result<Option<Block>, Error> {
        let open = match reader.consume_line() {
            Some(line) => line,
            None => return Ok(None),
        };
        let start_line = open.number;

        if fence.kind == FenceKind::Comment {
            // Dropped entirely; no tree node.
            let mut terminated = false;
            while let Some(line) = reader.consume_line() {
                if fence.terminator.matches(&line.text) {
                    terminated = true;
                    break;
                }
            }
            if !terminated {
                self.diagnostics.warn(
                    Some(start_line),
                    "comment block not terminated by end of input",
                );
            }
            return Ok(None);
        }

        self.enter_nested(start_line)?;
        reader.push_terminator(fence.terminator.clone());

        // Cells split on the fence glyph unless the block declares its own separator.
        let separator = pending
            .metadata
            .named("separator")
            .and_then(|s| s.chars().next())
            .or_else(|| fence.terminator.fence.chars().next())
            .unwrap_or('|');
        let result = match fence.kind {
            FenceKind::Table => self.parse_table(reader, &pending, separator, start_line)?,
            FenceKind::Delimited(kind) => self.parse_delimited_body(reader, kind, &pending, start_line)?,
            FenceKind::Fenced => {
                self.parse_delimited_body(reader, DelimitedKind::Listing, &pending, start_line)?
            }
            FenceKind::Comment => None,
        };

        // Consume the closing fence if it is actually there; otherwise the block ran
        // to end of input (or an outer fence) and is treated as closed.
        if reader.at_terminator() {
            reader.consume_line();
        } else {
            self.diagnostics.warn(
                Some(start_line),
                "delimited block not terminated; closed at end of input",
            );
        }
        reader.pop_terminator();
        self.leave_nested();
        Ok(result)
    }

    /// Bound combined block/list nesting; a pathological input fails with a resource
    /// diagnostic instead of exhausting the stack.
    fn enter_nested(&mut self, line: usize) -> Result<(), Error> {
        self.depth += 1;
        if self.depth > self.options.max_nesting {
            return Err(Error::NestingLimitExceeded(self.options.max_nesting, line));
        }
        Ok(())
    }

    fn leave_nested(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn parse_delimited_body(
        &mut self,
        reader: &mut Reader,
        kind: DelimitedKind,
        pending: &Pending,
        start_line: usize,
    ) -> Result<Option<Block>, Error> {
        let content = match kind {
            DelimitedKind::Open
            | DelimitedKind::Example
            | DelimitedKind::Sidebar
            | DelimitedKind::Quote => {
                let mut blocks = Vec::new();
                self.parse_blocks(reader, None, false, &mut blocks)?;
                DelimitedContent::Blocks(blocks)
            }
            DelimitedKind::Listing | DelimitedKind::Literal => {
                let raw = self.collect_verbatim_lines(reader);
                let subs = pending
                    .metadata
                    .named("subs")
                    .map_or_else(|| subst::VERBATIM.to_vec(), subst::parse_subs_list);
                DelimitedContent::Verbatim(self.substitute(&raw, &subs, start_line))
            }
            DelimitedKind::Passthrough => {
                DelimitedContent::Raw(self.collect_verbatim_lines(reader))
            }
        };
        let end_line = reader.line_number();
        let title = self.pending_title(pending.title.as_deref(), start_line);

        // An admonition style on a compound block turns it into an admonition.
        if let Some(variant) = pending
            .metadata
            .style
            .as_deref()
            .and_then(AdmonitionVariant::from_label)
        {
            if let DelimitedContent::Blocks(blocks) = content {
                let mut metadata = pending.metadata.clone();
                metadata.style = None;
                return Ok(Some(Block::Admonition(Admonition {
                    variant,
                    metadata,
                    title,
                    blocks,
                    location: Location::new(start_line, end_line),
                })));
            }
            // Verbatim content cannot host an admonition; fall through with the
            // style left in place.
            return Ok(Some(Block::Delimited(DelimitedBlock {
                kind,
                metadata: pending.metadata.clone(),
                title,
                content,
                location: Location::new(start_line, end_line),
            })));
        }

        Ok(Some(Block::Delimited(DelimitedBlock {
            kind,
            metadata: pending.metadata.clone(),
            title,
            content,
            location: Location::new(start_line, end_line),
        })))
    }

    /// Collect raw lines up to the innermost terminator (or an outer one, for
    /// recovery from unterminated blocks).
    fn collect_verbatim_lines(&mut self, reader: &mut Reader) -> String {
        let mut lines: Vec<String> = Vec::new();
        while let Some(line) = reader.peek_line() {
            if reader.at_terminator() {
                break;
            }
            if reader.matches_any_terminator(&line.text) {
                break;
            }
            let line = match reader.consume_line() {
                Some(line) => line,
                None => break,
            };
            lines.push(line.text);
        }
        lines.join("\n")
    }

    fn parse_literal_paragraph(&mut self, reader: &mut Reader, pending: Pending) -> Block {
        let start_line = reader.line_number();
        let mut lines: Vec<String> = Vec::new();
        while let Some(line) = reader.peek_line() {
            if line.text.trim().is_empty() || !line.text.starts_with([' ', '\t']) {
                break;
            }
            if reader.matches_any_terminator(&line.text) {
                break;
            }
            let line = match reader.consume_line() {
                Some(line) => line,
                None => break,
            };
            lines.push(line.text);
        }
        let raw = lines.join("\n");
        let end_line = start_line + lines.len().saturating_sub(1);
        let title = self.pending_title(pending.title.as_deref(), start_line);
        Block::Delimited(DelimitedBlock {
            kind: DelimitedKind::Literal,
            metadata: pending.metadata,
            title,
            content: DelimitedContent::Verbatim(self.substitute(
                &raw,
                subst::VERBATIM,
                start_line,
            )),
            location: Location::new(start_line, end_line),
        })
    }

    fn parse_paragraph(&mut self, reader: &mut Reader, pending: Pending) -> Block {
        let start_line = reader.line_number();
        let mut lines: Vec<String> = Vec::new();
        while let Some(line) = reader.peek_line() {
            let text = line.text.trim_end();
            if text.is_empty()
                || is_comment_line(text)
                || reader.matches_any_terminator(text)
                || classify_fence(text).is_some()
            {
                break;
            }
            let line = match reader.consume_line() {
                Some(line) => line,
                None => break,
            };
            lines.push(line.text.trim_end().to_string());
        }
        let end_line = start_line + lines.len().saturating_sub(1);

        // An admonition label prefix claims the whole paragraph.
        let mut raw = lines.join("\n");
        let mut admonition = pending
            .metadata
            .style
            .as_deref()
            .and_then(AdmonitionVariant::from_label);
        if admonition.is_none() {
            if let Some((variant, rest)) = split_admonition_label(&raw) {
                admonition = Some(variant);
                raw = rest;
            }
        }

        let subs = match pending.metadata.style.as_deref() {
            Some("literal") => subst::VERBATIM.to_vec(),
            Some("pass") => subst::PASS.to_vec(),
            _ => pending
                .metadata
                .named("subs")
                .map_or_else(|| subst::NORMAL.to_vec(), subst::parse_subs_list),
        };
        let content = self.substitute(&raw, &subs, start_line);
        let title = self.pending_title(pending.title.as_deref(), start_line);
        let location = Location::new(start_line, end_line);

        let mut metadata = pending.metadata;
        if admonition.is_some() {
            metadata.style = None;
        }
        let paragraph = Paragraph {
            metadata: BlockMetadata::default(),
            title: None,
            content,
            location,
        };
        match admonition {
            Some(variant) => Block::Admonition(Admonition {
                variant,
                metadata,
                title,
                blocks: vec![Block::Paragraph(paragraph)],
                location,
            }),
            None => Block::Paragraph(Paragraph {
                metadata,
                title,
                ..paragraph
            }),
        }
    }

    /// Substitute a block title when one is pending.
    fn pending_title(&mut self, title: Option<&str>, line: usize) -> Option<Vec<InlineNode>> {
        title.map(|t| self.substitute(t, subst::NORMAL, line))
    }

    fn substitute(&mut self, text: &str, subs: &[subst::Substitution], line: usize) -> Vec<InlineNode> {
        subst::apply(text, subs, &self.attributes, &mut self.diagnostics, line)
    }

    fn skip_comment(&mut self, reader: &mut Reader) {
        if let Some(line) = reader.peek_line() {
            if let Some(fence) = classify_fence(line.text.trim_end()) {
                if fence.kind == FenceKind::Comment {
                    reader.consume_line();
                    let mut terminated = false;
                    while let Some(line) = reader.consume_line() {
                        if fence.terminator.matches(&line.text) {
                            terminated = true;
                            break;
                        }
                    }
                    if !terminated {
                        self.diagnostics
                            .warn(None, "comment block not terminated by end of input");
                    }
                    return;
                }
            }
            reader.consume_line();
        }
    }

    /// Classify a section title without consuming it: a run of `=` followed by a
    /// space, or a two-line title+underline pair. Restores the reader before
    /// returning.
    fn classify_section_title(&mut self, reader: &mut Reader) -> Option<SectionTitle> {
        let line = reader.peek_line()?;
        let text = line.text.trim_end().to_string();
        let line_number = line.number;

        if let Some((level, raw_title)) = classify_atx_title(&text) {
            let (title, id) = extract_inline_anchor(&raw_title);
            return Some(SectionTitle {
                level,
                text: title,
                id,
                lines: 1,
                line_number,
            });
        }

        // Two-line form: probe the next line, then restore.
        if text.is_empty() || text.starts_with([' ', '\t']) {
            return None;
        }
        let first = reader.consume_line()?;
        let underline_level = reader
            .peek_line()
            .and_then(|next| classify_setext_underline(&text, next.text.trim_end()));
        reader.unread(first);

        underline_level.map(|level| {
            let (title, id) = extract_inline_anchor(&text);
            SectionTitle {
                level,
                text: title,
                id,
                lines: 2,
                line_number,
            }
        })
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with("//")
}

fn is_thematic_break(line: &str) -> bool {
    line.len() >= 3 && line.chars().all(|c| c == '\'')
}

/// `NOTE: text` and friends at the start of a paragraph.
fn split_admonition_label(text: &str) -> Option<(AdmonitionVariant, String)> {
    let colon = text.find(':')?;
    let label = &text[..colon];
    let variant = AdmonitionVariant::from_label(label)?;
    let rest = text[colon + 1..].strip_prefix(' ')?;
    Some((variant, rest.to_string()))
}

/// The delimited-block fence table. Fences are uniform character runs; the mapping
/// from glyph family to context is fixed.
fn classify_fence(line: &str) -> Option<Fence> {
    if line == "--" {
        return Some(Fence {
            kind: FenceKind::Delimited(DelimitedKind::Open),
            terminator: Terminator {
                fence: line.to_string(),
                exact_length: true,
            },
        });
    }

    let mut chars = line.chars();
    let first = chars.next()?;

    // Table fences: `|===` / `!===` with three or more `=`.
    if (first == '|' || first == '!') && line.len() >= 4 && chars.all(|c| c == '=') {
        return Some(Fence {
            kind: FenceKind::Table,
            terminator: Terminator {
                fence: line.to_string(),
                exact_length: true,
            },
        });
    }

    if !line.chars().all(|c| c == first) {
        return None;
    }

    // Markdown-style code fences close on any run of at least the opening length.
    if (first == '`' || first == '~') && line.len() >= 3 {
        return Some(Fence {
            kind: FenceKind::Fenced,
            terminator: Terminator {
                fence: line.to_string(),
                exact_length: false,
            },
        });
    }

    if line.len() < 4 {
        return None;
    }
    let kind = match first {
        '-' => FenceKind::Delimited(DelimitedKind::Listing),
        '.' => FenceKind::Delimited(DelimitedKind::Literal),
        '=' => FenceKind::Delimited(DelimitedKind::Example),
        '*' => FenceKind::Delimited(DelimitedKind::Sidebar),
        '_' => FenceKind::Delimited(DelimitedKind::Quote),
        '+' => FenceKind::Delimited(DelimitedKind::Passthrough),
        '/' => FenceKind::Comment,
        _ => return None,
    };
    Some(Fence {
        kind,
        terminator: Terminator {
            fence: line.to_string(),
            exact_length: true,
        },
    })
}

/// `== Title` form: a run of `=` followed by whitespace. Level is the run length
/// minus one; a matching trailing run is stripped.
fn classify_atx_title(line: &str) -> Option<(u8, String)> {
    let run = line.chars().take_while(|c| *c == '=').count();
    if run == 0 || run > 6 {
        return None;
    }
    let rest = &line[run..];
    if !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    let mut title = rest.trim().to_string();
    // Symmetric closing run, e.g. `== Title ==`.
    let trailing = title.chars().rev().take_while(|c| *c == '=').count();
    if trailing == run {
        title = title[..title.len() - trailing].trim_end().to_string();
    }
    if title.is_empty() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some(((run - 1) as u8, title))
}

/// The underline of a two-line title: a uniform run of one of `= - ~ ^ +`, at least
/// two characters, within two characters of the title's length.
fn classify_setext_underline(title: &str, underline: &str) -> Option<u8> {
    let first = underline.chars().next()?;
    let level = match first {
        '=' => 0,
        '-' => 1,
        '~' => 2,
        '^' => 3,
        '+' => 4,
        _ => return None,
    };
    if underline.len() < 2 || !underline.chars().all(|c| c == first) {
        return None;
    }
    let title_len = title.trim().chars().count() as isize;
    let underline_len = underline.chars().count() as isize;
    if (title_len - underline_len).abs() > 2 {
        return None;
    }
    Some(level)
}

/// Strip a trailing `[[id]]` from a section title.
fn extract_inline_anchor(title: &str) -> (String, Option<String>) {
    let trimmed = title.trim_end();
    if trimmed.ends_with("]]") {
        if let Some(open) = trimmed.rfind("[[") {
            let id = &trimmed[open + 2..trimmed.len() - 2];
            if !id.is_empty() && !id.contains(char::is_whitespace) {
                return (
                    trimmed[..open].trim_end().to_string(),
                    Some(id.to_string()),
                );
            }
        }
    }
    (trimmed.to_string(), None)
}
