//! Parser for the scriba lightweight markup language.
//!
//! Scriba documents are line-oriented structured text: section titles, delimited
//! blocks, lists, tables, attribute directives and rich inline markup. This crate
//! turns them into a typed document tree that downstream renderers consume.
//!
//! The pipeline is: raw lines go through the [preprocessor] (include expansion and
//! conditional filtering, both gated by [`SafeMode`]), the block grammar classifies
//! lines and builds the tree, and the substitution engine applies its ordered
//! text-transform passes to every inline span. Malformed input degrades: structural
//! defects and unresolvable directives are collected as [`Diagnostic`]s on the
//! returned [`Document`] instead of aborting the parse.
//!
//! ```
//! use scriba_parser::{Options, SafeMode, parse};
//!
//! let options = Options::builder().with_safe_mode(SafeMode::Safe).build();
//! let document = parse("= Title\n\nSome *bold* text.", &options)?;
//! assert!(document.title.is_some());
//! # Ok::<(), scriba_parser::Error>(())
//! ```

use std::path::Path;

mod constants;
mod diagnostics;
mod error;
mod grammar;
mod model;
mod options;
mod preprocessor;
mod reader;
mod safe_mode;
mod subst;

use diagnostics::Diagnostics;
use grammar::BlockParser;
use preprocessor::Preprocessor;
use reader::Reader;

pub use diagnostics::{Diagnostic, Severity};
pub use error::Error;
pub use model::{
    Admonition, AdmonitionVariant, AttributeName, AttributeStore, AttributeValue, Author, Block,
    BlockMetadata, Break, Callout, Cell, CellContent, CellStyle, ColumnSpec, ColumnWidth,
    CrossReference, DelimitedBlock, DelimitedContent, DelimitedKind, DescriptionList,
    DescriptionListItem, Document, Footnote, HorizontalAlignment, ImageBlock, IndexTerm,
    InlineImage, InlineNode, Link, List, ListItem, ListKind, Location, OrderedStyle, Paragraph,
    Revision, Row, Section, Span, SpanForm, SpanStyle, Table, TableBlock, VerticalAlignment,
};
pub use options::{DEFAULT_MAX_NESTING, Options, OptionsBuilder};
pub use safe_mode::SafeMode;
pub use subst::{BASIC, HEADER, NORMAL, PASS, Substitution, VERBATIM};

/// Parse a document from source text.
///
/// # Errors
///
/// Fails only on embedder mistakes (a `base_dir` that does not exist) or resource
/// exhaustion (the nesting limit). Document defects are reported through
/// [`Document::diagnostics`].
#[tracing::instrument(skip(input))]
pub fn parse(input: &str, options: &Options) -> Result<Document, Error> {
    validate_options(options)?;
    let mut diagnostics = Diagnostics::default();
    let lines = Preprocessor.process(input, None, options, &mut diagnostics)?;
    parse_lines(lines, options, diagnostics)
}

/// Parse a document from any byte stream. The stream must be UTF-8.
///
/// # Errors
///
/// Fails if reading the stream fails, plus the conditions of [`parse`].
#[tracing::instrument(skip(reader))]
pub fn parse_reader<R: std::io::Read>(mut reader: R, options: &Options) -> Result<Document, Error> {
    let mut input = String::new();
    reader.read_to_string(&mut input).map_err(|e| {
        tracing::error!(error = ?e, "failed to read from reader");
        e
    })?;
    parse(&input, options)
}

/// Parse a document from a file. Relative include targets resolve against the file's
/// directory unless `base_dir` overrides it.
///
/// # Errors
///
/// Fails if the file cannot be read or decoded, plus the conditions of [`parse`].
#[tracing::instrument(skip(file_path))]
pub fn parse_file<P: AsRef<Path>>(file_path: P, options: &Options) -> Result<Document, Error> {
    validate_options(options)?;
    let mut diagnostics = Diagnostics::default();
    let lines = Preprocessor.process_file(file_path.as_ref(), options, &mut diagnostics)?;
    parse_lines(lines, options, diagnostics)
}

fn validate_options(options: &Options) -> Result<(), Error> {
    if let Some(base_dir) = &options.base_dir {
        if !base_dir.is_dir() {
            return Err(Error::InvalidBaseDir(base_dir.clone()));
        }
    }
    Ok(())
}

fn parse_lines(
    lines: Vec<String>,
    options: &Options,
    diagnostics: Diagnostics,
) -> Result<Document, Error> {
    let line_count = lines.len();
    let mut reader = Reader::new(lines);
    let parsed = BlockParser::new(options, diagnostics).parse_document(&mut reader)?;

    let mut blocks = parsed.blocks;
    resolve_deferred(&mut blocks);

    let backend = parsed
        .attributes
        .value("backend")
        .unwrap_or("html5")
        .to_string();

    Ok(Document {
        title: parsed.title,
        author: parsed.author,
        revision: parsed.revision,
        attributes: parsed.attributes,
        safe_mode: options.safe_mode,
        backend,
        blocks,
        diagnostics: parsed.diagnostics.into_entries(),
        location: Location::new(1, line_count.max(1)),
    })
}

/// Deferred resolution over the finished tree: footnote numbers are assigned in
/// document order, and cross-references without explicit text pick up the title of
/// the section they point at. Forward references are legal, which is why this runs
/// only once the whole tree exists.
fn resolve_deferred(blocks: &mut [Block]) {
    let mut section_titles: Vec<(String, Vec<InlineNode>)> = Vec::new();
    collect_section_titles(blocks, &mut section_titles);

    let mut footnote_numbers: Vec<(String, u32)> = Vec::new();
    let mut next_footnote = 0u32;
    for_each_inline(blocks, &mut |node| match node {
        InlineNode::Footnote(footnote) => {
            let shared = footnote
                .id
                .as_ref()
                .and_then(|id| footnote_numbers.iter().find(|(known, _)| known == id))
                .map(|(_, number)| *number);
            match shared {
                Some(number) => footnote.number = number,
                None => {
                    next_footnote += 1;
                    footnote.number = next_footnote;
                    if let Some(id) = &footnote.id {
                        footnote_numbers.push((id.clone(), next_footnote));
                    }
                }
            }
        }
        InlineNode::CrossReference(xref) => {
            if xref.text.is_none() {
                if let Some((_, title)) = section_titles.iter().find(|(id, _)| *id == xref.target)
                {
                    xref.text = Some(title.clone());
                }
            }
        }
        _ => {}
    });
}

fn collect_section_titles(blocks: &[Block], out: &mut Vec<(String, Vec<InlineNode>)>) {
    for block in blocks {
        match block {
            Block::Section(section) => {
                if let Some(id) = &section.id {
                    out.push((id.clone(), section.title.clone()));
                }
                collect_section_titles(&section.blocks, out);
            }
            Block::Admonition(admonition) => collect_section_titles(&admonition.blocks, out),
            Block::Delimited(delimited) => {
                if let DelimitedContent::Blocks(inner) = &delimited.content {
                    collect_section_titles(inner, out);
                }
            }
            _ => {}
        }
    }
}

/// Visit every inline node in the tree, depth first, including nested span and macro
/// content.
fn for_each_inline(blocks: &mut [Block], visit: &mut impl FnMut(&mut InlineNode)) {
    for block in blocks {
        match block {
            Block::Section(section) => {
                visit_inline_list(&mut section.title, visit);
                for_each_inline(&mut section.blocks, visit);
            }
            Block::Paragraph(paragraph) => {
                visit_title(&mut paragraph.title, visit);
                visit_inline_list(&mut paragraph.content, visit);
            }
            Block::Admonition(admonition) => {
                visit_title(&mut admonition.title, visit);
                for_each_inline(&mut admonition.blocks, visit);
            }
            Block::Delimited(delimited) => {
                visit_title(&mut delimited.title, visit);
                match &mut delimited.content {
                    DelimitedContent::Blocks(inner) => for_each_inline(inner, visit),
                    DelimitedContent::Verbatim(nodes) => visit_inline_list(nodes, visit),
                    DelimitedContent::Raw(_) => {}
                }
            }
            Block::List(list) => {
                visit_title(&mut list.title, visit);
                for item in &mut list.items {
                    visit_inline_list(&mut item.principal, visit);
                    for_each_inline(&mut item.blocks, visit);
                }
            }
            Block::DescriptionList(description_list) => {
                visit_title(&mut description_list.title, visit);
                for item in &mut description_list.items {
                    visit_inline_list(&mut item.term, visit);
                    visit_inline_list(&mut item.principal, visit);
                    for_each_inline(&mut item.description, visit);
                }
            }
            Block::Table(table_block) => {
                visit_title(&mut table_block.title, visit);
                let rows = table_block
                    .table
                    .header
                    .iter_mut()
                    .chain(table_block.table.footer.iter_mut())
                    .chain(table_block.table.rows.iter_mut());
                for row in rows {
                    for cell in &mut row.cells {
                        match &mut cell.content {
                            CellContent::Inline(nodes) | CellContent::Verbatim(nodes) => {
                                visit_inline_list(nodes, visit);
                            }
                            CellContent::Blocks(inner) => for_each_inline(inner, visit),
                        }
                    }
                }
            }
            Block::Image(image) => visit_title(&mut image.title, visit),
            Block::ThematicBreak(_) | Block::PageBreak(_) => {}
        }
    }
}

fn visit_title(title: &mut Option<Vec<InlineNode>>, visit: &mut impl FnMut(&mut InlineNode)) {
    if let Some(nodes) = title {
        visit_inline_list(nodes, visit);
    }
}

fn visit_inline_list(nodes: &mut Vec<InlineNode>, visit: &mut impl FnMut(&mut InlineNode)) {
    for node in nodes {
        visit(node);
        match node {
            InlineNode::Span(span) => visit_inline_list(&mut span.content, visit),
            InlineNode::Link(link) => visit_inline_list(&mut link.text, visit),
            InlineNode::Footnote(footnote) => visit_inline_list(&mut footnote.text, visit),
            InlineNode::CrossReference(xref) => {
                if let Some(text) = &mut xref.text {
                    visit_inline_list(text, visit);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_default(input: &str) -> Document {
        parse(input, &Options::default()).expect("parse failed")
    }

    #[test]
    fn test_empty_input() {
        let document = parse_default("");
        assert!(document.blocks.is_empty());
        assert!(document.title.is_none());
    }

    #[test]
    fn test_parse_reader() {
        let document =
            parse_reader("= T\n\nbody".as_bytes(), &Options::default()).expect("parse failed");
        assert!(document.title.is_some());
        assert_eq!(document.blocks.len(), 1);
    }

    #[test]
    fn test_backend_defaults_to_html5() {
        let document = parse_default("text");
        assert_eq!(document.backend, "html5");
    }

    #[test]
    fn test_invalid_base_dir_is_a_hard_error() {
        let options = Options::builder()
            .with_base_dir("/definitely/not/a/real/dir")
            .build();
        assert!(matches!(
            parse("text", &options),
            Err(Error::InvalidBaseDir(_))
        ));
    }

    #[test]
    fn test_footnote_numbering_in_document_order() {
        let document =
            parse_default("first.footnote:[one]\n\nsecond.footnote:[two] and footnote:[three]");
        let mut numbers = Vec::new();
        let mut blocks = document.blocks;
        for_each_inline(&mut blocks, &mut |node| {
            if let InlineNode::Footnote(footnote) = node {
                numbers.push(footnote.number);
            }
        });
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_xref_picks_up_section_title() {
        let document = parse_default("see <<target>>\n\n[[target]]\n== The Target\n\nbody");
        let mut found = None;
        let mut blocks = document.blocks;
        for_each_inline(&mut blocks, &mut |node| {
            if let InlineNode::CrossReference(xref) = node {
                found = xref.text.clone();
            }
        });
        assert_eq!(found, Some(vec![InlineNode::text("The Target")]));
    }

    #[test]
    fn test_nesting_limit_is_a_hard_error() {
        let options = Options::builder().with_max_nesting(2).build();
        let input = "====\n======\n____\ndeep\n____\n======\n====";
        assert!(matches!(
            parse(input, &options),
            Err(Error::NestingLimitExceeded(2, _))
        ));
    }

    #[test]
    fn test_document_serializes_to_json() {
        let document = parse_default("= T\n\npara");
        let json = serde_json::to_string(&document).expect("serialize");
        assert!(json.contains("\"para\""));
    }
}
