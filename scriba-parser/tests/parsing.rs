//! End-to-end parsing scenarios.

use pretty_assertions::assert_eq;
use scriba_parser::{
    AdmonitionVariant, Block, DelimitedContent, DelimitedKind, InlineNode, ListKind, Options,
    Severity, SpanForm, SpanStyle, parse,
};

fn parse_default(input: &str) -> scriba_parser::Document {
    parse(input, &Options::default()).expect("parse failed")
}

fn plain_text(nodes: &[InlineNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            InlineNode::Text { value } | InlineNode::Raw { value } => out.push_str(value),
            InlineNode::Span(span) => out.push_str(&plain_text(&span.content)),
            _ => {}
        }
    }
    out
}

#[test]
fn doc_title_section_and_list() {
    let input = "Doc Title\n=========\n\n== Section\n\n* one\n* two\n";
    let document = parse_default(input);

    assert_eq!(plain_text(document.title.as_deref().unwrap_or(&[])), "Doc Title");
    assert_eq!(document.blocks.len(), 1);

    let Block::Section(section) = &document.blocks[0] else {
        panic!("expected a section, got {:?}", document.blocks[0]);
    };
    assert_eq!(section.level, 1);
    assert_eq!(plain_text(&section.title), "Section");
    assert_eq!(section.blocks.len(), 1);

    let Block::List(list) = &section.blocks[0] else {
        panic!("expected a list, got {:?}", section.blocks[0]);
    };
    assert_eq!(list.kind, ListKind::Unordered);
    assert_eq!(list.items.len(), 2);
    assert_eq!(plain_text(&list.items[0].principal), "one");
    assert_eq!(plain_text(&list.items[1].principal), "two");
}

#[test]
fn admonition_paragraph_with_emphasis() {
    let document = parse_default("NOTE: This is _important_.");

    let Block::Admonition(admonition) = &document.blocks[0] else {
        panic!("expected an admonition, got {:?}", document.blocks[0]);
    };
    assert_eq!(admonition.variant, AdmonitionVariant::Note);

    let Block::Paragraph(paragraph) = &admonition.blocks[0] else {
        panic!("expected a paragraph body");
    };
    let emphasis = paragraph
        .content
        .iter()
        .find_map(|node| match node {
            InlineNode::Span(span) if span.style == SpanStyle::Emphasis => Some(span),
            _ => None,
        })
        .expect("emphasis span not found");
    assert_eq!(plain_text(&emphasis.content), "important");
}

#[test]
fn fence_family_matching_is_exact() {
    let input = "----\ncode line\n====\nstill code\n----\nafter\n";
    let document = parse_default(input);

    let Block::Delimited(listing) = &document.blocks[0] else {
        panic!("expected a listing block, got {:?}", document.blocks[0]);
    };
    assert_eq!(listing.kind, DelimitedKind::Listing);
    let DelimitedContent::Verbatim(content) = &listing.content else {
        panic!("expected verbatim content");
    };
    let text = plain_text(content);
    // The example fence does not close the listing fence.
    assert!(text.contains("===="));
    assert!(text.contains("still code"));

    let Block::Paragraph(after) = &document.blocks[1] else {
        panic!("expected the trailing paragraph");
    };
    assert_eq!(plain_text(&after.content), "after");
}

#[test]
fn fence_length_must_match_for_default_families() {
    let input = "----\ncode\n------\nstill inside\n----\n";
    let document = parse_default(input);
    let Block::Delimited(listing) = &document.blocks[0] else {
        panic!("expected a listing block");
    };
    let DelimitedContent::Verbatim(content) = &listing.content else {
        panic!("expected verbatim content");
    };
    assert!(plain_text(content).contains("still inside"));
}

#[test]
fn escaping_does_not_double_escape() {
    let document = parse_default("a &lt; b &amp; c");
    let Block::Paragraph(paragraph) = &document.blocks[0] else {
        panic!("expected a paragraph");
    };
    assert_eq!(plain_text(&paragraph.content), "a &lt; b &amp; c");
}

#[test]
fn quote_pass_order_is_strong_then_emphasis() {
    let document = parse_default("*_bold-italic_*");
    let Block::Paragraph(paragraph) = &document.blocks[0] else {
        panic!("expected a paragraph");
    };
    let InlineNode::Span(outer) = &paragraph.content[0] else {
        panic!("expected a span, got {:?}", paragraph.content[0]);
    };
    assert_eq!(outer.style, SpanStyle::Strong);
    assert_eq!(outer.form, SpanForm::Constrained);
    let InlineNode::Span(inner) = &outer.content[0] else {
        panic!("expected a nested span, got {:?}", outer.content[0]);
    };
    assert_eq!(inner.style, SpanStyle::Emphasis);
    assert_eq!(plain_text(&inner.content), "bold-italic");
}

#[test]
fn attribute_interpolation_is_deterministic() {
    let input = ":product: Scriba\n\nuse {product} here\n\n:product!:\n\nafter {product}\n";
    let document = parse_default(input);

    let Block::Paragraph(first) = &document.blocks[0] else {
        panic!("expected first paragraph");
    };
    assert_eq!(plain_text(&first.content), "use Scriba here");

    let Block::Paragraph(second) = &document.blocks[1] else {
        panic!("expected second paragraph");
    };
    // The old value must not leak through after the unset.
    assert_eq!(plain_text(&second.content), "after {product}");
    assert!(
        document
            .diagnostics
            .iter()
            .any(|d| d.message.contains("product")),
        "expected a diagnostic for the unresolved reference"
    );
}

#[test]
fn section_level_skip_is_diagnosed_but_survives() {
    let input = "= Title\n\n==== Sub\n\nbody\n";
    let document = parse_default(input);

    assert!(
        document
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error && d.message.contains("level")),
        "expected a section-level diagnostic, got {:?}",
        document.diagnostics
    );
    let Block::Section(section) = &document.blocks[0] else {
        panic!("expected a section despite the level skip");
    };
    assert_eq!(section.level, 1);
    assert_eq!(plain_text(&section.title), "Sub");
}

#[test]
fn unterminated_block_closes_at_end_of_input() {
    let document = parse_default("----\nnever closed\n");
    let Block::Delimited(listing) = &document.blocks[0] else {
        panic!("expected the listing block");
    };
    let DelimitedContent::Verbatim(content) = &listing.content else {
        panic!("expected verbatim content");
    };
    assert_eq!(plain_text(content), "never closed");
    assert!(
        document
            .diagnostics
            .iter()
            .any(|d| d.message.contains("not terminated"))
    );
}

#[test]
fn nested_delimited_blocks() {
    let input = "====\nouter\n\n****\ninner sidebar\n****\n====\n";
    let document = parse_default(input);
    let Block::Delimited(example) = &document.blocks[0] else {
        panic!("expected the example block");
    };
    assert_eq!(example.kind, DelimitedKind::Example);
    let DelimitedContent::Blocks(children) = &example.content else {
        panic!("expected nested blocks");
    };
    assert_eq!(children.len(), 2);
    let Block::Delimited(sidebar) = &children[1] else {
        panic!("expected the nested sidebar, got {:?}", children[1]);
    };
    assert_eq!(sidebar.kind, DelimitedKind::Sidebar);
}

#[test]
fn list_continuation_attaches_block_to_item() {
    let input = "* item\n+\n----\nattached listing\n----\n* next\n";
    let document = parse_default(input);
    let Block::List(list) = &document.blocks[0] else {
        panic!("expected a list");
    };
    assert_eq!(list.items.len(), 2);
    assert_eq!(list.items[0].blocks.len(), 1);
    let Block::Delimited(attached) = &list.items[0].blocks[0] else {
        panic!("expected the attached listing");
    };
    assert_eq!(attached.kind, DelimitedKind::Listing);
}

#[test]
fn nested_list_by_marker_depth() {
    let input = "* parent\n** child one\n** child two\n* sibling\n";
    let document = parse_default(input);
    let Block::List(list) = &document.blocks[0] else {
        panic!("expected a list");
    };
    assert_eq!(list.items.len(), 2);
    let Block::List(nested) = &list.items[0].blocks[0] else {
        panic!("expected a nested list");
    };
    assert_eq!(nested.items.len(), 2);
    assert_eq!(plain_text(&nested.items[0].principal), "child one");
}

#[test]
fn description_list_items() {
    let input = "term one:: first description\nterm two:: second\n";
    let document = parse_default(input);
    let Block::DescriptionList(list) = &document.blocks[0] else {
        panic!("expected a description list, got {:?}", document.blocks[0]);
    };
    assert_eq!(list.items.len(), 2);
    assert_eq!(plain_text(&list.items[0].term), "term one");
    assert_eq!(plain_text(&list.items[0].principal), "first description");
    assert_eq!(list.items[0].delimiter, "::");
}

#[test]
fn table_with_declared_columns() {
    let input = "[cols=\"1,1,1\"]\n|===\n|a |b |c\n|d |e |f\n|===\n";
    let document = parse_default(input);
    let Block::Table(table_block) = &document.blocks[0] else {
        panic!("expected a table, got {:?}", document.blocks[0]);
    };
    assert_eq!(table_block.table.columns.len(), 3);
    assert_eq!(table_block.table.rows.len(), 2);
    assert_eq!(table_block.table.rows[0].cells.len(), 3);
}

#[test]
fn table_colspan_satisfies_column_count() {
    let input = "[cols=\"1,1,1\"]\n|===\n2+|wide |narrow\n|a |b |c\n|===\n";
    let document = parse_default(input);
    let Block::Table(table_block) = &document.blocks[0] else {
        panic!("expected a table");
    };
    let first = &table_block.table.rows[0];
    assert_eq!(first.cells.len(), 2);
    assert_eq!(first.cells[0].colspan, 2);
    assert_eq!(table_block.table.rows[1].cells.len(), 3);
}

#[test]
fn table_implicit_header() {
    let input = "|===\n|h1 |h2\n\n|a |b\n|===\n";
    let document = parse_default(input);
    let Block::Table(table_block) = &document.blocks[0] else {
        panic!("expected a table");
    };
    assert!(table_block.table.header.is_some());
    assert_eq!(table_block.table.rows.len(), 1);
}

#[test]
fn passthrough_block_is_raw() {
    let input = "++++\n<raw>markup</raw>\n++++\n";
    let document = parse_default(input);
    let Block::Delimited(pass) = &document.blocks[0] else {
        panic!("expected the passthrough block");
    };
    assert_eq!(pass.kind, DelimitedKind::Passthrough);
    assert_eq!(
        pass.content,
        DelimitedContent::Raw("<raw>markup</raw>".to_string())
    );
}

#[test]
fn comment_blocks_and_lines_leave_no_node() {
    let input = "////\nhidden\n////\n// also hidden\nvisible\n";
    let document = parse_default(input);
    assert_eq!(document.blocks.len(), 1);
    let Block::Paragraph(paragraph) = &document.blocks[0] else {
        panic!("expected only the visible paragraph");
    };
    assert_eq!(plain_text(&paragraph.content), "visible");
}

#[test]
fn block_title_and_anchor_attach_to_next_block() {
    let input = "[[lst]]\n.Listing Title\n----\ncode\n----\n";
    let document = parse_default(input);
    let Block::Delimited(listing) = &document.blocks[0] else {
        panic!("expected the listing block");
    };
    assert_eq!(listing.metadata.id.as_deref(), Some("lst"));
    assert_eq!(plain_text(listing.title.as_deref().unwrap_or(&[])), "Listing Title");
}

#[test]
fn thematic_and_page_breaks() {
    let document = parse_default("before\n\n'''\n\n<<<\n\nafter\n");
    assert!(matches!(document.blocks[1], Block::ThematicBreak(_)));
    assert!(matches!(document.blocks[2], Block::PageBreak(_)));
}

#[test]
fn forced_line_break() {
    let document = parse_default("first +\nsecond\n");
    let Block::Paragraph(paragraph) = &document.blocks[0] else {
        panic!("expected a paragraph");
    };
    assert!(
        paragraph
            .content
            .iter()
            .any(|node| matches!(node, InlineNode::LineBreak)),
        "expected a line break node, got {:?}",
        paragraph.content
    );
}

#[test]
fn callouts_in_listing() {
    let input = "----\nprintln!(); <1>\nother(); <2>\n----\n";
    let document = parse_default(input);
    let Block::Delimited(listing) = &document.blocks[0] else {
        panic!("expected the listing block");
    };
    let DelimitedContent::Verbatim(content) = &listing.content else {
        panic!("expected verbatim content");
    };
    let callouts: Vec<u32> = content
        .iter()
        .filter_map(|node| match node {
            InlineNode::Callout(callout) => Some(callout.number),
            _ => None,
        })
        .collect();
    assert_eq!(callouts, vec![1, 2]);
}

#[test]
fn header_author_and_revision() {
    let input = "= Title\nJane Doe <jane@example.com>\nv2.1, 2024-06-01: current\n\nbody\n";
    let document = parse_default(input);
    let author = document.author.expect("author parsed");
    assert_eq!(author.name, "Jane Doe");
    assert_eq!(author.email.as_deref(), Some("jane@example.com"));
    let revision = document.revision.expect("revision parsed");
    assert_eq!(revision.number, "2.1");
    assert_eq!(revision.date.as_deref(), Some("2024-06-01"));
    assert_eq!(revision.remark.as_deref(), Some("current"));
    assert_eq!(document.attributes.value("author"), Some("Jane Doe"));
    assert_eq!(document.attributes.value("revnumber"), Some("2.1"));
}

#[test]
fn quoted_block_with_attribution_metadata() {
    let input = "[quote, Someone Famous]\n____\nWords to live by.\n____\n";
    let document = parse_default(input);
    let Block::Delimited(quote) = &document.blocks[0] else {
        panic!("expected the quote block");
    };
    assert_eq!(quote.kind, DelimitedKind::Quote);
    assert_eq!(quote.metadata.style.as_deref(), Some("quote"));
    assert_eq!(quote.metadata.positional, vec!["Someone Famous"]);
}

#[test]
fn admonition_style_on_example_block() {
    let input = "[WARNING]\n====\nCareful here.\n====\n";
    let document = parse_default(input);
    let Block::Admonition(admonition) = &document.blocks[0] else {
        panic!("expected an admonition, got {:?}", document.blocks[0]);
    };
    assert_eq!(admonition.variant, AdmonitionVariant::Warning);
    assert_eq!(admonition.blocks.len(), 1);
}
