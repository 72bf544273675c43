//! Table parsing: column specs, cell specs with span/repeat multipliers, row
//! grouping, and recursive cell content.

use crate::{
    Block, Cell, CellContent, CellStyle, ColumnSpec, ColumnWidth, HorizontalAlignment, Location,
    Row, Table, TableBlock, VerticalAlignment,
    error::Error,
    reader::Reader,
    subst,
};

use super::{BlockParser, Pending};

/// A cell as tokenized from the source, before row grouping.
#[derive(Debug, Default, Clone)]
struct RawCell {
    colspan: u32,
    rowspan: u32,
    repeat: u32,
    halign: Option<HorizontalAlignment>,
    valign: Option<VerticalAlignment>,
    style: Option<CellStyle>,
    content: String,
    line: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct CellSpec {
    colspan: u32,
    rowspan: u32,
    repeat: u32,
    halign: Option<HorizontalAlignment>,
    valign: Option<VerticalAlignment>,
    style: Option<CellStyle>,
}

peg::parser! {
    grammar spec_parser() for str {
        /// One element of a `cols` attribute:
        /// `[repeat*][halign][.valign][width][style]`.
        pub(crate) rule colspec() -> (u32, ColumnSpec)
            = repeat:(n:number() "*" { n })?
              halign:halign()?
              valign:("." v:valign() { v })?
              width:width()?
              style:style_letter()?
            {
                (
                    repeat.unwrap_or(1),
                    ColumnSpec {
                        width: width.unwrap_or_default(),
                        halign: halign.unwrap_or_default(),
                        valign: valign.unwrap_or_default(),
                        style: style.unwrap_or_default(),
                    },
                )
            }

        /// A cell spec prefix: `[colspan][.rowspan][+|*][halign][.valign][style]`.
        pub(crate) rule cellspec() -> (Option<u32>, Option<u32>, Option<char>, Option<HorizontalAlignment>, Option<VerticalAlignment>, Option<CellStyle>)
            = span:span()? halign:halign()? valign:("." v:valign() { v })? style:style_letter()? {
                let (colspan, rowspan, op) = span.unwrap_or((None, None, None));
                (colspan, rowspan, op, halign, valign, style)
            }

        rule span() -> (Option<u32>, Option<u32>, Option<char>)
            = c:number() "." r:number() op:operator() { (Some(c), Some(r), Some(op)) }
            / "." r:number() op:operator() { (None, Some(r), Some(op)) }
            / c:number() op:operator() { (Some(c), None, Some(op)) }

        rule operator() -> char
            = "+" { '+' }
            / "*" { '*' }

        rule halign() -> HorizontalAlignment
            = "<" { HorizontalAlignment::Left }
            / "^" { HorizontalAlignment::Center }
            / ">" { HorizontalAlignment::Right }

        rule valign() -> VerticalAlignment
            = "<" { VerticalAlignment::Top }
            / "^" { VerticalAlignment::Middle }
            / ">" { VerticalAlignment::Bottom }

        rule width() -> ColumnWidth
            = "~" { ColumnWidth::Auto }
            / n:number() "%" { ColumnWidth::Percentage(n) }
            / n:number() { ColumnWidth::Proportional(n) }

        rule style_letter() -> CellStyle
            = c:['a' | 'd' | 'e' | 'h' | 'l' | 'm' | 's' | 'v'] {?
                CellStyle::from_letter(c).ok_or("style")
            }

        rule number() -> u32
            = n:$(['0'..='9']+) {? n.parse().or(Err("number")) }
    }
}

/// Parse a `cols="..."` value into per-column specs, expanding `N*` repeats.
fn parse_colspecs(value: &str) -> Vec<ColumnSpec> {
    let mut columns = Vec::new();
    for element in value.split(',') {
        let element = element.trim();
        match spec_parser::colspec(element) {
            Ok((repeat, spec)) => {
                for _ in 0..repeat {
                    columns.push(spec);
                }
            }
            Err(_) => {
                tracing::warn!(?element, "unparseable column spec element; using default");
                columns.push(ColumnSpec::default());
            }
        }
    }
    columns
}

fn parse_cellspec(candidate: &str) -> Option<CellSpec> {
    let (colspan, rowspan, op, halign, valign, style) = spec_parser::cellspec(candidate).ok()?;
    let mut spec = CellSpec {
        colspan: 1,
        rowspan: 1,
        repeat: 1,
        halign,
        valign,
        style,
    };
    match op {
        Some('+') => {
            spec.colspan = colspan.unwrap_or(1).max(1);
            spec.rowspan = rowspan.unwrap_or(1).max(1);
        }
        Some('*') => {
            spec.repeat = colspan.unwrap_or(1).max(1);
        }
        _ if colspan.is_some() || rowspan.is_some() => return None,
        _ => {}
    }
    Some(spec)
}

const SPEC_CHARS: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.', '*', '+', '<', '^', '>', 'a', 'd', 'e',
    'h', 'l', 'm', 's', 'v',
];

impl BlockParser<'_> {
    pub(super) fn parse_table(
        &mut self,
        reader: &mut Reader,
        pending: &Pending,
        separator: char,
        start_line: usize,
    ) -> Result<Option<Block>, Error> {
        self.enter_nested(start_line)?;
        let mut raw_lines: Vec<(usize, String)> = Vec::new();
        while let Some(line) = reader.peek_line() {
            if reader.at_terminator() || reader.matches_any_terminator(&line.text) {
                break;
            }
            let Some(line) = reader.consume_line() else {
                break;
            };
            raw_lines.push((line.number, line.text));
        }

        let declared_columns = pending.metadata.named("cols").map(parse_colspecs);
        let cells = if pending.metadata.named("format") == Some("csv") {
            tokenize_csv(&raw_lines)
        } else {
            tokenize_psv(&raw_lines, separator)
        };

        // A blank line after the first content line marks that line's cells as the
        // header row, even without an explicit header option.
        let implicit_header = raw_lines
            .first()
            .zip(raw_lines.get(1))
            .is_some_and(|((first_number, first), (_, second))| {
                !first.trim().is_empty()
                    && second.trim().is_empty()
                    && cells.iter().any(|c| c.line == *first_number)
            });

        let columns = declared_columns.unwrap_or_else(|| infer_columns(&cells));
        let column_count = columns.len().max(1) as u32;
        let rows = self.build_rows(&cells, &columns, column_count)?;

        let mut rows = rows;
        let mut header = None;
        let mut footer = None;
        if (pending.metadata.has_option("header") || implicit_header) && !rows.is_empty() {
            header = Some(rows.remove(0));
        }
        if pending.metadata.has_option("footer") {
            footer = rows.pop();
        }

        let end_line = reader.line_number();
        let title = self.pending_title(pending.title.as_deref(), start_line);
        self.leave_nested();
        Ok(Some(Block::Table(TableBlock {
            metadata: pending.metadata.clone(),
            title,
            table: Table {
                columns,
                header,
                footer,
                rows,
                location: Location::new(start_line, end_line),
            },
            location: Location::new(start_line, end_line),
        })))
    }

    /// Group tokenized cells into rows of exactly `column_count` columns, expanding
    /// repeat and span multipliers. Over-full rows are truncated with a diagnostic;
    /// a final under-full row is kept as-is with a diagnostic.
    fn build_rows(
        &mut self,
        cells: &[RawCell],
        columns: &[ColumnSpec],
        column_count: u32,
    ) -> Result<Vec<Row>, Error> {
        let mut rows: Vec<Row> = Vec::new();
        let mut current: Vec<Cell> = Vec::new();
        let mut occupied: u32 = 0;
        // Columns consumed in upcoming rows by cells spanning multiple rows:
        // (remaining row count, colspan).
        let mut rowspan_carry: Vec<(u32, u32)> = Vec::new();
        let mut carried: u32 = rowspan_reserved(&mut rowspan_carry);

        for raw in cells {
            for _ in 0..raw.repeat {
                let column_index = (carried + occupied) as usize;
                let style = raw
                    .style
                    .or_else(|| columns.get(column_index).map(|c| c.style))
                    .unwrap_or_default();
                let content = self.parse_cell_content(&raw.content, style, raw.line)?;
                current.push(Cell {
                    colspan: raw.colspan,
                    rowspan: raw.rowspan,
                    halign: raw.halign,
                    valign: raw.valign,
                    style,
                    content,
                });
                if raw.rowspan > 1 {
                    rowspan_carry.push((raw.rowspan - 1, raw.colspan));
                }
                occupied += raw.colspan;

                if carried + occupied > column_count {
                    self.diagnostics.warn(
                        Some(raw.line),
                        format!(
                            "table row exceeds the declared column count ({column_count}); splitting"
                        ),
                    );
                }
                if carried + occupied >= column_count {
                    rows.push(Row {
                        cells: std::mem::take(&mut current),
                    });
                    occupied = 0;
                    carried = rowspan_reserved(&mut rowspan_carry);
                }
            }
        }
        if !current.is_empty() {
            self.diagnostics.warn(
                None,
                format!("table row ends short of the declared column count ({column_count})"),
            );
            rows.push(Row { cells: current });
        }
        Ok(rows)
    }

    fn parse_cell_content(
        &mut self,
        content: &str,
        style: CellStyle,
        line: usize,
    ) -> Result<CellContent, Error> {
        let content = content.trim();
        Ok(match style {
            CellStyle::Nested => {
                let lines: Vec<String> = content.lines().map(str::to_string).collect();
                let mut nested_reader = Reader::new(lines);
                let mut blocks = Vec::new();
                self.parse_blocks(&mut nested_reader, None, false, &mut blocks)?;
                CellContent::Blocks(blocks)
            }
            CellStyle::Literal => {
                CellContent::Verbatim(self.substitute(content, subst::VERBATIM, line))
            }
            CellStyle::Default
            | CellStyle::Emphasis
            | CellStyle::Strong
            | CellStyle::Monospace
            | CellStyle::Header
            | CellStyle::Verse => {
                CellContent::Inline(self.substitute(content, subst::NORMAL, line))
            }
        })
    }
}

fn rowspan_reserved(carry: &mut Vec<(u32, u32)>) -> u32 {
    let reserved = carry.iter().map(|(_, colspan)| *colspan).sum();
    carry.retain_mut(|(remaining, _)| {
        *remaining -= 1;
        *remaining > 0
    });
    reserved
}

/// Infer the column count from the cells found on the first source line.
fn infer_columns(cells: &[RawCell]) -> Vec<ColumnSpec> {
    let Some(first_line) = cells.first().map(|c| c.line) else {
        return Vec::new();
    };
    let count: u32 = cells
        .iter()
        .filter(|c| c.line == first_line)
        .map(|c| c.colspan * c.repeat)
        .sum();
    vec![ColumnSpec::default(); count.max(1) as usize]
}

/// Tokenize pipe-separated cells. A cell spec may directly precede its separator;
/// it is recognized only when preceded by a boundary (line start, whitespace, or the
/// previous separator).
fn tokenize_psv(lines: &[(usize, String)], separator: char) -> Vec<RawCell> {
    let mut cells: Vec<RawCell> = Vec::new();
    let mut open: Option<RawCell> = None;

    for (number, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let positions = separator_positions(line, separator);
        if positions.is_empty() {
            if let Some(cell) = open.as_mut() {
                cell.content.push('\n');
                cell.content.push_str(&unescape_separator(line, separator));
            }
            continue;
        }

        let mut consumed = 0;
        for &position in &positions {
            let (spec, spec_start) = spec_before(line, position, consumed);
            let before = &line[consumed..spec_start];
            if let Some(cell) = open.as_mut() {
                if !before.is_empty() {
                    if !cell.content.is_empty() {
                        cell.content.push('\n');
                    }
                    cell.content.push_str(&unescape_separator(before, separator));
                }
            }
            if let Some(cell) = open.take() {
                cells.push(cell);
            }
            let spec = spec.unwrap_or_default();
            open = Some(RawCell {
                colspan: spec.colspan.max(1),
                rowspan: spec.rowspan.max(1),
                repeat: spec.repeat.max(1),
                halign: spec.halign,
                valign: spec.valign,
                style: spec.style,
                content: String::new(),
                line: *number,
            });
            consumed = position + separator.len_utf8();
        }
        if let Some(cell) = open.as_mut() {
            cell.content
                .push_str(&unescape_separator(&line[consumed..], separator));
        }
    }
    if let Some(cell) = open.take() {
        cells.push(cell);
    }
    cells
}

/// Separator positions not escaped by a backslash.
fn separator_positions(line: &str, separator: char) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut previous: Option<char> = None;
    for (index, c) in line.char_indices() {
        if c == separator && previous != Some('\\') {
            positions.push(index);
        }
        previous = Some(c);
    }
    positions
}

fn unescape_separator(text: &str, separator: char) -> String {
    let escaped: String = format!("\\{separator}");
    text.replace(&escaped, &separator.to_string())
}

/// Find a cell spec ending at `position`. Returns the parsed spec and its start.
fn spec_before(line: &str, position: usize, lower_bound: usize) -> (Option<CellSpec>, usize) {
    // Walk backwards over spec characters.
    let mut start = position;
    while start > lower_bound {
        let Some(c) = line[lower_bound..start].chars().next_back() else {
            break;
        };
        if SPEC_CHARS.contains(&c) {
            start -= c.len_utf8();
        } else {
            break;
        }
    }
    if start == position {
        return (None, position);
    }
    // The spec must sit at a boundary: line start, right after the previous
    // separator, or after whitespace.
    let at_boundary = start == lower_bound
        || line[..start]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace);
    if !at_boundary {
        return (None, position);
    }
    match parse_cellspec(&line[start..position]) {
        Some(spec) => (Some(spec), start),
        None => (None, position),
    }
}

/// `format=csv`: each line is one row, cells split on commas.
fn tokenize_csv(lines: &[(usize, String)]) -> Vec<RawCell> {
    let mut cells = Vec::new();
    for (number, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        for field in line.split(',') {
            cells.push(RawCell {
                colspan: 1,
                rowspan: 1,
                repeat: 1,
                halign: None,
                valign: None,
                style: None,
                content: field.trim().to_string(),
                line: *number,
            });
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colspecs_with_repeat() {
        let columns = parse_colspecs("3*");
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0], ColumnSpec::default());
    }

    #[test]
    fn test_colspecs_alignment_width_style() {
        let columns = parse_colspecs("<2, ^3m, >~a");
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].halign, HorizontalAlignment::Left);
        assert_eq!(columns[0].width, ColumnWidth::Proportional(2));
        assert_eq!(columns[1].halign, HorizontalAlignment::Center);
        assert_eq!(columns[1].style, CellStyle::Monospace);
        assert_eq!(columns[2].width, ColumnWidth::Auto);
        assert_eq!(columns[2].style, CellStyle::Nested);
    }

    #[test]
    fn test_colspec_percentage() {
        let columns = parse_colspecs("25%,75%");
        assert_eq!(columns[0].width, ColumnWidth::Percentage(25));
        assert_eq!(columns[1].width, ColumnWidth::Percentage(75));
    }

    #[test]
    fn test_cellspec_spans() {
        let spec = parse_cellspec("2+").unwrap();
        assert_eq!((spec.colspan, spec.rowspan, spec.repeat), (2, 1, 1));
        let spec = parse_cellspec(".3+").unwrap();
        assert_eq!((spec.colspan, spec.rowspan), (1, 3));
        let spec = parse_cellspec("2.3+").unwrap();
        assert_eq!((spec.colspan, spec.rowspan), (2, 3));
        let spec = parse_cellspec("3*").unwrap();
        assert_eq!(spec.repeat, 3);
    }

    #[test]
    fn test_cellspec_alignment_and_style() {
        let spec = parse_cellspec("^.^s").unwrap();
        assert_eq!(spec.halign, Some(HorizontalAlignment::Center));
        assert_eq!(spec.valign, Some(VerticalAlignment::Middle));
        assert_eq!(spec.style, Some(CellStyle::Strong));
    }

    #[test]
    fn test_tokenize_simple_row() {
        let lines = vec![(1, "|a |b |c".to_string())];
        let cells = tokenize_psv(&lines, '|');
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].content.trim(), "a");
        assert_eq!(cells[2].content.trim(), "c");
    }

    #[test]
    fn test_tokenize_spec_prefix() {
        let lines = vec![(1, "2+|spanned |plain".to_string())];
        let cells = tokenize_psv(&lines, '|');
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].colspan, 2);
        assert_eq!(cells[1].colspan, 1);
    }

    #[test]
    fn test_tokenize_escaped_separator() {
        let lines = vec![(1, r"|a \| b |c".to_string())];
        let cells = tokenize_psv(&lines, '|');
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].content.trim(), "a | b");
    }

    #[test]
    fn test_tokenize_multiline_cell() {
        let lines = vec![(1, "|first".to_string()), (2, "continued".to_string())];
        let cells = tokenize_psv(&lines, '|');
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].content, "first\ncontinued");
    }

    #[test]
    fn test_prose_before_separator_is_not_a_spec() {
        let lines = vec![(1, "|it was|fine".to_string())];
        let cells = tokenize_psv(&lines, '|');
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].content.trim(), "it was");
    }
}
