//! The line reader: a mutable cursor over the preprocessed document lines.
//!
//! Include and conditional expansion happen before a `Reader` is built, so the block
//! grammar that consumes it never blocks on I/O. The reader also owns the stack of
//! active delimited-block terminators used to detect matching closing fences.

/// One preprocessed line plus its 1-indexed position in the expanded document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Line {
    pub(crate) text: String,
    pub(crate) number: usize,
}

/// Termination condition for a nested grammar call: the closing fence to look for.
///
/// The fence text must match the opening fence exactly, including length, for the
/// default block families; markdown-style code fences close length-insensitively.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Terminator {
    pub(crate) fence: String,
    pub(crate) exact_length: bool,
}

impl Terminator {
    pub(crate) fn matches(&self, line: &str) -> bool {
        let line = line.trim_end();
        if self.exact_length {
            line == self.fence
        } else {
            let Some(first) = self.fence.chars().next() else {
                return false;
            };
            line.len() >= self.fence.len() && line.chars().all(|c| c == first)
        }
    }
}

#[derive(Debug)]
pub(crate) struct Reader {
    lines: Vec<Line>,
    cursor: usize,
    pushback: Vec<Line>,
    terminators: Vec<Terminator>,
}

impl Reader {
    pub(crate) fn new(lines: Vec<String>) -> Self {
        let lines = lines
            .into_iter()
            .enumerate()
            .map(|(index, text)| Line {
                text,
                number: index + 1,
            })
            .collect();
        Self {
            lines,
            cursor: 0,
            pushback: Vec::new(),
            terminators: Vec::new(),
        }
    }

    pub(crate) fn has_more(&self) -> bool {
        !self.pushback.is_empty() || self.cursor < self.lines.len()
    }

    pub(crate) fn peek_line(&self) -> Option<&Line> {
        self.pushback.last().or_else(|| self.lines.get(self.cursor))
    }

    pub(crate) fn consume_line(&mut self) -> Option<Line> {
        if let Some(line) = self.pushback.pop() {
            return Some(line);
        }
        let line = self.lines.get(self.cursor).cloned();
        if line.is_some() {
            self.cursor += 1;
        }
        line
    }

    /// Put a line back; it will be the next one peeked or consumed.
    pub(crate) fn unread(&mut self, line: Line) {
        self.pushback.push(line);
    }

    /// The number of the next line, or one past the last for an exhausted reader.
    pub(crate) fn line_number(&self) -> usize {
        self.peek_line()
            .map_or(self.lines.len() + 1, |line| line.number)
    }

    pub(crate) fn skip_blank_lines(&mut self) {
        while let Some(line) = self.peek_line() {
            if line.text.trim().is_empty() {
                self.consume_line();
            } else {
                break;
            }
        }
    }

    /// Push the termination condition for a nested delimited block.
    pub(crate) fn push_terminator(&mut self, terminator: Terminator) {
        self.terminators.push(terminator);
    }

    pub(crate) fn pop_terminator(&mut self) -> Option<Terminator> {
        self.terminators.pop()
    }

    /// Whether the next line closes the innermost open delimited block.
    pub(crate) fn at_terminator(&self) -> bool {
        match (self.peek_line(), self.terminators.last()) {
            (Some(line), Some(terminator)) => terminator.matches(&line.text),
            _ => false,
        }
    }

    /// Whether `line` closes any currently-open delimited block, used to recover from
    /// unterminated inner blocks.
    pub(crate) fn matches_any_terminator(&self, line: &str) -> bool {
        self.terminators.iter().any(|t| t.matches(line))
    }
}
