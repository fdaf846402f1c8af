/// Per-line cursor with column and indentation bookkeeping
///
/// Columns are visual columns: a tab advances to the next multiple of 4.
/// Indentation is always measured relative to the last `restart_indent`
/// boundary, so nested containers can re-anchor the cursor and still use
/// the same arithmetic.

/// Indentation threshold beyond which a line is preformatted content
/// rather than structural indent.
pub const CODE_INDENT: usize = 4;

/// Saved cursor state, restored after a failed recognition attempt.
#[derive(Debug, Clone, Copy)]
pub struct ScanState {
    pos: usize,
    column: usize,
    column_before_indent: usize,
}

pub struct LineScanner<'a> {
    line: &'a str,
    /// Byte offset of the current character.
    pos: usize,
    /// Visual column of the current character. May sit inside a tab after
    /// a `go_to_column` call; advancing past the tab picks up the remainder.
    column: usize,
    /// Column where the current indentation run started.
    column_before_indent: usize,
}

impl<'a> LineScanner<'a> {
    pub fn new(line: &'a str) -> Self {
        LineScanner {
            line,
            pos: 0,
            column: 0,
            column_before_indent: 0,
        }
    }

    /// The character under the cursor, or `None` at end of line.
    pub fn current_char(&self) -> Option<char> {
        self.line[self.pos..].chars().next()
    }

    /// Consume the current character and return the new current character.
    pub fn advance(&mut self) -> Option<char> {
        if let Some(ch) = self.current_char() {
            match ch {
                '\t' => {
                    // Tab advances to next multiple of 4
                    self.column = (self.column / 4 + 1) * 4;
                }
                _ => self.column += 1,
            }
            self.pos += ch.len_utf8();
        }
        self.current_char()
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn column_before_indent(&self) -> usize {
        self.column_before_indent
    }

    /// Columns of whitespace consumed since the last `restart_indent`.
    pub fn indent(&self) -> usize {
        self.column - self.column_before_indent
    }

    pub fn is_code_indent(&self) -> bool {
        self.indent() >= CODE_INDENT
    }

    /// Start a new indentation run at the current column.
    pub fn restart_indent(&mut self) {
        self.column_before_indent = self.column;
    }

    /// Start a new indentation run at a fixed column, e.g. the content
    /// column of a container that has just consumed its prefix.
    pub fn restart_indent_at(&mut self, column: usize) {
        self.column_before_indent = column;
    }

    /// Consume a run of spaces and tabs.
    pub fn parse_indent(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch == ' ' || ch == '\t' {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Reposition the cursor to an absolute column, rescanning from the
    /// start of the line. A target column inside a tab leaves the cursor
    /// on the tab with the remaining tab columns still pending.
    pub fn go_to_column(&mut self, target: usize) {
        self.pos = 0;
        self.column = 0;
        while self.column < target {
            let Some(ch) = self.current_char() else {
                break;
            };
            if ch == '\t' {
                let next_stop = (self.column / 4 + 1) * 4;
                if next_stop > target {
                    // Partial tab: stay on the tab character at the target column
                    self.column = target;
                    return;
                }
                self.column = next_stop;
            } else {
                self.column += 1;
            }
            self.pos += ch.len_utf8();
        }
    }

    /// The unconsumed remainder of the line.
    pub fn rest(&self) -> &'a str {
        &self.line[self.pos..]
    }

    /// The remainder of the line starting at the given column. A partial
    /// tab at the boundary is expanded to the spaces it still owes.
    pub fn rest_from_column(&self, column: usize) -> String {
        let mut probe = LineScanner::new(self.line);
        probe.go_to_column(column);
        if probe.column < column {
            // Line ended before the column
            return String::new();
        }
        match probe.current_char() {
            Some('\t') => {
                let next_stop = (probe.column / 4 + 1) * 4;
                let mut out = " ".repeat(next_stop - probe.column);
                out.push_str(&probe.line[probe.pos + 1..]);
                out
            }
            _ => probe.rest().to_string(),
        }
    }

    /// Whether the whole line is blank (empty or whitespace only).
    pub fn is_blank_line(&self) -> bool {
        self.line.trim().is_empty()
    }

    pub fn save(&self) -> ScanState {
        ScanState {
            pos: self.pos,
            column: self.column,
            column_before_indent: self.column_before_indent,
        }
    }

    pub fn restore(&mut self, state: ScanState) {
        self.pos = state.pos;
        self.column = state.column;
        self.column_before_indent = state.column_before_indent;
    }
}
