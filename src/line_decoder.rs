use crate::vte_actions::{EraseMode, VteAction, VteActionParser};

const TAB_WIDTH: usize = 8;

/// Turns the raw bytes a process writes to its terminal into finished plain-text lines.
///
/// Only the current line is tracked: text is written at a cursor column, so carriage-return
/// redraws (progress bars, spinners) collapse to whatever was on the line when the line feed
/// arrived. Lines that are blank once trailing whitespace is removed are dropped.
///
/// The line is `width` columns wide, like the terminal the process writes to: cursor moves stop
/// at the last column and text written past it wraps onto a new line.
pub struct LineDecoder {
    parser: VteActionParser,
    width: usize,
    cells: Vec<char>,
    /// Equal to `width` only right after the last column was written (pending wrap).
    cursor: usize,
}

impl LineDecoder {
    pub fn new(width: usize) -> Self {
        Self {
            parser: VteActionParser::new(),
            width: width.max(1),
            cells: Vec::new(),
            cursor: 0,
        }
    }

    /// Feed the next chunk of output, returning every line completed by it.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for action in self.parser.parse_bytes(bytes) {
            if let Some(line) = self.apply(action) {
                lines.push(line);
            }
        }
        lines
    }

    /// Flush a trailing line that never got its line feed.
    pub fn finish(&mut self) -> Option<String> {
        self.take_line()
    }

    fn apply(&mut self, action: VteAction) -> Option<String> {
        match action {
            VteAction::Text(c) => return self.write(c),
            VteAction::Tab => self.move_to((self.cursor / TAB_WIDTH + 1) * TAB_WIDTH),
            VteAction::LineFeed => return self.take_line(),
            VteAction::CarriageReturn => self.cursor = 0,
            VteAction::Backspace => self.cursor = self.cursor.saturating_sub(1),
            VteAction::CursorForward(n) => self.move_to(self.cursor + usize::from(n)),
            VteAction::CursorBackward(n) => {
                self.cursor = self.cursor.saturating_sub(usize::from(n))
            }
            VteAction::CursorColumn(column) => {
                self.move_to(usize::from(column).saturating_sub(1))
            }
            VteAction::EraseLine(mode) => self.erase(mode),
        }
        None
    }

    fn move_to(&mut self, column: usize) {
        self.cursor = column.min(self.width - 1);
    }

    fn write(&mut self, c: char) -> Option<String> {
        let wrapped = if self.cursor >= self.width {
            self.take_line()
        } else {
            None
        };
        if self.cursor < self.cells.len() {
            self.cells[self.cursor] = c;
        } else {
            self.cells.resize(self.cursor, ' ');
            self.cells.push(c);
        }
        self.cursor += 1;
        wrapped
    }

    fn erase(&mut self, mode: EraseMode) {
        match mode {
            EraseMode::ToEnd => self.cells.truncate(self.cursor),
            EraseMode::ToStart => {
                let end = (self.cursor + 1).min(self.cells.len());
                self.cells[..end].fill(' ');
            }
            EraseMode::All => self.cells.clear(),
        }
    }

    fn take_line(&mut self) -> Option<String> {
        let line: String = self.cells.drain(..).collect();
        self.cursor = 0;
        let line = line.trim_end();
        if line.is_empty() {
            None
        } else {
            Some(line.to_string())
        }
    }
}
