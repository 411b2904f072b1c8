use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use std::collections::VecDeque;
use std::io::{self, Write};

pub const SCROLLBACK_LINES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    /// The area inside a one-cell border.
    pub fn inner(&self) -> Rect {
        Rect {
            x: self.x.saturating_add(1),
            y: self.y.saturating_add(1),
            width: self.width.saturating_sub(2),
            height: self.height.saturating_sub(2),
        }
    }
}

/// `count` equal-width columns side by side, leaving the bottom row free for the legend.
pub fn split_columns(cols: u16, rows: u16, count: u16) -> Vec<Rect> {
    let width = cols / count.max(1);
    (0..count)
        .map(|i| Rect {
            x: i * width,
            y: 0,
            width,
            height: rows.saturating_sub(1),
        })
        .collect()
}

/// A bordered, labelled region showing the tail of a line log. Appends are buffered; nothing
/// reaches the terminal until [Pane::redraw].
pub struct Pane {
    label: String,
    color: Color,
    rect: Rect,
    lines: VecDeque<String>,
    frame_drawn: bool,
    dirty: bool,
}

impl Pane {
    pub fn new(label: impl Into<String>, color: Color, rect: Rect) -> Self {
        Self {
            label: label.into(),
            color,
            rect,
            lines: VecDeque::new(),
            frame_drawn: false,
            dirty: false,
        }
    }

    pub fn append(&mut self, line: &str) -> &mut Self {
        if self.lines.len() == SCROLLBACK_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line.trim().to_string());
        self.dirty = true;
        self
    }

    /// Every retained line as it reads on screen, oldest first.
    pub fn rendered_lines(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|line| format!("[{}] {line}", self.label))
            .collect()
    }

    pub fn redraw<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if !self.frame_drawn {
            self.draw_frame(out)?;
            self.frame_drawn = true;
            self.dirty = true;
        }
        if !self.dirty {
            return Ok(());
        }

        let inner = self.rect.inner();
        let width = usize::from(inner.width);
        let first = self.lines.len().saturating_sub(usize::from(inner.height));
        for row in 0..inner.height {
            queue!(out, MoveTo(inner.x, inner.y + row))?;
            match self.lines.get(first + usize::from(row)) {
                Some(line) => self.draw_line(out, line, width)?,
                None => queue!(out, Print(" ".repeat(width)))?,
            }
        }
        self.dirty = false;
        Ok(())
    }

    fn draw_line<W: Write>(&self, out: &mut W, line: &str, width: usize) -> io::Result<()> {
        let label = fit(&self.label, width.saturating_sub(3));
        let used = label.chars().count() + 3;
        let text = fit(line, width.saturating_sub(used));
        let padding = width.saturating_sub(used + text.chars().count());
        queue!(
            out,
            Print("["),
            SetForegroundColor(self.color),
            Print(label),
            ResetColor,
            Print("] "),
            Print(text),
            Print(" ".repeat(padding))
        )
    }

    fn draw_frame<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let Rect {
            x,
            y,
            width,
            height,
        } = self.rect;
        if width < 2 || height < 2 {
            return Ok(());
        }
        let horizontal = "─".repeat(usize::from(width - 2));
        queue!(out, MoveTo(x, y), Print(format!("┌{horizontal}┐")))?;
        for row in 1..height - 1 {
            queue!(
                out,
                MoveTo(x, y + row),
                Print("│"),
                MoveTo(x + width - 1, y + row),
                Print("│")
            )?;
        }
        queue!(
            out,
            MoveTo(x, y + height - 1),
            Print(format!("└{horizontal}┘"))
        )?;

        let title = fit(&self.label, usize::from(width).saturating_sub(6));
        if !title.is_empty() {
            queue!(
                out,
                MoveTo(x + 2, y),
                Print(" "),
                SetForegroundColor(self.color),
                Print(title),
                ResetColor,
                Print(" ")
            )?;
        }
        Ok(())
    }
}

fn fit(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

#[cfg(test)]
mod test {
    use super::{split_columns, Pane, Rect, SCROLLBACK_LINES};
    use crossterm::style::Color;

    fn pane() -> Pane {
        Pane::new(
            "API",
            Color::Green,
            Rect {
                x: 0,
                y: 0,
                width: 30,
                height: 5,
            },
        )
    }

    #[test]
    fn buffers_appended_lines() {
        let mut pane = pane();
        pane.append("  Build finished!\n");
        assert_eq!(pane.rendered_lines(), vec!["[API] Build finished!"]);
    }

    #[test]
    fn redraw_writes_frame_and_lines() {
        let mut output: Vec<u8> = Vec::new();
        let mut pane = pane();
        pane.append("hello");
        pane.redraw(&mut output).unwrap();
        let written = String::from_utf8(output).unwrap();
        assert!(written.contains('┌'));
        assert!(written.contains("API"));
        assert!(written.contains("] hello"));
    }

    #[test]
    fn only_redraws_when_something_changed() {
        let mut output: Vec<u8> = Vec::new();
        let mut pane = pane();
        pane.append("once").redraw(&mut output).unwrap();
        let after_first = output.len();
        pane.redraw(&mut output).unwrap();
        assert_eq!(output.len(), after_first);
        pane.append("twice").redraw(&mut output).unwrap();
        assert!(output.len() > after_first);
    }

    #[test]
    fn long_lines_are_cut_to_the_pane() {
        let mut output: Vec<u8> = Vec::new();
        let mut pane = pane();
        pane.append(&"x".repeat(100)).redraw(&mut output).unwrap();
        let written = String::from_utf8(output).unwrap();
        // 28 inner columns minus the "[API] " prefix.
        assert!(written.contains(&"x".repeat(22)));
        assert!(!written.contains(&"x".repeat(23)));
    }

    #[test]
    fn scrollback_is_capped() {
        let mut pane = pane();
        for i in 0..SCROLLBACK_LINES + 5 {
            pane.append(&format!("line {i}"));
        }
        let lines = pane.rendered_lines();
        assert_eq!(lines.len(), SCROLLBACK_LINES);
        assert_eq!(lines[0], "[API] line 5");
    }

    #[test]
    fn columns_split_evenly_above_the_legend() {
        assert_eq!(
            split_columns(81, 24, 2),
            vec![
                Rect {
                    x: 0,
                    y: 0,
                    width: 40,
                    height: 23
                },
                Rect {
                    x: 40,
                    y: 0,
                    width: 40,
                    height: 23
                },
            ]
        );
    }
}
