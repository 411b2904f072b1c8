use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute, terminal};
use log::info;
use std::io::{self, Stdout, Write};
use std::time::Duration;

use crate::keymap::QUIT_KEY;

/// Where the dashboard gets single-character commands from. Must never block.
pub trait KeySource {
    fn poll_key(&mut self) -> io::Result<Option<char>>;
}

/// Keyboard input through crossterm's event queue.
pub struct CrosstermKeys;

impl KeySource for CrosstermKeys {
    fn poll_key(&mut self) -> io::Result<Option<char>> {
        if !event::poll(Duration::ZERO)? {
            return Ok(None);
        }
        match event::read()? {
            // Raw mode swallows SIGINT, so Ctrl-C has to quit by hand.
            Event::Key(KeyEvent {
                code: KeyCode::Char('c'),
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) if modifiers.contains(KeyModifiers::CONTROL) => Ok(Some(QUIT_KEY)),
            Event::Key(KeyEvent {
                code: KeyCode::Char(c),
                kind: KeyEventKind::Press,
                ..
            }) => Ok(Some(c)),
            _ => Ok(None),
        }
    }
}

/// The full-screen terminal, owned explicitly instead of living in process-wide state.
/// Entering switches to the alternate screen in raw mode; dropping puts everything back.
pub struct TerminalSurface {
    stdout: Stdout,
}

impl TerminalSurface {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(
            stdout,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(terminal::ClearType::All)
        )?;
        info!("terminal surface entered");
        Ok(Self { stdout })
    }

    /// Columns and rows.
    pub fn size(&self) -> io::Result<(u16, u16)> {
        terminal::size()
    }
}

impl Write for TerminalSurface {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stdout.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        let _ = execute!(
            self.stdout,
            cursor::Show,
            terminal::LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
        info!("terminal surface restored");
    }
}

