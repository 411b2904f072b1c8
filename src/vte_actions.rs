use crate::vte_actions::VteAction::{
    Backspace, CarriageReturn, CursorBackward, CursorColumn, CursorForward, EraseLine, LineFeed,
    Tab, Text,
};
use vte::{Params, Parser, Perform};

/// The semantic actions a single-line reader cares about in the bytes a process writes to its
/// terminal. Vertical movement is ignored: output is consumed as a stream of lines.
#[derive(Debug, PartialEq, Eq)]
pub enum VteAction {
    Text(char),
    Tab,
    LineFeed,
    CarriageReturn,
    Backspace,
    CursorForward(u16),
    CursorBackward(u16),
    /// 1-based column, as sent on the wire.
    CursorColumn(u16),
    EraseLine(EraseMode),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum EraseMode {
    ToEnd,
    ToStart,
    All,
}

/// A wrapper over [Parser] and [Perform] which takes bytes in and exposes the semantic actions.
/// Parser state survives across calls, so an escape sequence split between two reads is still
/// recognised.
pub struct VteActionParser {
    parser: Parser,
}

impl VteActionParser {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    pub fn parse_bytes(&mut self, bytes: &[u8]) -> Vec<VteAction> {
        let mut performer = Performer::new();
        for byte in bytes {
            self.parser.advance(&mut performer, *byte)
        }
        performer.actions
    }
}

impl Default for VteActionParser {
    fn default() -> Self {
        Self::new()
    }
}

// Private struct to hide this implementation detail
struct Performer {
    actions: Vec<VteAction>,
}

impl Performer {
    fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }
}

// Implementation largely inspired by vt100-rust:
// https://github.com/doy/vt100-rust/blob/main/src/perform.rs
impl Perform for Performer {
    fn print(&mut self, c: char) {
        self.actions.push(Text(c))
    }

    fn execute(&mut self, byte: u8) {
        let action = match byte {
            8 => Backspace,
            9 => Tab,
            10 => LineFeed,
            13 => CarriageReturn,
            _ => return,
        };
        self.actions.push(action);
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], _ignore: bool, c: char) {
        if intermediates.is_empty() {
            let action = match c {
                'C' => CursorForward(params.canonicalize_1(1)),
                'D' => CursorBackward(params.canonicalize_1(1)),
                'G' => CursorColumn(params.canonicalize_1(1)),
                'K' => match params.first_or_zero() {
                    0 => EraseLine(EraseMode::ToEnd),
                    1 => EraseLine(EraseMode::ToStart),
                    2 => EraseLine(EraseMode::All),
                    _ => return,
                },
                // SGR and everything vertical carries no text for a line reader.
                _ => return,
            };
            self.actions.push(action);
        }
    }
}

trait ParamsCanonicalize {
    fn canonicalize_1(&self, default: u16) -> u16;
    fn first_or_zero(&self) -> u16;
}

impl ParamsCanonicalize for Params {
    fn canonicalize_1(&self, default: u16) -> u16 {
        Some(self.first_or_zero())
            .filter(|x| *x != 0)
            .unwrap_or(default)
    }

    fn first_or_zero(&self) -> u16 {
        self.iter()
            .next()
            .and_then(|x| x.first().copied())
            .unwrap_or(0)
    }
}
