// ================================
// src/commander/terminal.rs - commands typed on stdin
// ================================
use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Stdin};

use tracing::warn;

use super::{Command, Commander};

/// Reads one whitespace-separated word per tick.
///
/// Blocks until a word is available. Unknown words and end of input brake.
pub struct TerminalCommander<B> {
    input: B,
    pending: VecDeque<String>,
}

impl TerminalCommander<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()))
    }
}

impl<B: BufRead> TerminalCommander<B> {
    pub fn new(input: B) -> Self {
        Self {
            input,
            pending: VecDeque::new(),
        }
    }

    fn next_word(&mut self) -> Option<String> {
        while self.pending.is_empty() {
            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => self
                    .pending
                    .extend(line.split_whitespace().map(str::to_string)),
                Err(e) => {
                    warn!("terminal: read failed: {}", e);
                    return None;
                }
            }
        }
        self.pending.pop_front()
    }
}

impl<B: BufRead> Commander for TerminalCommander<B> {
    fn scan_cmd(&mut self) -> Command {
        match self.next_word() {
            Some(word) => word.parse().unwrap_or(Command::Brake),
            None => Command::Brake,
        }
    }
}
