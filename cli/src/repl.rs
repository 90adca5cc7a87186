//! Line input for the question loop.

use std::io::{self, BufRead, IsTerminal, Write};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// A line typed (or piped) by the user.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    /// A question.
    Question(String),
    /// A `/command`, without the slash.
    Command(String),
    /// Nothing but whitespace.
    Blank,
}

impl Input {
    /// Classifies one line of input.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            Self::Blank
        } else if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            Self::Command("quit".to_string())
        } else if let Some(command) = line.strip_prefix('/') {
            Self::Command(command.trim().to_string())
        } else {
            Self::Question(line.to_string())
        }
    }
}

/// Reads lines from the terminal with inline editing, or from piped stdin.
#[derive(Debug)]
pub struct LineReader {
    interactive: bool,
}

impl LineReader {
    /// Detects whether stdin is a terminal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            interactive: io::stdin().is_terminal(),
        }
    }

    /// Whether prompts should be echoed.
    #[must_use]
    pub const fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Next line, or `None` at end of input.
    ///
    /// # Errors
    /// Fails when stdin or the terminal cannot be read.
    pub fn read_line(&self, prompt: &str) -> Result<Option<String>> {
        if self.interactive {
            read_terminal_line(prompt)
        } else {
            let mut line = String::new();
            if io::stdin().lock().read_line(&mut line)? == 0 {
                return Ok(None);
            }
            Ok(Some(line))
        }
    }
}

fn read_terminal_line(prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    enable_raw_mode()?;
    let _guard = RawModeGuard;

    let mut buffer = String::new();
    loop {
        if event::poll(Duration::from_millis(250))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Esc => {
                        print!("\r\n");
                        io::stdout().flush().ok();
                        return Ok(None);
                    }
                    KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        print!("\r\n");
                        io::stdout().flush().ok();
                        return Ok(None);
                    }
                    KeyCode::Enter => {
                        print!("\r\n");
                        io::stdout().flush().ok();
                        return Ok(Some(buffer));
                    }
                    KeyCode::Backspace => {
                        if buffer.pop().is_some() {
                            print!("\u{8} \u{8}");
                            io::stdout().flush().ok();
                        }
                    }
                    KeyCode::Char(c) => {
                        buffer.push(c);
                        print!("{c}");
                        io::stdout().flush().ok();
                    }
                    _ => {}
                },
                _ => {}
            }
        }
    }
}

struct RawModeGuard;

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_lines() {
        assert_eq!(Input::parse("   "), Input::Blank);
        assert_eq!(
            Input::parse(" What color is the sky? \n"),
            Input::Question("What color is the sky?".to_string())
        );
        assert_eq!(Input::parse("exit"), Input::Command("quit".to_string()));
        assert_eq!(Input::parse("QUIT"), Input::Command("quit".to_string()));
        assert_eq!(
            Input::parse("/load ~/Papers/Attention.pdf"),
            Input::Command("load ~/Papers/Attention.pdf".to_string())
        );
    }
}
