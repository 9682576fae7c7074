//! Line input editor.
//!
//! The controller only depends on the [`LineEditor`] trait. The shipped
//! implementation, [`CrosstermEditor`], reads keys in raw mode and keeps a
//! single editable line with history recall.

use std::io::{self, Write};
use std::time::Duration;

use crossterm::{
    cursor::MoveToColumn,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    queue,
    style::Print,
    terminal::{self, Clear, ClearType},
};
use unicode_width::UnicodeWidthStr;

use crate::history::History;

/// Result of polling the editor for input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// A complete line was submitted
    Line(String),
    /// Nothing finished within the timeout
    Idle,
    /// Ctrl+C
    Interrupt,
    /// Ctrl+D on an empty line, or input closed
    Eof,
}

/// Collaborator that turns keystrokes into complete lines.
pub trait LineEditor {
    /// Prompt drawn before the input buffer
    fn set_prompt(&mut self, prompt: &str);

    /// Start a fresh line and draw the prompt even if nothing was typed
    fn prompt(&mut self) -> io::Result<()>;

    /// Stop processing keystrokes until [`resume`](Self::resume)
    fn pause(&mut self);

    fn resume(&mut self);

    fn is_paused(&self) -> bool;

    /// Text typed so far on the current line
    fn buffer(&self) -> &str;

    /// Wait up to `timeout` for the line to be completed
    fn poll_line(&mut self, timeout: Duration) -> io::Result<LineEvent>;
}

/// What a key press did to the line.
#[derive(Debug, PartialEq, Eq)]
enum KeyAction {
    Redraw,
    Submit,
    Interrupt,
    Eof,
    Ignore,
}

/// Editable line: text plus a cursor counted in chars.
#[derive(Debug, Default)]
struct LineBuffer {
    text: String,
    cursor: usize,
}

impl LineBuffer {
    fn byte_index(&self, char_pos: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    fn insert(&mut self, ch: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.text.remove(at);
        true
    }

    fn delete(&mut self) -> bool {
        if self.cursor >= self.char_len() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.text.remove(at);
        true
    }

    fn replace(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.char_len();
    }

    fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    /// Display width of the text left of the cursor
    fn cursor_width(&self) -> usize {
        let at = self.byte_index(self.cursor);
        self.text[..at].width()
    }
}

/// Raw-mode line editor on top of crossterm.
pub struct CrosstermEditor {
    prompt: String,
    line: LineBuffer,
    history: History,
    paused: bool,
    raw_enabled: bool,
}

impl CrosstermEditor {
    /// Enter raw mode. It is restored when the editor is dropped.
    pub fn new(history: History) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self {
            prompt: String::new(),
            line: LineBuffer::default(),
            history,
            paused: false,
            raw_enabled: true,
        })
    }

    fn draw_line(&self) -> io::Result<()> {
        let mut stdout = io::stdout();
        let column = self.prompt.width() + self.line.cursor_width();
        queue!(
            stdout,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(&self.prompt),
            Print(&self.line.text),
            MoveToColumn(column.min(u16::MAX as usize) as u16)
        )?;
        stdout.flush()
    }

    fn handle_key(&mut self, key: &KeyEvent) -> KeyAction {
        if key.kind != KeyEventKind::Press {
            return KeyAction::Ignore;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => KeyAction::Interrupt,
            KeyCode::Char('d') if ctrl => {
                if self.line.text.is_empty() {
                    KeyAction::Eof
                } else if self.line.delete() {
                    KeyAction::Redraw
                } else {
                    KeyAction::Ignore
                }
            }
            KeyCode::Char('u') if ctrl => {
                self.line.take();
                KeyAction::Redraw
            }
            KeyCode::Char('a') if ctrl => {
                self.line.cursor = 0;
                KeyAction::Redraw
            }
            KeyCode::Char('e') if ctrl => {
                self.line.cursor = self.line.char_len();
                KeyAction::Redraw
            }
            KeyCode::Char(_) if ctrl => KeyAction::Ignore,
            KeyCode::Char(ch) => {
                self.line.insert(ch);
                KeyAction::Redraw
            }
            KeyCode::Backspace => {
                if self.line.backspace() {
                    KeyAction::Redraw
                } else {
                    KeyAction::Ignore
                }
            }
            KeyCode::Delete => {
                if self.line.delete() {
                    KeyAction::Redraw
                } else {
                    KeyAction::Ignore
                }
            }
            KeyCode::Left => {
                self.line.cursor = self.line.cursor.saturating_sub(1);
                KeyAction::Redraw
            }
            KeyCode::Right => {
                self.line.cursor = (self.line.cursor + 1).min(self.line.char_len());
                KeyAction::Redraw
            }
            KeyCode::Home => {
                self.line.cursor = 0;
                KeyAction::Redraw
            }
            KeyCode::End => {
                self.line.cursor = self.line.char_len();
                KeyAction::Redraw
            }
            KeyCode::Up => match self.history.older(&self.line.text) {
                Some(entry) => {
                    let entry = entry.to_string();
                    self.line.replace(&entry);
                    KeyAction::Redraw
                }
                None => KeyAction::Ignore,
            },
            KeyCode::Down => match self.history.newer() {
                Some(entry) => {
                    let entry = entry.to_string();
                    self.line.replace(&entry);
                    KeyAction::Redraw
                }
                None => KeyAction::Ignore,
            },
            KeyCode::Enter => KeyAction::Submit,
            _ => KeyAction::Ignore,
        }
    }
}

impl LineEditor for CrosstermEditor {
    fn set_prompt(&mut self, prompt: &str) {
        self.prompt = prompt.to_string();
    }

    fn prompt(&mut self) -> io::Result<()> {
        self.line.take();
        self.paused = false;
        self.draw_line()
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn buffer(&self) -> &str {
        &self.line.text
    }

    fn poll_line(&mut self, timeout: Duration) -> io::Result<LineEvent> {
        if self.paused {
            return Ok(LineEvent::Idle);
        }
        if !event::poll(timeout)? {
            return Ok(LineEvent::Idle);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(LineEvent::Idle);
        };
        match self.handle_key(&key) {
            KeyAction::Redraw => {
                self.draw_line()?;
                Ok(LineEvent::Idle)
            }
            KeyAction::Submit => {
                let line = self.line.take();
                self.history.add(&line);
                let mut stdout = io::stdout();
                queue!(stdout, Print("\r\n"))?;
                stdout.flush()?;
                Ok(LineEvent::Line(line))
            }
            KeyAction::Interrupt => Ok(LineEvent::Interrupt),
            KeyAction::Eof => Ok(LineEvent::Eof),
            KeyAction::Ignore => Ok(LineEvent::Idle),
        }
    }
}

impl Drop for CrosstermEditor {
    fn drop(&mut self) {
        if self.raw_enabled {
            let _ = terminal::disable_raw_mode();
            let mut stdout = io::stdout();
            let _ = queue!(stdout, Print("\r\n"));
            let _ = stdout.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, mods: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, mods)
    }

    // Builds an editor without touching the real terminal.
    fn editor() -> CrosstermEditor {
        CrosstermEditor {
            prompt: "u$ ".into(),
            line: LineBuffer::default(),
            history: History::new(),
            paused: false,
            raw_enabled: false,
        }
    }

    fn type_str(ed: &mut CrosstermEditor, s: &str) {
        for ch in s.chars() {
            ed.handle_key(&press(KeyCode::Char(ch), KeyModifiers::NONE));
        }
    }

    #[test]
    fn test_insert_and_cursor_editing() {
        let mut ed = editor();
        type_str(&mut ed, "helo");
        ed.handle_key(&press(KeyCode::Left, KeyModifiers::NONE));
        type_str(&mut ed, "l");
        assert_eq!(ed.buffer(), "hello");

        ed.handle_key(&press(KeyCode::Home, KeyModifiers::NONE));
        ed.handle_key(&press(KeyCode::Delete, KeyModifiers::NONE));
        assert_eq!(ed.buffer(), "ello");

        ed.handle_key(&press(KeyCode::End, KeyModifiers::NONE));
        ed.handle_key(&press(KeyCode::Backspace, KeyModifiers::NONE));
        assert_eq!(ed.buffer(), "ell");
    }

    #[test]
    fn test_control_keys() {
        let mut ed = editor();
        assert_eq!(
            ed.handle_key(&press(KeyCode::Char('d'), KeyModifiers::CONTROL)),
            KeyAction::Eof
        );
        type_str(&mut ed, "abc");
        assert_eq!(
            ed.handle_key(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            KeyAction::Interrupt
        );
        ed.handle_key(&press(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert_eq!(ed.buffer(), "");
        assert_eq!(ed.handle_key(&press(KeyCode::Enter, KeyModifiers::NONE)), KeyAction::Submit);
    }

    #[test]
    fn test_history_recall() {
        let mut ed = editor();
        ed.history.add("man echo");
        type_str(&mut ed, "ec");
        ed.handle_key(&press(KeyCode::Up, KeyModifiers::NONE));
        assert_eq!(ed.buffer(), "man echo");
        ed.handle_key(&press(KeyCode::Down, KeyModifiers::NONE));
        assert_eq!(ed.buffer(), "ec");
    }

    #[test]
    fn test_wide_chars_cursor_width() {
        let mut line = LineBuffer::default();
        for ch in "日本x".chars() {
            line.insert(ch);
        }
        assert_eq!(line.cursor_width(), 5);
        line.cursor = 1;
        assert_eq!(line.cursor_width(), 2);
        assert!(line.backspace());
        assert_eq!(line.text, "本x");
    }
}
