//! Test doubles for the terminal side of the shell.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::Duration;

use crate::ui::editor::{LineEditor, LineEvent};

/// In-memory writer whose contents stay readable after it is boxed.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct ScriptState {
    lines: VecDeque<String>,
    partial: String,
    prompt: String,
    prompt_count: usize,
    paused: bool,
    calls: Vec<&'static str>,
}

/// Editor that replays a fixed list of lines and then reports EOF.
///
/// Clones share state, so a test can keep one clone and hand the other to
/// the shell.
#[derive(Clone)]
pub struct ScriptedEditor {
    state: Rc<RefCell<ScriptState>>,
    buffer: String,
}

impl ScriptedEditor {
    pub fn new(lines: &[&str]) -> Self {
        let state = ScriptState {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            ..ScriptState::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
            buffer: String::new(),
        }
    }

    /// Pretend the user typed `text` without pressing enter.
    pub fn type_partial(&self, text: &str) {
        self.state.borrow_mut().partial = text.to_string();
    }

    pub fn last_prompt(&self) -> String {
        self.state.borrow().prompt.clone()
    }

    pub fn prompt_count(&self) -> usize {
        self.state.borrow().prompt_count
    }

    /// Pause/resume calls in order
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.borrow().calls.clone()
    }

    pub fn is_paused_now(&self) -> bool {
        self.state.borrow().paused
    }
}

impl LineEditor for ScriptedEditor {
    fn set_prompt(&mut self, prompt: &str) {
        self.state.borrow_mut().prompt = prompt.to_string();
    }

    fn prompt(&mut self) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        state.prompt_count += 1;
        state.partial.clear();
        state.paused = false;
        self.buffer.clear();
        Ok(())
    }

    fn pause(&mut self) {
        let mut state = self.state.borrow_mut();
        state.paused = true;
        state.calls.push("pause");
    }

    fn resume(&mut self) {
        let mut state = self.state.borrow_mut();
        state.paused = false;
        state.calls.push("resume");
    }

    fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    fn buffer(&self) -> &str {
        &self.buffer
    }

    fn poll_line(&mut self, _timeout: Duration) -> io::Result<LineEvent> {
        let mut state = self.state.borrow_mut();
        if let Some(line) = state.lines.pop_front() {
            self.buffer.clear();
            return Ok(LineEvent::Line(line));
        }
        if state.partial.is_empty() {
            Ok(LineEvent::Eof)
        } else {
            self.buffer = state.partial.clone();
            Ok(LineEvent::Idle)
        }
    }
}

/// Writer whose every write fails, like a closed terminal.
pub struct BrokenWriter;

impl Write for BrokenWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal closed"))
    }
}
