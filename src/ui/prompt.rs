//! Prompt renderer.
//!
//! Owns the one visible input line. Any output that is not typed by the
//! user goes through [`PromptRenderer::echo`], which pauses the editor,
//! clears the line, writes the message and then redraws the prompt with
//! whatever was being typed.

use std::io::{self, Write};
use std::time::Duration;

use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use unicode_width::UnicodeWidthStr;

use super::editor::{LineEditor, LineEvent};

/// Output channel for [`PromptRenderer::echo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stdout,
    Stderr,
}

/// Keeps prompt, user input and system output from trampling each other.
pub struct PromptRenderer {
    editor: Box<dyn LineEditor>,
    stdout: Box<dyn Write>,
    stderr: Box<dyn Write>,
    username: String,
    prompt_delim: String,
    /// Drop non-forced echoes
    quiet: bool,
    /// In-progress input, reset by every new prompt
    current_input: String,
}

impl PromptRenderer {
    pub fn new(
        editor: Box<dyn LineEditor>,
        stdout: Box<dyn Write>,
        stderr: Box<dyn Write>,
        username: &str,
        prompt_delim: &str,
        quiet: bool,
    ) -> Self {
        Self {
            editor,
            stdout,
            stderr,
            username: username.to_string(),
            prompt_delim: prompt_delim.to_string(),
            quiet,
            current_input: String::new(),
        }
    }

    /// `<username><delim>`
    pub fn prompt_text(&self) -> String {
        format!("{}{}", self.username, self.prompt_delim)
    }

    pub fn current_input(&self) -> &str {
        &self.current_input
    }

    /// Issue a fresh prompt with an empty input line.
    pub fn render_prompt(&mut self) -> io::Result<()> {
        self.current_input.clear();
        let prompt = self.prompt_text();
        self.editor.set_prompt(&prompt);
        self.editor.prompt()
    }

    /// Rewrite `<prompt><input>` on the current line and leave the cursor
    /// after the last character. `None` keeps the input typed so far.
    /// The editor is resumed even if the write fails.
    pub fn redraw(&mut self, force_newline: bool, current_input: Option<&str>) -> io::Result<()> {
        let input = match current_input {
            Some(input) => input.to_string(),
            None => self.current_input.clone(),
        };
        let prompt = self.prompt_text();
        self.editor.set_prompt(&prompt);

        let drawn = self.draw_line(force_newline, &format!("{}{}", prompt, input));
        self.editor.resume();
        drawn
    }

    fn draw_line(&mut self, force_newline: bool, text: &str) -> io::Result<()> {
        if force_newline {
            queue!(self.stdout, Print("\r\n"))?;
        }
        let column = text.width().min(u16::MAX as usize) as u16;
        queue!(
            self.stdout,
            Clear(ClearType::CurrentLine),
            MoveToColumn(0),
            Print(text),
            MoveToColumn(column)
        )?;
        self.stdout.flush()
    }

    /// Write `message` to `channel` without corrupting the input line.
    /// A failed write is returned after the prompt has been restored.
    pub fn echo(&mut self, message: &str, forced: bool, channel: Channel) -> io::Result<()> {
        if self.quiet && !forced {
            return Ok(());
        }

        self.editor.pause();
        let written = self.write_message(message, channel);
        let redrawn = self.redraw(false, None);
        written.and(redrawn)
    }

    fn write_message(&mut self, message: &str, channel: Channel) -> io::Result<()> {
        queue!(self.stdout, Clear(ClearType::CurrentLine), MoveToColumn(0))?;
        self.stdout.flush()?;

        // Raw mode needs explicit carriage returns.
        let body = message.replace('\n', "\r\n");
        let out = match channel {
            Channel::Stdout => &mut self.stdout,
            Channel::Stderr => &mut self.stderr,
        };
        queue!(out, Print(body), Print("\r\n"))?;
        out.flush()
    }

    /// Poll the editor for a completed line, tracking the partial input.
    pub fn poll_line(&mut self, timeout: Duration) -> io::Result<LineEvent> {
        let event = self.editor.poll_line(timeout)?;
        self.current_input = self.editor.buffer().to_string();
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BrokenWriter, ScriptedEditor, SharedBuffer};

    fn renderer(quiet: bool) -> (PromptRenderer, ScriptedEditor, SharedBuffer, SharedBuffer) {
        let editor = ScriptedEditor::new(&[]);
        let out = SharedBuffer::new();
        let err = SharedBuffer::new();
        let r = PromptRenderer::new(
            Box::new(editor.clone()),
            Box::new(out.clone()),
            Box::new(err.clone()),
            "u",
            "> ",
            quiet,
        );
        (r, editor, out, err)
    }

    #[test]
    fn test_render_prompt_resets_input() {
        let (mut r, editor, _, _) = renderer(false);
        editor.type_partial("half typed");
        r.poll_line(Duration::ZERO).unwrap();
        assert_eq!(r.current_input(), "half typed");

        r.render_prompt().unwrap();
        assert_eq!(r.current_input(), "");
        assert_eq!(editor.last_prompt(), "u> ");
        assert_eq!(editor.prompt_count(), 1);
    }

    #[test]
    fn test_echo_pauses_writes_and_redraws() {
        let (mut r, editor, out, err) = renderer(false);
        r.echo("hello", false, Channel::Stdout).unwrap();
        r.echo("bad", true, Channel::Stderr).unwrap();

        let stdout = out.contents();
        assert!(stdout.contains("hello\r\n"));
        assert!(stdout.ends_with(&format!("u> {}", "\u{1b}[4G")));
        assert_eq!(err.contents(), "bad\r\n");
        assert_eq!(editor.calls(), vec!["pause", "resume", "pause", "resume"]);
        assert!(!editor.is_paused_now());
    }

    #[test]
    fn test_quiet_drops_unforced_echo() {
        let (mut r, editor, out, _) = renderer(true);
        r.echo("hi", false, Channel::Stdout).unwrap();
        assert_eq!(out.contents(), "");
        assert!(editor.calls().is_empty());

        r.echo("hi", true, Channel::Stdout).unwrap();
        assert!(out.contents().contains("hi\r\n"));
    }

    #[test]
    fn test_redraw_with_newline_and_input() {
        let (mut r, _, out, _) = renderer(false);
        r.redraw(true, Some("abc")).unwrap();
        let stdout = out.contents();
        assert!(stdout.starts_with("\r\n"));
        // "u> abc" is six columns; MoveToColumn is 1-based on the wire.
        assert!(stdout.ends_with("u> abc\u{1b}[7G"));
    }

    #[test]
    fn test_redraw_with_explicit_empty_input() {
        let (mut r, editor, out, _) = renderer(false);
        editor.type_partial("stale");
        r.poll_line(Duration::ZERO).unwrap();
        out.clear();

        r.redraw(false, Some("")).unwrap();
        assert!(out.contents().ends_with("u> \u{1b}[4G"));

        r.redraw(false, None).unwrap();
        assert!(out.contents().ends_with("u> stale\u{1b}[9G"));
    }

    #[test]
    fn test_failed_echo_still_resumes_editor() {
        let editor = ScriptedEditor::new(&[]);
        let mut r = PromptRenderer::new(
            Box::new(editor.clone()),
            Box::new(BrokenWriter),
            Box::new(BrokenWriter),
            "u",
            "> ",
            false,
        );

        assert!(r.echo("hello", false, Channel::Stdout).is_err());
        assert!(!editor.is_paused_now());
        assert!(r.redraw(true, None).is_err());
        assert!(!editor.is_paused_now());
    }
}
