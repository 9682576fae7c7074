//! Payload types carried on the event bus.
//!
//! Topics are plain strings; what flows over them is a [`Message`]. The
//! parser produces an [`Ast`], the controller turns each [`CommandNode`]
//! into an [`Invocation`] before calling a handler.

use std::fmt;

/// A single argument of a parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Plain word
    Positional(String),
    /// `--name=value` style argument
    Named { name: String, value: String },
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Positional(word) => write!(f, "{}", word),
            Arg::Named { name, value } => write!(f, "--{}={}", name, value),
        }
    }
}

/// One command with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandNode {
    pub cmd: String,
    pub argv: Vec<Arg>,
}

impl CommandNode {
    pub fn new(cmd: impl Into<String>, argv: Vec<Arg>) -> Self {
        Self {
            cmd: cmd.into(),
            argv,
        }
    }

    /// Positional arguments in order, named ones skipped.
    pub fn positional(&self) -> impl Iterator<Item = &str> {
        self.argv.iter().filter_map(|arg| match arg {
            Arg::Positional(word) => Some(word.as_str()),
            Arg::Named { .. } => None,
        })
    }

    /// Value of the named argument `name`, if given.
    pub fn named(&self, name: &str) -> Option<&str> {
        self.argv.iter().find_map(|arg| match arg {
            Arg::Named { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }
}

/// Parser output for one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ast {
    Command(CommandNode),
    /// Commands that run one after another, in source order
    Sequence(Vec<Ast>),
}

impl From<CommandNode> for Ast {
    fn from(node: CommandNode) -> Self {
        Ast::Command(node)
    }
}

/// What a handler receives: the raw input line and its own node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub raw: String,
    pub ast: CommandNode,
}

impl Invocation {
    pub fn args(&self) -> impl Iterator<Item = &str> {
        self.ast.positional()
    }
}

/// A request to execute a parsed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub raw: String,
    pub ast: Ast,
}

/// Value published on a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Text destined for an output channel
    Text(String),
    /// A complete line from the input editor
    Line(String),
    /// Parsed line ready for dispatch
    Exec(ExecRequest),
    /// Command exit code
    Exit(i32),
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Message::Text(text.into())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Text(text) | Message::Line(text) => write!(f, "{}", text),
            Message::Exec(req) => write!(f, "{}", req.raw),
            Message::Exit(code) => write!(f, "exit {}", code),
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Text(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_skips_named() {
        let node = CommandNode::new(
            "echo",
            vec![
                Arg::Positional("a".into()),
                Arg::Named { name: "color".into(), value: "red".into() },
                Arg::Positional("b".into()),
            ],
        );
        assert_eq!(node.positional().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(node.named("color"), Some("red"));
        assert_eq!(node.named("size"), None);
    }

    #[test]
    fn test_message_display() {
        assert_eq!(Message::text("hi").to_string(), "hi");
        assert_eq!(Message::Exit(3).to_string(), "exit 3");
    }
}
