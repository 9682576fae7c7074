//! Command registry.
//!
//! Maps command names to a handler and its manual text. Commands can be
//! supplied in three shapes (see [`CommandSpec`]); all of them are coerced
//! into one [`CommandEntry`] when registered, so dispatch never has to look
//! at the shape again.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use super::message::Invocation;
use super::terminal::Terminal;

/// How a handler finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Exit code reported now: 0 is success, anything else failure
    Exit(i32),
    /// The handler reports its own exit later, or deliberately never does
    Pending,
}

impl Outcome {
    pub const SUCCESS: Outcome = Outcome::Exit(0);
}

/// Failure raised by a handler.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Expected failure; the text is shown to the user as is
    #[error("{0}")]
    Message(String),

    /// Unexpected fault; kept in the error log for `/error`
    #[error(transparent)]
    Fault(#[from] anyhow::Error),
}

impl CommandError {
    pub fn message(text: impl Into<String>) -> Self {
        CommandError::Message(text.into())
    }
}

pub type CommandResult = std::result::Result<Outcome, CommandError>;

/// Command implementation.
pub type Handler = Rc<dyn Fn(&Terminal, &Invocation) -> CommandResult>;

/// The shapes a command may be registered in.
pub enum CommandSpec {
    /// Bare handler, default manual
    Handler(Handler),
    /// Handler with its manual
    Pair(Handler, String),
    /// Handler with an optional manual
    Package { handler: Handler, man: Option<String> },
}

impl CommandSpec {
    pub fn handler<F>(f: F) -> Self
    where
        F: Fn(&Terminal, &Invocation) -> CommandResult + 'static,
    {
        CommandSpec::Handler(Rc::new(f))
    }

    pub fn pair<F>(f: F, man: impl Into<String>) -> Self
    where
        F: Fn(&Terminal, &Invocation) -> CommandResult + 'static,
    {
        CommandSpec::Pair(Rc::new(f), man.into())
    }

    pub fn package<F>(f: F, man: Option<&str>) -> Self
    where
        F: Fn(&Terminal, &Invocation) -> CommandResult + 'static,
    {
        CommandSpec::Package {
            handler: Rc::new(f),
            man: man.map(str::to_string),
        }
    }
}

/// A built-in or plugin command: builds its spec from the terminal it will
/// be registered on.
pub type CommandFactory = fn(&Terminal) -> CommandSpec;

/// Normalized registry record.
#[derive(Clone)]
pub struct CommandEntry {
    pub name: String,
    pub handler: Handler,
    pub manual: String,
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("name", &self.name)
            .field("manual", &self.manual)
            .finish_non_exhaustive()
    }
}

impl CommandEntry {
    fn from_spec(name: &str, spec: CommandSpec) -> Self {
        let (handler, manual) = match spec {
            CommandSpec::Handler(handler) => (handler, None),
            CommandSpec::Pair(handler, man) => (handler, Some(man)),
            CommandSpec::Package { handler, man } => (handler, man),
        };
        Self {
            name: name.to_string(),
            handler,
            manual: manual.unwrap_or_else(|| default_manual(name)),
        }
    }
}

fn default_manual(name: &str) -> String {
    format!("No manual for {} command.", name)
}

/// Name → command table. Re-registering a name replaces the old entry.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandEntry>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, spec: CommandSpec) {
        let entry = CommandEntry::from_spec(name, spec);
        if self.commands.insert(name.to_string(), entry).is_some() {
            tracing::debug!("command {} replaced", name);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.get(name)
    }

    pub fn manual_of(&self, name: &str) -> String {
        self.commands
            .get(name)
            .map(|entry| entry.manual.clone())
            .unwrap_or_else(|| default_manual(name))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
