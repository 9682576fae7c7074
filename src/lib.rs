//! hackrepl - a hackable interactive command shell
//!
//! Lines typed at the prompt are parsed into commands and dispatched to
//! registered handlers over a small event bus. Output from commands is
//! written around the line being edited so the prompt never gets garbled.
//!
//! # Example
//!
//! ```no_run
//! use hackrepl::{CommandSpec, Config, CrosstermEditor, History, Outcome, Terminal};
//!
//! let editor = CrosstermEditor::new(History::new())?;
//! let term = Terminal::new(Config::load(), Box::new(editor));
//! term.register_command(
//!     "hello",
//!     CommandSpec::pair(
//!         |t, _| {
//!             t.resolve("stdout", "hello!");
//!             Ok(Outcome::SUCCESS)
//!         },
//!         "Usage: /hello",
//!     ),
//! );
//! term.run()?;
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod commands;
pub mod config;
pub mod core;
pub mod history;
pub mod parser;
pub mod ui;

#[cfg(test)]
mod testing;

pub use crate::config::{Config, ConfigOverrides};
pub use crate::core::message::{Arg, Ast, CommandNode, Invocation, Message};
pub use crate::core::registry::{CommandError, CommandFactory, CommandResult, CommandSpec, Outcome};
pub use crate::core::terminal::{Phase, Terminal};
pub use crate::history::History;
pub use crate::parser::{LineParser, ParseError, Parser};
pub use crate::ui::{Channel, CrosstermEditor, LineEditor, LineEvent};
