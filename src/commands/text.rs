//! `text`: placeholder for free-text input.
//!
//! Does nothing but succeed. Applications built on the shell register their
//! own `text` command to take over.

use crate::core::registry::{CommandSpec, Outcome};
use crate::core::terminal::Terminal;

pub fn factory(_terminal: &Terminal) -> CommandSpec {
    CommandSpec::package(
        |terminal, _| {
            terminal.exit(0);
            Ok(Outcome::Pending)
        },
        Some("Usage: /text [text...]"),
    )
}
