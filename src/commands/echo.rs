//! `echo [text...]`

use crate::core::registry::{CommandSpec, Outcome};
use crate::core::terminal::Terminal;

pub fn factory(_terminal: &Terminal) -> CommandSpec {
    CommandSpec::package(
        |terminal, invocation| {
            let text = invocation.args().collect::<Vec<_>>().join(" ");
            terminal.resolve("stdout", text);
            // Reports for itself, so nothing is left for the dispatcher.
            terminal.exit(0);
            Ok(Outcome::Pending)
        },
        Some("Usage: /echo [text...]"),
    )
}
