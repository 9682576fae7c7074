//! Built-in commands.
//!
//! Each built-in is a [`CommandFactory`]: given the terminal it will live
//! on, it returns the handler and manual to register.
//!
//! - **echo**: print its arguments
//! - **text**: hook for free text, meant to be replaced by the embedder
//! - **sleep**: finish after a delay, reporting its exit code later

mod echo;
mod sleep;
mod text;

use crate::core::registry::CommandFactory;

/// Every built-in, in registration order.
pub fn builtins() -> Vec<(&'static str, CommandFactory)> {
    vec![
        ("echo", echo::factory as CommandFactory),
        ("sleep", sleep::factory as CommandFactory),
        ("text", text::factory as CommandFactory),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        let names: Vec<&str> = builtins().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["echo", "sleep", "text"]);
    }
}
