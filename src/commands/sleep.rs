//! `sleep <ms>`: returns at once and reports its exit code when the delay
//! has passed.

use std::time::Duration;

use crate::core::registry::{CommandError, CommandSpec, Outcome};
use crate::core::terminal::Terminal;

/// Longest accepted delay
const MAX_DELAY_MS: u64 = 60_000;

pub fn factory(_terminal: &Terminal) -> CommandSpec {
    CommandSpec::pair(
        |terminal, invocation| {
            let ms = invocation
                .args()
                .next()
                .and_then(|arg| arg.parse::<u64>().ok())
                .filter(|ms| *ms <= MAX_DELAY_MS)
                .ok_or_else(|| CommandError::message("sleep: invalid delay"))?;

            terminal.schedule(Duration::from_millis(ms), |t| t.exit(0));
            Ok(Outcome::Pending)
        },
        "Usage: /sleep <milliseconds>",
    )
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use crate::config::Config;
    use crate::core::message::Message;
    use crate::core::terminal::{Phase, Terminal};
    use crate::parser::LineParser;
    use crate::testing::{ScriptedEditor, SharedBuffer};

    fn terminal() -> (Terminal, Rc<RefCell<Vec<String>>>) {
        let term = Terminal::with_io(
            Config { motd: String::new(), ..Config::default() },
            Box::new(ScriptedEditor::new(&[])),
            Box::new(LineParser),
            Box::new(SharedBuffer::new()),
            Box::new(SharedBuffer::new()),
        );
        let seen = Rc::new(RefCell::new(Vec::new()));
        let ok = Rc::clone(&seen);
        let bad = Rc::clone(&seen);
        term.when("command.exit")
            .on_resolve(move |m: &Message| ok.borrow_mut().push(format!("ok {}", m)))
            .on_reject(move |m: &Message| bad.borrow_mut().push(format!("fail {}", m)));
        (term, seen)
    }

    #[test]
    fn test_sleep_reports_later() {
        let (term, seen) = terminal();
        term.parse_readline("sleep 0");

        assert!(seen.borrow().is_empty());
        assert_eq!(term.phase(), Phase::Dispatching);

        std::thread::sleep(Duration::from_millis(1));
        assert_eq!(term.run_due_tasks(), 1);
        assert_eq!(*seen.borrow(), vec!["ok exit 0"]);
        assert_eq!(term.phase(), Phase::Prompting);
    }

    #[test]
    fn test_sleep_rejects_bad_delay() {
        let (term, seen) = terminal();
        term.parse_readline("sleep soon");
        term.parse_readline("sleep 999999999");
        assert_eq!(*seen.borrow(), vec!["fail exit 1", "fail exit 1"]);
        assert_eq!(term.error_count(), 0);
    }
}
