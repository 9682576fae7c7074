//! Dispatch controller.
//!
//! [`Terminal`] wires the event bus to the registry, the error log and the
//! prompt renderer, and drives the shell cycle:
//!
//! ```text
//! PROMPTING ─line─► READING ─► PARSING ─ok─► DISPATCHING ─► REPORTING ─┐
//!     ▲                           │ parse error                         │
//!     └───────────────────────────┴─────────── command.exit ◄───────────┘
//! ```
//!
//! # Topics
//!
//! | Topic | Payload | Listener |
//! |-------|---------|----------|
//! | `terminal.readline` | `Line` | parse and publish `command.exec` |
//! | `terminal.command.exec` | `Exec` | dispatch |
//! | `terminal.command.exit` | `Exit` | resolve and reject both re-prompt |
//! | `terminal.stdout` | `Text` | echo |
//! | `terminal.stderr` | `Text` | forced echo; also the failure sink |
//!
//! Everything runs on the caller's thread. A handler that cannot answer
//! right away returns [`Outcome::Pending`] and reports later through
//! [`Terminal::exit`], usually from a task queued with
//! [`Terminal::schedule`]. The rest of a `;` sequence waits for that
//! report, and only the last element's exit returns to the prompt.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::bus::{EventBus, Subscription};
use super::errlog::{CapturedError, ErrorLog};
use super::message::{Ast, CommandNode, ExecRequest, Invocation, Message};
use super::registry::{CommandError, CommandRegistry, CommandSpec, Outcome};
use super::scheduler::Scheduler;
use crate::commands;
use crate::config::Config;
use crate::parser::{LineParser, Parser};
use crate::ui::editor::{LineEditor, LineEvent};
use crate::ui::prompt::{Channel, PromptRenderer};

/// Prefix shared by every topic this terminal publishes on
const NAMESPACE: &str = "terminal";

/// How long the run loop waits for a keystroke before checking tasks
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shown when a handler fails unexpectedly; details go to the error log
const FAULT_NOTICE: &str = "Error: (Type /error to view stack)";

/// Where the shell is in its read/dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Prompting,
    Reading,
    Parsing,
    Dispatching,
    Reporting,
}

struct Inner {
    config: Config,
    bus: EventBus<Message>,
    registry: RefCell<CommandRegistry>,
    errors: RefCell<ErrorLog>,
    renderer: RefCell<PromptRenderer>,
    parser: Box<dyn Parser>,
    scheduler: RefCell<Scheduler<Terminal>>,
    phase: Cell<Phase>,
    /// Commands of the current line still waiting to run
    queued: RefCell<VecDeque<CommandNode>>,
    /// Raw text of the current line
    line: RefCell<String>,
    /// The last dispatched command has not reported its exit
    awaiting_exit: Cell<bool>,
    /// A handler is on the stack
    dispatching: Cell<bool>,
}

/// Handle to a running shell. Clones refer to the same shell.
#[derive(Clone)]
pub struct Terminal {
    inner: Rc<Inner>,
}

fn topic(event: &str) -> String {
    format!("{}.{}", NAMESPACE, event)
}

/// Sequences in source order, nested ones inlined.
fn flatten(ast: &Ast, out: &mut VecDeque<CommandNode>) {
    match ast {
        Ast::Sequence(items) => {
            for item in items {
                flatten(item, out);
            }
        }
        Ast::Command(node) => out.push_back(node.clone()),
    }
}

impl Terminal {
    /// Shell on the process stdout/stderr with the default parser.
    pub fn new(config: Config, editor: Box<dyn LineEditor>) -> Self {
        Self::with_io(
            config,
            editor,
            Box::new(LineParser),
            Box::new(io::stdout()),
            Box::new(io::stderr()),
        )
    }

    /// Shell with every collaborator supplied by the caller.
    pub fn with_io(
        config: Config,
        editor: Box<dyn LineEditor>,
        parser: Box<dyn Parser>,
        stdout: Box<dyn Write>,
        stderr: Box<dyn Write>,
    ) -> Self {
        let renderer = PromptRenderer::new(
            editor,
            stdout,
            stderr,
            &config.username,
            &config.prompt_delim,
            config.verbose,
        );
        let terminal = Self {
            inner: Rc::new(Inner {
                bus: EventBus::new(Some(topic("stderr"))),
                config,
                registry: RefCell::new(CommandRegistry::new()),
                errors: RefCell::new(ErrorLog::new()),
                renderer: RefCell::new(renderer),
                parser,
                scheduler: RefCell::new(Scheduler::new()),
                phase: Cell::new(Phase::Prompting),
                queued: RefCell::new(VecDeque::new()),
                line: RefCell::new(String::new()),
                awaiting_exit: Cell::new(false),
                dispatching: Cell::new(false),
            }),
        };
        terminal.init_events();
        terminal.init_builtins();
        terminal
    }

    fn init_events(&self) {
        self.listen("command.exec", false, |term, msg| match msg {
            Message::Exec(request) => term.handle_command(request),
            other => warn!("ignoring non-exec message on command.exec: {:?}", other),
        });
        self.listen("command.exit", false, |term, _| term.after_exit());
        self.listen("command.exit", true, |term, _| term.after_exit());
        self.listen("stdout", false, |term, msg| {
            term.echo(msg.to_string(), false, Channel::Stdout)
        });
        self.listen("stderr", false, |term, msg| {
            term.echo(msg.to_string(), true, Channel::Stderr)
        });
        self.listen("readline", false, |term, msg| term.parse_readline(&msg.to_string()));
    }

    fn init_builtins(&self) {
        for (name, factory) in commands::builtins() {
            let spec = factory(self);
            self.register_command(name, spec);
        }
    }

    /// Attach an internal listener that does not keep the shell alive.
    fn listen(&self, event: &str, reject: bool, f: impl Fn(&Terminal, &Message) + 'static) {
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        let listener = move |msg: &Message| {
            if let Some(inner) = weak.upgrade() {
                f(&Terminal { inner }, msg);
            }
        };
        let sub = self.when(event);
        if reject {
            sub.on_reject(listener);
        } else {
            sub.on_resolve(listener);
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn phase(&self) -> Phase {
        self.inner.phase.get()
    }

    fn set_phase(&self, phase: Phase) {
        if self.inner.phase.replace(phase) != phase {
            debug!("phase -> {:?}", phase);
        }
    }

    // -- Bus API --

    /// Subscription to `terminal.<event>`.
    pub fn when(&self, event: &str) -> Subscription<Message> {
        self.inner.bus.subscribe(topic(event))
    }

    /// Publish on `terminal.<event>`.
    pub fn resolve(&self, event: &str, message: impl Into<Message>) {
        self.inner.bus.publish(&topic(event), &message.into());
    }

    /// Publish a failure on `terminal.<event>`.
    pub fn reject(&self, event: &str, message: impl Into<Message>) {
        self.inner.bus.publish_failure(&topic(event), &message.into());
    }

    /// Report the exit code of the running command. A late report from a
    /// pending command also starts the next command of its line.
    pub fn exit(&self, code: i32) {
        let awaited = self.inner.awaiting_exit.replace(false);
        self.set_phase(Phase::Reporting);
        if code == 0 {
            self.resolve("command.exit", Message::Exit(0));
        } else {
            self.reject("command.exit", Message::Exit(code));
        }
        if awaited && !self.inner.dispatching.get() {
            self.run_queued();
        }
    }

    fn after_exit(&self) {
        if self.inner.queued.borrow().is_empty() {
            self.prompt();
        }
    }

    // -- Registry API --

    /// Add or replace a command.
    pub fn register_command(&self, name: &str, spec: CommandSpec) {
        self.inner.registry.borrow_mut().register(name, spec);
    }

    pub fn manual_of(&self, name: &str) -> String {
        self.inner.registry.borrow().manual_of(name)
    }

    /// Failures waiting to be shown by `/error`.
    pub fn error_count(&self) -> usize {
        self.inner.errors.borrow().len()
    }

    // -- Output --

    /// Write through the prompt renderer. Non-forced output is dropped when
    /// the `verbose` setting is on.
    pub fn echo(&self, message: impl AsRef<str>, forced: bool, channel: Channel) {
        let result = self
            .inner
            .renderer
            .borrow_mut()
            .echo(message.as_ref(), forced, channel);
        if let Err(e) = result {
            warn!("echo failed: {}", e);
        }
    }

    /// Start a fresh prompt.
    pub fn prompt(&self) {
        self.set_phase(Phase::Prompting);
        if let Err(e) = self.inner.renderer.borrow_mut().render_prompt() {
            warn!("prompt failed: {}", e);
        }
    }

    pub fn prompt_text(&self) -> String {
        self.inner.renderer.borrow().prompt_text()
    }

    /// Redraw the prompt line, e.g. after writing to the terminal directly.
    pub fn redraw_prompt(&self, force_newline: bool, current_input: Option<&str>) {
        let result = self
            .inner
            .renderer
            .borrow_mut()
            .redraw(force_newline, current_input);
        if let Err(e) = result {
            warn!("redraw failed: {}", e);
        }
    }

    // -- Cycle --

    /// Handle one line from the editor.
    pub fn parse_readline(&self, line: &str) {
        self.set_phase(Phase::Reading);
        if line.trim().is_empty() {
            self.prompt();
            return;
        }

        self.set_phase(Phase::Parsing);
        match self.inner.parser.parse(line) {
            Ok(ast) => self.resolve(
                "command.exec",
                Message::Exec(ExecRequest {
                    raw: line.to_string(),
                    ast,
                }),
            ),
            Err(err) => {
                debug!("parse error in {:?}: {}", line, err);
                self.resolve("stderr", format!("-term: {}", err));
                self.inner.errors.borrow_mut().record(CapturedError::Parse(err));
                self.prompt();
            }
        }
    }

    /// Dispatch a parsed line. Commands run in order, each one after the
    /// previous has reported its exit.
    pub fn handle_command(&self, request: &ExecRequest) {
        let mut nodes = VecDeque::new();
        flatten(&request.ast, &mut nodes);
        let dropped = self.inner.queued.replace(nodes).len();
        if dropped > 0 {
            warn!("new line replaces {} queued commands", dropped);
        }
        *self.inner.line.borrow_mut() = request.raw.clone();
        self.run_queued();
    }

    fn run_queued(&self) {
        loop {
            let next = self.inner.queued.borrow_mut().pop_front();
            let Some(node) = next else {
                return;
            };
            let raw = self.inner.line.borrow().clone();

            self.inner.awaiting_exit.set(true);
            self.inner.dispatching.set(true);
            self.dispatch_command(&raw, &node);
            self.inner.dispatching.set(false);

            if self.inner.awaiting_exit.get() {
                debug!("{} pending, {} queued", node.cmd, self.inner.queued.borrow().len());
                return;
            }
        }
    }

    /// Give up on a command that can no longer report.
    fn abandon_line(&self) {
        let dropped = self.inner.queued.borrow_mut().drain(..).count();
        self.inner.awaiting_exit.set(false);
        warn!("command pending with no scheduled work, dropping {} queued", dropped);
        self.prompt();
    }

    fn dispatch_command(&self, raw: &str, node: &CommandNode) {
        self.set_phase(Phase::Dispatching);
        debug!("dispatch {} ({} args)", node.cmd, node.argv.len());

        match node.cmd.as_str() {
            "error" => {
                let drained = self.inner.errors.borrow_mut().drain_all();
                for entry in drained {
                    self.resolve("stderr", entry.to_string());
                }
                self.exit(0);
            }
            "man" => match node.positional().next() {
                Some(name) => {
                    let manual = self.manual_of(name);
                    self.resolve("stdout", manual);
                    self.exit(0);
                }
                None => self.handle_error(
                    &node.cmd,
                    CommandError::message("man: missing command name"),
                ),
            },
            _ => self.invoke(raw, node),
        }
    }

    fn invoke(&self, raw: &str, node: &CommandNode) {
        let handler = self
            .inner
            .registry
            .borrow()
            .lookup(&node.cmd)
            .map(|entry| Rc::clone(&entry.handler));
        let Some(handler) = handler else {
            // A typo, not a fault: shown but never logged.
            self.resolve("stderr", format!("Unknown command: {}", node.cmd));
            self.exit(1);
            return;
        };

        let invocation = Invocation {
            raw: raw.to_string(),
            ast: node.clone(),
        };
        match panic::catch_unwind(AssertUnwindSafe(|| handler(self, &invocation))) {
            Ok(Ok(Outcome::Exit(code))) => self.exit(code),
            Ok(Ok(Outcome::Pending)) => debug!("{} pending", node.cmd),
            Ok(Err(err)) => self.handle_error(&node.cmd, err),
            Err(payload) => self.handle_panic(&node.cmd, payload),
        }
    }

    fn handle_error(&self, command: &str, err: CommandError) {
        match err {
            CommandError::Fault(error) => {
                error!("{} failed: {:#}", command, error);
                self.inner.errors.borrow_mut().record(CapturedError::Fault {
                    command: command.to_string(),
                    error,
                });
                self.resolve("stderr", FAULT_NOTICE);
            }
            CommandError::Message(text) => self.resolve("stderr", text),
        }
        self.exit(1);
    }

    fn handle_panic(&self, command: &str, payload: Box<dyn Any + Send>) {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!("{} panicked: {}", command, message);
        self.inner.errors.borrow_mut().record(CapturedError::Panic {
            command: command.to_string(),
            message,
        });
        self.resolve("stderr", FAULT_NOTICE);
        self.exit(1);
    }

    // -- Deferred work --

    /// Run `task` on this shell's loop once `delay` has passed.
    pub fn schedule(&self, delay: Duration, task: impl FnOnce(&Terminal) + 'static) {
        self.inner
            .scheduler
            .borrow_mut()
            .schedule(Instant::now(), delay, Box::new(task));
    }

    /// Run every task that is due. Returns how many ran.
    pub fn run_due_tasks(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.inner.scheduler.borrow_mut().pop_due(Instant::now());
            let Some(task) = task else {
                break;
            };
            task(self);
            ran += 1;
        }
        ran
    }

    fn time_until_next_task(&self) -> Option<Duration> {
        self.inner.scheduler.borrow().time_until_next(Instant::now())
    }

    // -- Main loop --

    /// Print the message of the day and the first prompt.
    pub fn start(&self) {
        let motd = self.inner.config.motd.clone();
        if !motd.is_empty() {
            self.echo(motd, true, Channel::Stdout);
        }
        self.prompt();
    }

    /// Read and dispatch lines until the editor reports EOF or interrupt.
    pub fn run(&self) -> io::Result<()> {
        info!("shell started as {}", self.inner.config.username);
        self.start();

        loop {
            self.run_due_tasks();

            if self.phase() != Phase::Prompting {
                match self.time_until_next_task() {
                    Some(wait) => std::thread::sleep(wait.min(POLL_INTERVAL)),
                    // Nothing scheduled can ever report this command's exit.
                    None => self.abandon_line(),
                }
                continue;
            }

            let event = self.inner.renderer.borrow_mut().poll_line(POLL_INTERVAL)?;
            match event {
                LineEvent::Line(line) => self.resolve("readline", Message::Line(line)),
                LineEvent::Idle => {}
                LineEvent::Interrupt | LineEvent::Eof => {
                    info!("input closed ({:?})", event);
                    return Ok(());
                }
            }
        }
    }
}
