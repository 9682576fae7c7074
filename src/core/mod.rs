//! Dispatch core of the shell.
//!
//! - **bus**: topic-based publish/subscribe with resolve/reject listeners
//! - **registry**: command table and handler outcome types
//! - **errlog**: captured failures shown on demand by `/error`
//! - **scheduler**: deferred tasks run by the controller loop
//! - **message**: bus payloads and parsed command types
//! - **terminal**: the controller tying everything together
//!
//! # Architecture
//!
//! ```text
//! Terminal
//! ├── EventBus<Message>   (terminal.* topics)
//! ├── CommandRegistry     (name → handler + manual)
//! ├── ErrorLog            (FIFO of CapturedError)
//! ├── Scheduler           (deferred exits)
//! └── PromptRenderer      (ui::prompt, owns the LineEditor)
//! ```

pub mod bus;
pub mod errlog;
pub mod message;
pub mod registry;
pub mod scheduler;
pub mod terminal;
