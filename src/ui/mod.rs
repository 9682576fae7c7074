//! Terminal-facing pieces: the line editor and the prompt renderer.
//!
//! - **editor**: `LineEditor` contract and the crossterm raw-mode editor
//! - **prompt**: prompt drawing and output echo around the editor

pub mod editor;
pub mod prompt;

pub use editor::{CrosstermEditor, LineEditor, LineEvent};
pub use prompt::{Channel, PromptRenderer};
