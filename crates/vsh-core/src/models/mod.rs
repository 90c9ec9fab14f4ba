//! Data models for the shell.
//!
//! - [`Node`] - virtual filesystem nodes
//! - [`OutputLine`] - transcript records
//! - [`User`], [`Settings`], [`Stats`] - accounts and usage counters

mod filesystem;
mod terminal;
mod user;

pub use filesystem::Node;
pub use terminal::{
    ListEntry, ListFormat, OutputLine, OutputLineData, TextStyle, ValueKind, to_plain_text,
};
pub use user::{ErrorRecord, Settings, Stats, User};
