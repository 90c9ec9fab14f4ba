//! Core of the vsh virtual shell.
//!
//! This crate provides:
//! - [`VirtualFs`] in-memory filesystem with path normalization
//! - [`Registry`] of built-in commands and the [`Shell`] dispatcher
//! - [`autocomplete`] suggestions and the Tab [`Completer`]
//! - [`SessionMode`] modal prompts (auth, reset, editor, scripting)
//! - [`archive`] tar/zip containers over VFS subtrees
//! - [`Storage`] snapshots for durable persistence
//!
//! Everything runs in memory; the host embedding a [`Shell`] supplies input,
//! renders the transcript and fulfils [`HostRequest`]s.

pub mod alias;
pub mod archive;
pub mod autocomplete;
pub mod commands;
pub mod config;
pub mod env;
pub mod error;
pub mod filesystem;
pub mod history;
pub mod host;
pub mod models;
pub mod parser;
pub mod script;
pub mod session;
mod shell;
pub mod state;
pub mod storage;
pub mod utils;

pub use autocomplete::{Completer, Suggestion};
pub use commands::Registry;
pub use error::{CommandError, FsError, StorageError};
pub use filesystem::VirtualFs;
pub use host::{HostEvent, HostRequest};
pub use models::OutputLine;
pub use session::SessionMode;
pub use shell::Shell;
pub use state::ShellState;
pub use storage::{MemoryStorage, Snapshot, Storage};
