//! Error types for the shell.
//!
//! Every failure a user can trigger ends up as a transcript line; these enums
//! carry the message until the dispatcher renders it.
//!
//! - [`FsError`] - virtual filesystem operations
//! - [`CommandError`] - failures returned by command handlers
//! - [`ArchiveError`] - tar/zip document decoding
//! - [`ScriptError`] - expression evaluation
//! - [`StorageError`] - durable persistence (never shown to the user)

use thiserror::Error;

/// Virtual filesystem errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    #[error("No such file or directory")]
    NotFound,
    #[error("Not a directory")]
    NotADirectory,
    #[error("Is a directory")]
    IsADirectory,
    #[error("File exists")]
    AlreadyExists,
    #[error("Device or resource busy")]
    RootBusy,
    #[error("cannot copy a directory into itself")]
    IntoItself,
}

/// Errors returned by command handlers.
///
/// The dispatcher prefixes the command name, so messages never repeat it.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}: command not found")]
    UnknownCommand(String),
    #[error("Math error: Invalid expression")]
    Math(#[source] ScriptError),
    #[error("Authentication failure")]
    AuthFailure,
    #[error("{0}")]
    Usage(String),
    #[error("{path}: {source}")]
    Fs { path: String, source: FsError },
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CommandError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    pub fn fs(path: impl Into<String>, source: FsError) -> Self {
        Self::Fs {
            path: path.into(),
            source,
        }
    }
}

/// Archive document errors.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("not a valid {0} archive")]
    WrongKind(&'static str),
    #[error("invalid archive format")]
    Malformed(#[from] serde_json::Error),
    #[error("{path}: {source}")]
    Fs { path: String, source: FsError },
    #[error("{0}: is a directory (use -r for recursive)")]
    DirectoryNotRecursive(String),
    #[error("{0}: cannot decode payload")]
    Payload(String),
}

/// Expression evaluation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("Unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("Unterminated string literal")]
    UnterminatedString,
    #[error("Invalid number literal '{0}'")]
    InvalidNumber(String),
    #[error("Unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("Unexpected end of input")]
    UnexpectedEnd,
    #[error("Expression nested too deeply")]
    TooDeep,
    #[error("Expression too long")]
    TooLong,
    #[error("{0} is not defined")]
    Undefined(String),
    #[error("{0} is not a function")]
    NotAFunction(String),
    #[error("Cannot read properties of {0}")]
    BadAccess(String),
    #[error("{0}")]
    Type(String),
}

/// Persistence layer errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable")]
    Unavailable,
    #[error("storage I/O failed: {0}")]
    Io(String),
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}
