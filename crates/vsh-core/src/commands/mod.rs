//! Command registry and the command trait.
//!
//! Each command is a [`Command`] implementation registered by name in a
//! [`Registry`]. Handlers receive the session through a [`CommandContext`]
//! and return a [`CommandResult`]; failures come back as [`CommandError`]
//! and are rendered by the dispatcher.
//!
//! Handlers live in one module per category:
//! - [`navigation`] - `ls`, `cd`, `pwd`, `tree`, `find`
//! - [`files`] - `touch`, `mkdir`, `rm`, `cp`, `mv`
//! - [`archive`] - `tar`, `zip`, `unzip`
//! - [`text`] - `cat`, `echo`, `head`, `tail`, `wc`, `sort`, `nano`
//! - [`system`] - identity, history, stats, aliases, `reset`
//! - [`utils`] - `help`, `clear`, state import/export, `script`, `debug`

mod archive;
mod files;
mod navigation;
mod system;
mod text;
mod utils;

pub(crate) use system::{reset_final_warning, run_elevated};
pub(crate) use utils::import_state;

use std::collections::BTreeMap;

use crate::autocomplete::Suggestion;
use crate::error::CommandError;
use crate::host::HostRequest;
use crate::models::OutputLine;
use crate::parser;
use crate::session::SessionMode;
use crate::state::ShellState;

// =============================================================================
// Command Trait
// =============================================================================

/// Grouping used by `help`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    Navigation,
    Filesystem,
    Text,
    System,
    Utils,
    Development,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Self::Navigation,
        Self::Filesystem,
        Self::Text,
        Self::System,
        Self::Utils,
        Self::Development,
        Self::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Navigation => "Navigation",
            Self::Filesystem => "File System",
            Self::Text => "Text Processing",
            Self::System => "System",
            Self::Utils => "Utilities",
            Self::Development => "Development",
            Self::Other => "Other",
        }
    }
}

/// A named shell command.
pub trait Command: Send + Sync {
    /// What the user types.
    fn name(&self) -> &'static str;

    /// One-line description for `help`.
    fn description(&self) -> &'static str;

    fn category(&self) -> Category {
        Category::Other
    }

    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        inv: &Invocation,
    ) -> Result<CommandResult, CommandError>;

    /// Suggestions for the argument being typed.
    ///
    /// `None` means the command has no hook and generic path completion
    /// applies; `Some(vec![])` means nothing should be offered.
    fn autocomplete(&self, _ctx: &CompletionContext<'_>, _partial: &str) -> Option<Vec<Suggestion>> {
        None
    }
}

/// Session access for a running handler.
pub struct CommandContext<'a> {
    pub state: &'a mut ShellState,
    pub registry: &'a Registry,
}

/// Read-only session access for autocomplete hooks.
pub struct CompletionContext<'a> {
    pub state: &'a ShellState,
    pub registry: &'a Registry,
}

/// A parsed command line handed to a handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    /// Command portion of the line (aliases expanded, redirect removed)
    pub line: String,
    pub name: String,
    /// Arguments after the name, with quotes removed and variables expanded
    pub args: Vec<String>,
    /// Identity the command runs as
    pub acting: u32,
}

impl Invocation {
    pub fn parse(line: &str, state: &ShellState) -> Self {
        let mut words = state.parse_args(line);
        let name = if words.is_empty() {
            String::new()
        } else {
            words.remove(0)
        };
        Self {
            line: line.trim().to_string(),
            name,
            args: words,
            acting: state.uid(),
        }
    }

    /// Raw text after the command name.
    pub fn rest(&self) -> &str {
        parser::rest_of(&self.line)
    }

    /// Split arguments into single-dash flag letters and operands.
    ///
    /// `-rf` yields `r` and `f`; a lone `-` and anything after `--` are
    /// operands.
    pub fn flags(&self) -> (Vec<char>, Vec<&str>) {
        let mut flags = Vec::new();
        let mut operands = Vec::new();
        let mut only_operands = false;
        for arg in &self.args {
            if only_operands || arg == "-" || !arg.starts_with('-') {
                operands.push(arg.as_str());
            } else if arg == "--" {
                only_operands = true;
            } else {
                flags.extend(arg.trim_start_matches('-').chars());
            }
        }
        (flags, operands)
    }
}

/// What a handler produced.
#[derive(Clone, Debug, Default)]
pub struct CommandResult {
    pub output: Vec<OutputLine>,
    /// Modal state to enter once the handler returns
    pub mode: Option<SessionMode>,
    pub host: Vec<HostRequest>,
}

impl CommandResult {
    pub fn output(lines: Vec<OutputLine>) -> Self {
        Self {
            output: lines,
            ..Self::default()
        }
    }

    pub fn line(line: OutputLine) -> Self {
        Self::output(vec![line])
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::line(OutputLine::text(text))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn enter(mode: SessionMode) -> Self {
        Self {
            mode: Some(mode),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, request: HostRequest) -> Self {
        self.host.push(request);
        self
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Commands by name, built once at startup.
pub struct Registry {
    commands: BTreeMap<&'static str, Box<dyn Command>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            commands: BTreeMap::new(),
        }
    }

    /// A registry holding every built-in command.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        navigation::register(&mut registry);
        files::register(&mut registry);
        archive::register(&mut registry);
        text::register(&mut registry);
        system::register(&mut registry);
        utils::register(&mut registry);
        registry
    }

    /// Register a command. Replaces any existing command with the same name.
    pub fn register(&mut self, command: Box<dyn Command>) {
        self.commands.insert(command.name(), command);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.values().map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Parse and run a command portion as the current identity.
    ///
    /// `None` when the first word names no command.
    pub fn run(
        &self,
        state: &mut ShellState,
        line: &str,
    ) -> Option<Result<CommandResult, CommandError>> {
        let inv = Invocation::parse(line, state);
        let command = self.get(&inv.name)?;
        let mut ctx = CommandContext {
            state,
            registry: self,
        };
        Some(command.execute(&mut ctx, &inv))
    }
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// Transcript text for a failed handler.
///
/// Dispatcher-level failures already carry their own wording; everything
/// else is prefixed with the command name.
pub fn render_error(name: &str, err: &CommandError) -> String {
    match err {
        CommandError::UnknownCommand(_) | CommandError::Math(_) => err.to_string(),
        _ => format!("{}: {}", name, err),
    }
}

/// Suggestions from the registry's command names.
pub(crate) fn command_suggestions(registry: &Registry, partial: &str) -> Vec<Suggestion> {
    registry
        .iter()
        .filter(|c| c.name().starts_with(partial))
        .map(|c| Suggestion::command(c.name(), c.description()))
        .collect()
}

/// Suggestions from the account list.
pub(crate) fn user_suggestions(ctx: &CompletionContext<'_>, partial: &str) -> Vec<Suggestion> {
    ctx.state
        .settings
        .users
        .iter()
        .filter(|u| u.name.starts_with(partial))
        .map(|u| Suggestion::user(&u.name))
        .collect()
}

/// Parse `-n N`, `-nN` or `-N` line counts for `head`/`tail`.
pub(crate) fn line_count_arg<'a>(
    args: &'a [String],
    default: usize,
) -> Result<(usize, Vec<&'a str>), CommandError> {
    let mut count = default;
    let mut operands = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let value = if arg == "-n" {
            Some(iter.next().map(String::as_str).unwrap_or_default())
        } else if let Some(v) = arg.strip_prefix("-n") {
            Some(v)
        } else if let Some(v) = arg.strip_prefix('-')
            && !v.is_empty()
            && v.chars().all(|c| c.is_ascii_digit())
        {
            Some(v)
        } else {
            None
        };
        match value {
            Some(v) => {
                count = v
                    .parse()
                    .map_err(|_| CommandError::usage(format!("invalid number of lines: '{}'", v)))?;
            }
            None => operands.push(arg.as_str()),
        }
    }
    Ok((count, operands))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_parse() {
        let state = ShellState::new();
        let inv = Invocation::parse("  echo \"a  b\" $USER  ", &state);
        assert_eq!(inv.name, "echo");
        assert_eq!(inv.args, vec!["a  b", "user"]);
        assert_eq!(inv.rest(), "\"a  b\" $USER");
        assert_eq!(inv.acting, 1001);
    }

    #[test]
    fn test_flags() {
        let state = ShellState::new();
        let inv = Invocation::parse("rm -rf a -- -b", &state);
        let (flags, operands) = inv.flags();
        assert_eq!(flags, vec!['r', 'f']);
        assert_eq!(operands, vec!["a", "-b"]);
    }

    #[test]
    fn test_line_count_arg() {
        let args: Vec<String> = ["-n", "3", "a"].iter().map(|s| s.to_string()).collect();
        assert_eq!(line_count_arg(&args, 10).unwrap(), (3, vec!["a"]));

        let args: Vec<String> = ["-5", "b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(line_count_arg(&args, 10).unwrap(), (5, vec!["b"]));

        let args: Vec<String> = ["-n", "x"].iter().map(|s| s.to_string()).collect();
        assert!(line_count_arg(&args, 10).is_err());
    }

    #[test]
    fn test_registry_defaults() {
        let registry = Registry::with_defaults();
        for name in ["ls", "cd", "tar", "zip", "unzip", "sudo", "su", "nano", "script", "help"] {
            assert!(registry.contains(name), "missing {}", name);
        }
        assert!(registry.get("nope").is_none());
    }
}
