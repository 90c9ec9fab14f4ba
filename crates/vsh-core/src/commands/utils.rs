//! Terminal utilities and development helpers.

use chrono::{SecondsFormat, Utc};

use crate::autocomplete::{Suggestion, SuggestionKind};
use crate::config::{EXPORT_FILE_PREFIX, EXPORTED_OUTPUT_LINES, HELP_DESCRIPTION_WIDTH, HELP_NAME_WIDTH};
use crate::error::CommandError;
use crate::host::HostRequest;
use crate::models::OutputLine;
use crate::script::Interpreter;
use crate::session::SessionMode;
use crate::state::ShellState;
use crate::storage::Snapshot;
use crate::utils::format::{format_size, truncate};

use super::{
    Category, Command, CommandContext, CommandResult, CompletionContext, Invocation, Registry,
    command_suggestions,
};

pub(super) fn register(registry: &mut Registry) {
    registry.register(Box::new(Help));
    registry.register(Box::new(Clear));
    registry.register(Box::new(Screenshot));
    registry.register(Box::new(ExportState));
    registry.register(Box::new(LoadState));
    registry.register(Box::new(StorageInfoCommand));
    registry.register(Box::new(Script));
    registry.register(Box::new(DebugCommand));
}

/// Replace the session with the snapshot in `text`.
///
/// `source` names where the text came from in the success message.
pub(crate) fn import_state(state: &mut ShellState, text: &str, source: &str) -> OutputLine {
    let snapshot = match Snapshot::parse(text) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            log::warn!("rejected state file {}: {}", source, e);
            return OutputLine::error("Invalid state file format");
        }
    };
    match state.restore(snapshot) {
        Ok(()) => OutputLine::success(format!("Terminal state loaded successfully from: {}", source)),
        Err(e) => {
            log::warn!("cannot restore {}: {}", source, e);
            OutputLine::error(format!("Failed to load state: {}", e))
        }
    }
}

fn nothing(_ctx: &CompletionContext<'_>, _partial: &str) -> Option<Vec<Suggestion>> {
    Some(Vec::new())
}

// =============================================================================
// help / clear
// =============================================================================

struct Help;

impl Help {
    fn overview(registry: &Registry) -> Vec<OutputLine> {
        let mut lines = vec![
            OutputLine::info("USAGE:"),
            OutputLine::text("  command [options] [arguments]"),
        ];
        for category in Category::ALL {
            let commands: Vec<_> = registry.iter().filter(|c| c.category() == category).collect();
            if commands.is_empty() {
                continue;
            }
            lines.push(OutputLine::empty());
            lines.push(OutputLine::info(format!("{}:", category.label().to_uppercase())));
            lines.extend(commands.into_iter().map(|c| {
                OutputLine::text(format!(
                    "  {:<width$}{}",
                    c.name(),
                    truncate(c.description(), HELP_DESCRIPTION_WIDTH),
                    width = HELP_NAME_WIDTH
                ))
            }));
        }
        lines.push(OutputLine::empty());
        lines.push(OutputLine::text(
            "TIP: Use Tab to complete commands and paths, Up/Down to browse history",
        ));
        lines
    }
}

impl Command for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn description(&self) -> &'static str {
        "Show available commands"
    }

    fn category(&self) -> Category {
        Category::Utils
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let Some(topic) = inv.args.first() else {
            return Ok(CommandResult::output(Self::overview(ctx.registry)));
        };
        match ctx.registry.get(topic) {
            Some(command) => Ok(CommandResult::text(format!(
                "{} - {}",
                command.name(),
                command.description()
            ))),
            None => Err(CommandError::usage(format!("no help topics match '{}'", topic))),
        }
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        Some(command_suggestions(ctx.registry, partial))
    }
}

struct Clear;

impl Command for Clear {
    fn name(&self) -> &'static str {
        "clear"
    }

    fn description(&self) -> &'static str {
        "Clear the terminal screen"
    }

    fn category(&self) -> Category {
        Category::Utils
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, _inv: &Invocation) -> Result<CommandResult, CommandError> {
        ctx.state.transcript.clear();
        Ok(CommandResult::empty())
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        nothing(ctx, partial)
    }
}

struct Screenshot;

impl Command for Screenshot {
    fn name(&self) -> &'static str {
        "screenshot"
    }

    fn description(&self) -> &'static str {
        "Save a screenshot of the terminal"
    }

    fn category(&self) -> Category {
        Category::Utils
    }

    fn execute(&self, _ctx: &mut CommandContext<'_>, _inv: &Invocation) -> Result<CommandResult, CommandError> {
        Ok(CommandResult::line(OutputLine::info("Taking screenshot...")).with_host(HostRequest::Screenshot))
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        nothing(ctx, partial)
    }
}

// =============================================================================
// State Import / Export
// =============================================================================

struct ExportState;

impl Command for ExportState {
    fn name(&self) -> &'static str {
        "export-state"
    }

    fn description(&self) -> &'static str {
        "Download the terminal state as JSON"
    }

    fn category(&self) -> Category {
        Category::Utils
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, _inv: &Invocation) -> Result<CommandResult, CommandError> {
        let date = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let stamp = date.get(..19).unwrap_or(&date).replace(':', "-");
        let filename = format!("{}-{}.json", EXPORT_FILE_PREFIX, stamp);

        let contents = ctx.state.snapshot(EXPORTED_OUTPUT_LINES, Some(date)).to_json()?;
        log::debug!("exporting {} bytes as {}", contents.len(), filename);
        Ok(
            CommandResult::line(OutputLine::success(format!(
                "Terminal state exported as: {}",
                filename
            )))
            .with_host(HostRequest::Download { filename, contents }),
        )
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        nothing(ctx, partial)
    }
}

struct LoadState;

impl Command for LoadState {
    fn name(&self) -> &'static str {
        "load-state"
    }

    fn description(&self) -> &'static str {
        "Restore the terminal state from a JSON file"
    }

    fn category(&self) -> Category {
        Category::Utils
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let Some(target) = inv.args.first() else {
            return Ok(
                CommandResult::line(OutputLine::info("Select a JSON state file to load..."))
                    .with_host(HostRequest::PickStateFile),
            );
        };
        let path = ctx.state.resolve_path(target);
        let text = ctx
            .state
            .fs
            .read_file(&path)
            .map_err(|e| CommandError::fs(target, e))?
            .to_string();
        Ok(CommandResult::line(import_state(ctx.state, &text, target)))
    }
}

struct StorageInfoCommand;

impl Command for StorageInfoCommand {
    fn name(&self) -> &'static str {
        "storage-info"
    }

    fn description(&self) -> &'static str {
        "Show persistence status"
    }

    fn category(&self) -> Category {
        Category::Utils
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, _inv: &Invocation) -> Result<CommandResult, CommandError> {
        let info = &ctx.state.storage;
        let location = if info.location.is_empty() {
            "none"
        } else {
            info.location.as_str()
        };
        let fingerprint = info
            .fingerprint
            .as_deref()
            .map_or("none", |f| f.get(..16).unwrap_or(f));
        let lines = vec![
            OutputLine::text(format!("{:<16}{}", "Backend:", location)),
            OutputLine::text(format!("{:<16}{}", "Snapshot size:", format_size(info.bytes))),
            OutputLine::text(format!("{:<16}{}", "Saves:", info.saves)),
            OutputLine::text(format!("{:<16}{}", "Failed saves:", info.failures)),
            OutputLine::text(format!("{:<16}{}", "Fingerprint:", fingerprint)),
        ];
        Ok(CommandResult::output(lines))
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        nothing(ctx, partial)
    }
}

// =============================================================================
// Development
// =============================================================================

struct Script;

impl Command for Script {
    fn name(&self) -> &'static str {
        "script"
    }

    fn description(&self) -> &'static str {
        "Evaluate an expression or enter scripting mode"
    }

    fn category(&self) -> Category {
        Category::Development
    }

    fn execute(&self, _ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let source = inv.rest().trim();
        if !source.is_empty() {
            return Ok(CommandResult::output(Interpreter::new().eval(source).into_lines()));
        }
        Ok(CommandResult {
            output: vec![
                OutputLine::info("Entering scripting mode."),
                OutputLine::text("Type expressions to evaluate them, '.exit' to leave."),
            ],
            mode: Some(SessionMode::Scripting(Interpreter::new())),
            host: Vec::new(),
        })
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        nothing(ctx, partial)
    }
}

struct DebugCommand;

const DEBUG_USAGE: &str = "Usage: debug [fs|settings|history]";

impl Command for DebugCommand {
    fn name(&self) -> &'static str {
        "debug"
    }

    fn description(&self) -> &'static str {
        "Dump internal state to the log"
    }

    fn category(&self) -> Category {
        Category::Development
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let state = &ctx.state;
        let message = match inv.args.first().map(String::as_str) {
            Some("fs") => {
                let dump = serde_json::to_string_pretty(&state.fs)
                    .map_err(|e| CommandError::usage(e.to_string()))?;
                log::info!("filesystem:\n{}", dump);
                "File system logged to console"
            }
            Some("settings") => {
                let dump = serde_json::to_string_pretty(&state.settings)
                    .map_err(|e| CommandError::usage(e.to_string()))?;
                log::info!("settings:\n{}", dump);
                "Settings logged to console"
            }
            Some("history") => {
                log::info!("history: {:?}", state.history.to_vec());
                "Command history logged to console"
            }
            _ => return Ok(CommandResult::line(OutputLine::error(DEBUG_USAGE))),
        };
        Ok(CommandResult::line(OutputLine::info(message)))
    }

    fn autocomplete(&self, _ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        Some(
            ["fs", "settings", "history"]
                .into_iter()
                .filter(|topic| topic.starts_with(partial))
                .map(|topic| Suggestion {
                    kind: SuggestionKind::Command,
                    value: topic.to_string(),
                    display: topic.to_string(),
                })
                .collect(),
        )
    }
}
