//! File and directory manipulation: `touch`, `mkdir`, `rm`, `cp`, `mv`.
//!
//! Commands taking several operands report each failure on its own line and
//! carry on with the remaining operands.

use crate::autocomplete::{Suggestion, complete_path};
use crate::error::{CommandError, FsError};
use crate::filesystem;
use crate::models::OutputLine;
use crate::state::ShellState;

use super::{Category, Command, CommandContext, CommandResult, CompletionContext, Invocation, Registry};

pub(super) fn register(registry: &mut Registry) {
    registry.register(Box::new(Touch));
    registry.register(Box::new(Mkdir));
    registry.register(Box::new(Rm));
    registry.register(Box::new(Cp));
    registry.register(Box::new(Mv));
}

/// Absolute destination for `src`: an existing directory receives it by name.
fn destination(state: &ShellState, src: &str, dest: &str) -> String {
    let dest = state.resolve_path(dest);
    if state.fs.is_directory(&dest) && dest != src {
        filesystem::join_path(&dest, filesystem::file_name(src))
    } else {
        dest
    }
}

// =============================================================================
// touch / mkdir
// =============================================================================

struct Touch;

impl Command for Touch {
    fn name(&self) -> &'static str {
        "touch"
    }

    fn description(&self) -> &'static str {
        "Create an empty file"
    }

    fn category(&self) -> Category {
        Category::Filesystem
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        if inv.args.is_empty() {
            return Err(CommandError::usage("missing file operand"));
        }

        let mut lines = Vec::new();
        for target in &inv.args {
            let path = ctx.state.resolve_path(target);
            if ctx.state.fs.exists(&path) {
                continue;
            }
            match ctx.state.fs.create(&path, false, None) {
                Ok(()) => ctx.state.stats.files += 1,
                Err(e) => lines.push(OutputLine::error(format!("touch: cannot touch '{}': {}", target, e))),
            }
        }
        Ok(CommandResult::output(lines))
    }
}

struct Mkdir;

impl Command for Mkdir {
    fn name(&self) -> &'static str {
        "mkdir"
    }

    fn description(&self) -> &'static str {
        "Create a new directory"
    }

    fn category(&self) -> Category {
        Category::Filesystem
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let (flags, targets) = inv.flags();
        if targets.is_empty() {
            return Err(CommandError::usage("missing operand"));
        }
        let parents = flags.contains(&'p');

        let mut lines = Vec::new();
        for target in targets {
            let path = ctx.state.resolve_path(target);
            let result = if parents {
                ctx.state.fs.create_dir_all(&path)
            } else {
                ctx.state.fs.create(&path, true, None).map(|()| 1)
            };
            match result {
                Ok(created) => ctx.state.stats.directories += created as u64,
                Err(e) => lines.push(OutputLine::error(format!(
                    "mkdir: cannot create directory '{}': {}",
                    target, e
                ))),
            }
        }
        Ok(CommandResult::output(lines))
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        Some(complete_path(ctx, partial, true))
    }
}

// =============================================================================
// rm
// =============================================================================

struct Rm;

impl Command for Rm {
    fn name(&self) -> &'static str {
        "rm"
    }

    fn description(&self) -> &'static str {
        "Remove files or directories"
    }

    fn category(&self) -> Category {
        Category::Filesystem
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let (flags, targets) = inv.flags();
        let recursive = flags.iter().any(|f| matches!(f, 'r' | 'R'));
        let force = flags.contains(&'f');
        if targets.is_empty() {
            return if force {
                Ok(CommandResult::empty())
            } else {
                Err(CommandError::usage("missing operand"))
            };
        }

        let mut lines = Vec::new();
        for target in targets {
            let path = ctx.state.resolve_path(target);
            if let Err(e) = ctx.state.fs.remove(&path, recursive, force) {
                lines.push(OutputLine::error(format!("rm: cannot remove '{}': {}", target, e)));
            }
        }
        Ok(CommandResult::output(lines))
    }
}

// =============================================================================
// cp / mv
// =============================================================================

/// Split `SOURCE... DEST` operands.
fn sources_and_dest<'a>(operands: &[&'a str]) -> Result<(Vec<&'a str>, &'a str), CommandError> {
    match operands.split_last() {
        Some((dest, sources)) if !sources.is_empty() => Ok((sources.to_vec(), dest)),
        _ => Err(CommandError::usage("missing file operand")),
    }
}

struct Cp;

impl Command for Cp {
    fn name(&self) -> &'static str {
        "cp"
    }

    fn description(&self) -> &'static str {
        "Copy files and directories"
    }

    fn category(&self) -> Category {
        Category::Filesystem
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let (flags, operands) = inv.flags();
        let recursive = flags.iter().any(|f| matches!(f, 'r' | 'R'));
        let (sources, dest) = sources_and_dest(&operands)?;

        let mut lines = Vec::new();
        for source in sources {
            let src = ctx.state.resolve_path(source);
            let Some(node) = ctx.state.fs.resolve(&src) else {
                lines.push(OutputLine::error(format!(
                    "cp: cannot stat '{}': {}",
                    source,
                    FsError::NotFound
                )));
                continue;
            };
            if node.is_directory() && !recursive {
                lines.push(OutputLine::error(format!(
                    "cp: -r not specified; omitting directory '{}'",
                    source
                )));
                continue;
            }
            let dst = destination(ctx.state, &src, dest);
            if let Err(e) = ctx.state.fs.copy(&src, &dst) {
                lines.push(OutputLine::error(format!("cp: cannot copy '{}' to '{}': {}", source, dest, e)));
            }
        }
        Ok(CommandResult::output(lines))
    }
}

struct Mv;

impl Command for Mv {
    fn name(&self) -> &'static str {
        "mv"
    }

    fn description(&self) -> &'static str {
        "Move or rename files and directories"
    }

    fn category(&self) -> Category {
        Category::Filesystem
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let (_, operands) = inv.flags();
        let (sources, dest) = sources_and_dest(&operands)?;

        let mut lines = Vec::new();
        for source in sources {
            let src = ctx.state.resolve_path(source);
            if !ctx.state.fs.exists(&src) {
                lines.push(OutputLine::error(format!(
                    "mv: cannot stat '{}': {}",
                    source,
                    FsError::NotFound
                )));
                continue;
            }
            let dst = destination(ctx.state, &src, dest);
            if let Err(e) = ctx.state.fs.move_node(&src, &dst) {
                lines.push(OutputLine::error(format!("mv: cannot move '{}' to '{}': {}", source, dest, e)));
            }
        }
        Ok(CommandResult::output(lines))
    }
}
