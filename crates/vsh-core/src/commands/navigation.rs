//! Directory navigation and listing: `ls`, `cd`, `pwd`, `tree`, `find`.

use regex::Regex;

use crate::autocomplete::{Suggestion, complete_path};
use crate::error::{CommandError, FsError};
use crate::filesystem::DirEntry;
use crate::models::{ListEntry, ListFormat, OutputLine, TextStyle};

use super::{Category, Command, CommandContext, CommandResult, CompletionContext, Invocation, Registry};

pub(super) fn register(registry: &mut Registry) {
    registry.register(Box::new(Ls));
    registry.register(Box::new(Cd));
    registry.register(Box::new(Pwd));
    registry.register(Box::new(Tree));
    registry.register(Box::new(Find));
}

fn directories(ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
    Some(complete_path(ctx, partial, true))
}

// =============================================================================
// ls
// =============================================================================

struct Ls;

#[derive(Default)]
struct LsOptions {
    /// `-a`: dotfiles plus `.` and `..`
    all: bool,
    /// `-A`: dotfiles only
    almost_all: bool,
    long: bool,
    classify: bool,
}

impl LsOptions {
    fn from_flags(flags: &[char]) -> Self {
        let mut opts = Self::default();
        for flag in flags {
            match flag {
                'a' => opts.all = true,
                'A' => opts.almost_all = true,
                'l' => opts.long = true,
                'F' | 'C' => opts.classify = true,
                _ => {}
            }
        }
        opts
    }

    fn entry(&self, name: &str, is_dir: bool, size: Option<usize>) -> ListEntry {
        let style = if is_dir {
            TextStyle::Directory
        } else if name.starts_with('.') {
            TextStyle::Hidden
        } else {
            TextStyle::File
        };
        ListEntry {
            name: name.to_string(),
            style,
            classify: self.classify,
            format: if self.long {
                ListFormat::Long { size }
            } else {
                ListFormat::Short
            },
        }
    }

    fn render(&self, entries: Vec<DirEntry>) -> Vec<OutputLine> {
        let mut items = Vec::new();
        if self.all && !self.almost_all {
            items.push(self.entry(".", true, None));
            items.push(self.entry("..", true, None));
        }
        items.extend(
            entries
                .into_iter()
                .filter(|e| self.all || self.almost_all || !e.name.starts_with('.'))
                .map(|e| self.entry(&e.name, e.is_dir, e.size)),
        );

        if self.long {
            items.into_iter().map(OutputLine::entry).collect()
        } else if items.is_empty() {
            Vec::new()
        } else {
            vec![OutputLine::row(items)]
        }
    }
}

impl Command for Ls {
    fn name(&self) -> &'static str {
        "ls"
    }

    fn description(&self) -> &'static str {
        "List directory contents"
    }

    fn category(&self) -> Category {
        Category::Navigation
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let (flags, mut targets) = inv.flags();
        let opts = LsOptions::from_flags(&flags);
        if targets.is_empty() {
            targets.push(".");
        }

        let mut lines = Vec::new();
        let headers = targets.len() > 1;
        for (i, target) in targets.iter().enumerate() {
            let path = ctx.state.resolve_path(target);
            match ctx.state.fs.list(&path) {
                Ok(entries) => {
                    if headers {
                        if i > 0 {
                            lines.push(OutputLine::empty());
                        }
                        lines.push(OutputLine::text(format!("{}:", target)));
                    }
                    lines.extend(opts.render(entries));
                }
                Err(FsError::NotADirectory) => {
                    lines.push(OutputLine::error(format!("ls: {}: Not a directory", target)));
                }
                Err(e) => {
                    lines.push(OutputLine::error(format!("ls: cannot access '{}': {}", target, e)));
                }
            }
        }
        Ok(CommandResult::output(lines))
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        directories(ctx, partial)
    }
}

// =============================================================================
// cd / pwd
// =============================================================================

struct Cd;

impl Command for Cd {
    fn name(&self) -> &'static str {
        "cd"
    }

    fn description(&self) -> &'static str {
        "Change the current directory"
    }

    fn category(&self) -> Category {
        Category::Navigation
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let target = inv.args.first().cloned().unwrap_or_else(|| ctx.state.home());
        let path = ctx.state.resolve_path(&target);
        match ctx.state.fs.resolve(&path) {
            Some(node) if node.is_directory() => {
                ctx.state.cwd = path;
                Ok(CommandResult::empty())
            }
            Some(_) => Err(CommandError::fs(target, FsError::NotADirectory)),
            None => Err(CommandError::fs(target, FsError::NotFound)),
        }
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        directories(ctx, partial)
    }
}

struct Pwd;

impl Command for Pwd {
    fn name(&self) -> &'static str {
        "pwd"
    }

    fn description(&self) -> &'static str {
        "Print current directory path"
    }

    fn category(&self) -> Category {
        Category::Navigation
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, _inv: &Invocation) -> Result<CommandResult, CommandError> {
        Ok(CommandResult::text(ctx.state.cwd.clone()))
    }

    fn autocomplete(&self, _ctx: &CompletionContext<'_>, _partial: &str) -> Option<Vec<Suggestion>> {
        Some(Vec::new())
    }
}

// =============================================================================
// tree
// =============================================================================

struct Tree;

impl Command for Tree {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn description(&self) -> &'static str {
        "List the file system in a tree view"
    }

    fn category(&self) -> Category {
        Category::Navigation
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let dir = inv.args.first().map_or("/", String::as_str);
        let path = ctx.state.resolve_path(dir);
        let body = ctx
            .state
            .fs
            .tree(&path)
            .map_err(|e| CommandError::fs(dir, e))?;

        let mut lines = vec![OutputLine::text(dir)];
        lines.extend(body.into_iter().map(OutputLine::text));
        Ok(CommandResult::output(lines))
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        directories(ctx, partial)
    }
}

// =============================================================================
// find
// =============================================================================

struct Find;

#[derive(Clone, Copy, PartialEq, Eq)]
enum TypeFilter {
    Any,
    File,
    Directory,
}

/// Translate a shell glob (`*`, `?`) into an anchored regex.
fn glob_to_regex(glob: &str) -> Result<Regex, CommandError> {
    let mut pattern = String::from("^");
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            _ => pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).map_err(|e| CommandError::usage(e.to_string()))
}

impl Command for Find {
    fn name(&self) -> &'static str {
        "find"
    }

    fn description(&self) -> &'static str {
        "Search for files and directories"
    }

    fn category(&self) -> Category {
        Category::Navigation
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let mut start = ".".to_string();
        let mut name: Option<Regex> = None;
        let mut kind = TypeFilter::Any;

        let mut args = inv.args.iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-name" => {
                    let glob = args
                        .next()
                        .ok_or_else(|| CommandError::usage("missing argument to `-name'"))?;
                    name = Some(glob_to_regex(glob)?);
                }
                "-type" => {
                    kind = match args.next().map(String::as_str) {
                        Some("f") => TypeFilter::File,
                        Some("d") => TypeFilter::Directory,
                        Some(other) => {
                            return Err(CommandError::usage(format!(
                                "Unknown argument to -type: {}",
                                other
                            )));
                        }
                        None => return Err(CommandError::usage("missing argument to `-type'")),
                    };
                }
                other if other.starts_with('-') => {
                    return Err(CommandError::usage(format!("unknown predicate `{}'", other)));
                }
                other => start = other.to_string(),
            }
        }

        let path = ctx.state.resolve_path(&start);
        let nodes = ctx
            .state
            .fs
            .walk(&path)
            .map_err(|e| CommandError::fs(start.clone(), e))?;

        let prefix = start.trim_end_matches('/');
        let lines = nodes
            .into_iter()
            .filter(|(_, node)| match kind {
                TypeFilter::Any => true,
                TypeFilter::File => node.is_file(),
                TypeFilter::Directory => node.is_directory(),
            })
            .filter(|(rel, _)| {
                let base = rel.rsplit('/').next().unwrap_or(rel);
                name.as_ref().is_none_or(|re| re.is_match(base))
            })
            .map(|(rel, _)| OutputLine::text(format!("{}/{}", prefix, rel)))
            .collect();
        Ok(CommandResult::output(lines))
    }

    fn autocomplete(&self, ctx: &CompletionContext<'_>, partial: &str) -> Option<Vec<Suggestion>> {
        directories(ctx, partial)
    }
}
