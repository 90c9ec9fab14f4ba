//! Text commands: `cat`, `echo`, `head`, `tail`, `wc`, `sort`, `nano`.

use std::cmp::Ordering;

use crate::autocomplete::Suggestion;
use crate::config::DEFAULT_LINE_COUNT;
use crate::error::{CommandError, FsError};
use crate::filesystem;
use crate::models::OutputLine;
use crate::session::{EditorState, SessionMode};
use crate::state::ShellState;

use super::{
    Category, Command, CommandContext, CommandResult, CompletionContext, Invocation, Registry,
    line_count_arg,
};

pub(super) fn register(registry: &mut Registry) {
    registry.register(Box::new(Cat));
    registry.register(Box::new(Echo));
    registry.register(Box::new(Head));
    registry.register(Box::new(Tail));
    registry.register(Box::new(Wc));
    registry.register(Box::new(Sort));
    registry.register(Box::new(Nano));
}

fn read_text(state: &ShellState, name: &str) -> Result<String, FsError> {
    let path = state.resolve_path(name);
    state.fs.read_file(&path).map(str::to_string)
}

fn text_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<OutputLine> {
    lines.into_iter().map(OutputLine::text).collect()
}

// =============================================================================
// cat / echo
// =============================================================================

struct Cat;

impl Command for Cat {
    fn name(&self) -> &'static str {
        "cat"
    }

    fn description(&self) -> &'static str {
        "Print the content of files"
    }

    fn category(&self) -> Category {
        Category::Text
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        if inv.args.is_empty() {
            return Err(CommandError::usage("missing file operand"));
        }

        let mut lines = Vec::new();
        for name in &inv.args {
            match read_text(ctx.state, name) {
                Ok(content) => lines.extend(text_lines(content.lines())),
                Err(e) => lines.push(OutputLine::error(format!("cat: {}: {}", name, e))),
            }
        }
        Ok(CommandResult::output(lines))
    }
}

struct Echo;

impl Command for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn description(&self) -> &'static str {
        "Print arguments"
    }

    fn category(&self) -> Category {
        Category::Text
    }

    fn execute(&self, _ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        Ok(CommandResult::text(inv.args.join(" ")))
    }

    fn autocomplete(&self, _ctx: &CompletionContext<'_>, _partial: &str) -> Option<Vec<Suggestion>> {
        Some(Vec::new())
    }
}

// =============================================================================
// head / tail
// =============================================================================

#[derive(Clone, Copy)]
enum Window {
    Head,
    Tail,
}

impl Window {
    fn name(self) -> &'static str {
        match self {
            Window::Head => "head",
            Window::Tail => "tail",
        }
    }

    fn run(self, state: &ShellState, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let (count, files) = line_count_arg(&inv.args, DEFAULT_LINE_COUNT)?;
        if files.is_empty() {
            return Err(CommandError::usage("missing file operand"));
        }

        let mut lines = Vec::new();
        let headers = files.len() > 1;
        for (i, name) in files.iter().enumerate() {
            let content = match read_text(state, name) {
                Ok(content) => content,
                Err(e) => {
                    lines.push(OutputLine::error(format!(
                        "{}: cannot open '{}' for reading: {}",
                        self.name(),
                        name,
                        e
                    )));
                    continue;
                }
            };
            if headers {
                if i > 0 {
                    lines.push(OutputLine::empty());
                }
                lines.push(OutputLine::text(format!("==> {} <==", name)));
            }
            let all: Vec<&str> = content.lines().collect();
            let selected = match self {
                Window::Head => &all[..count.min(all.len())],
                Window::Tail => &all[all.len().saturating_sub(count)..],
            };
            lines.extend(text_lines(selected.iter().copied()));
        }
        Ok(CommandResult::output(lines))
    }
}

struct Head;

impl Command for Head {
    fn name(&self) -> &'static str {
        "head"
    }

    fn description(&self) -> &'static str {
        "Display first lines of a file"
    }

    fn category(&self) -> Category {
        Category::Text
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        Window::Head.run(ctx.state, inv)
    }
}

struct Tail;

impl Command for Tail {
    fn name(&self) -> &'static str {
        "tail"
    }

    fn description(&self) -> &'static str {
        "Display last lines of a file"
    }

    fn category(&self) -> Category {
        Category::Text
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        Window::Tail.run(ctx.state, inv)
    }
}

// =============================================================================
// wc
// =============================================================================

struct Wc;

#[derive(Default, Clone, Copy)]
struct Counts {
    lines: usize,
    words: usize,
    bytes: usize,
}

impl Counts {
    fn of(content: &str) -> Self {
        Self {
            lines: content.split('\n').count(),
            words: content.split_whitespace().count(),
            bytes: content.len(),
        }
    }

    fn add(&mut self, other: Counts) {
        self.lines += other.lines;
        self.words += other.words;
        self.bytes += other.bytes;
    }

    fn render(&self, show: (bool, bool, bool), label: &str) -> String {
        let mut out = String::new();
        for (enabled, value) in [(show.0, self.lines), (show.1, self.words), (show.2, self.bytes)] {
            if enabled {
                out.push_str(&format!(" {:>7}", value));
            }
        }
        out.push(' ');
        out.push_str(label);
        out.trim().to_string()
    }
}

impl Command for Wc {
    fn name(&self) -> &'static str {
        "wc"
    }

    fn description(&self) -> &'static str {
        "Count lines, words, and bytes"
    }

    fn category(&self) -> Category {
        Category::Text
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let (flags, files) = inv.flags();
        let mut show = (flags.contains(&'l'), flags.contains(&'w'), flags.contains(&'c'));
        if show == (false, false, false) {
            show = (true, true, true);
        }
        if files.is_empty() {
            return Err(CommandError::usage("missing file operand"));
        }

        let mut lines = Vec::new();
        let mut total = Counts::default();
        for name in &files {
            match read_text(ctx.state, name) {
                Ok(content) => {
                    let counts = Counts::of(&content);
                    total.add(counts);
                    lines.push(OutputLine::text(counts.render(show, name)));
                }
                Err(e) => lines.push(OutputLine::error(format!("wc: {}: {}", name, e))),
            }
        }
        if files.len() > 1 {
            lines.push(OutputLine::text(total.render(show, "total")));
        }
        Ok(CommandResult::output(lines))
    }
}

// =============================================================================
// sort
// =============================================================================

struct Sort;

/// Numeric value of the longest leading number, or 0.
fn leading_number(line: &str) -> f64 {
    let trimmed = line.trim_start();
    let end = trimmed
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
        .map_or(trimmed.len(), |(i, _)| i);
    (1..=end)
        .rev()
        .filter(|i| trimmed.is_char_boundary(*i))
        .find_map(|i| trimmed[..i].parse::<f64>().ok())
        .unwrap_or(0.0)
}

impl Command for Sort {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn description(&self) -> &'static str {
        "Sort lines of text"
    }

    fn category(&self) -> Category {
        Category::Text
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let (flags, files) = inv.flags();
        let reverse = flags.contains(&'r');
        let numeric = flags.contains(&'n');
        let unique = flags.contains(&'u');
        let Some(name) = files.last() else {
            return Err(CommandError::usage("missing file operand"));
        };

        let content = read_text(ctx.state, name)
            .map_err(|e| CommandError::usage(format!("cannot read: {}: {}", name, e)))?;
        let mut lines: Vec<&str> = content.lines().collect();

        lines.sort_by(|a, b| {
            let ord = if numeric {
                leading_number(a).total_cmp(&leading_number(b))
            } else {
                a.cmp(b)
            };
            if reverse { ord.reverse() } else { ord }
        });
        if unique {
            lines.dedup_by(|a, b| {
                if numeric {
                    leading_number(a).total_cmp(&leading_number(b)) == Ordering::Equal
                } else {
                    a == b
                }
            });
        }
        Ok(CommandResult::output(text_lines(lines)))
    }
}

// =============================================================================
// nano
// =============================================================================

struct Nano;

impl Command for Nano {
    fn name(&self) -> &'static str {
        "nano"
    }

    fn description(&self) -> &'static str {
        "Edit a file in the line editor"
    }

    fn category(&self) -> Category {
        Category::Text
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, inv: &Invocation) -> Result<CommandResult, CommandError> {
        let Some(name) = inv.args.first() else {
            return Ok(CommandResult::line(OutputLine::error("Usage: nano [filename]")));
        };
        let path = ctx.state.resolve_path(name);

        let content = match ctx.state.fs.read_file(&path) {
            Ok(content) => Some(content),
            Err(FsError::NotFound) if ctx.state.fs.is_directory(&filesystem::parent_path(&path)) => None,
            Err(e) => return Err(CommandError::fs(name.clone(), e)),
        };

        let editor = EditorState::open(path.clone(), content);
        log::debug!("editor opened on {}", path);
        Ok(CommandResult {
            output: vec![OutputLine::info(format!("Opening {} in nano...", name))],
            mode: Some(SessionMode::Editor(editor)),
            host: Vec::new(),
        })
    }
}
