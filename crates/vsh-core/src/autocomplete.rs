//! Tab completion for command names, aliases and paths.
//!
//! This module provides:
//! - [`suggest`] - candidates for the token being typed
//! - [`complete_path`] - generic path completion used as the fallback
//! - [`common_prefix`] - the unambiguous advance for several candidates
//! - [`Completer`] - the Tab / selection-menu state machine
//! - [`hint`] - ghost text while typing
//!
//! The line is tokenized by single spaces. While the first token is being
//! typed, command and alias names are offered; afterwards the owning
//! command's hook decides, falling back to path completion.

use crate::commands::{CompletionContext, command_suggestions};

// ============================================================================
// Public Types
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuggestionKind {
    Command,
    Alias,
    Directory,
    File,
    User,
}

/// One completion candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    /// Text that replaces the token being completed
    pub value: String,
    /// Text shown in the selection menu
    pub display: String,
}

impl Suggestion {
    pub fn command(name: &str, description: &str) -> Self {
        Self {
            kind: SuggestionKind::Command,
            value: name.to_string(),
            display: format!("{} - {}", name, description),
        }
    }

    pub fn alias(name: &str, value: &str) -> Self {
        Self {
            kind: SuggestionKind::Alias,
            value: name.to_string(),
            display: format!("{} -> {}", name, value),
        }
    }

    pub fn user(name: &str) -> Self {
        Self {
            kind: SuggestionKind::User,
            value: name.to_string(),
            display: name.to_string(),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == SuggestionKind::Directory
    }

    /// The value as inserted when this candidate completes the token alone.
    fn completed_value(&self) -> String {
        if self.is_directory() {
            self.value.clone()
        } else {
            format!("{} ", self.value)
        }
    }
}

// ============================================================================
// Suggestion Generation
// ============================================================================

/// Split off the token being completed: `(text before it, token)`.
fn split_token(line: &str) -> (&str, &str) {
    let start = line.trim_end_matches(|c: char| !c.is_whitespace()).len();
    line.split_at(start)
}

/// Candidates for the last token of `line`.
pub fn suggest(ctx: &CompletionContext<'_>, line: &str) -> Vec<Suggestion> {
    let input = line.trim_start();
    let parts: Vec<&str> = input.split(char::is_whitespace).collect();

    if parts.len() <= 1 {
        let partial = parts.first().copied().unwrap_or_default();
        if partial.is_empty() {
            return Vec::new();
        }
        let mut suggestions = command_suggestions(ctx.registry, partial);
        suggestions.extend(
            ctx.state
                .aliases
                .iter()
                .filter(|(name, _)| name.starts_with(partial) && !ctx.registry.contains(name))
                .map(|(name, value)| Suggestion::alias(name, value)),
        );
        suggestions.sort_by(|a, b| a.value.cmp(&b.value));
        return suggestions;
    }

    let command = parts[0];
    let partial = parts.last().copied().unwrap_or_default();
    ctx.registry
        .get(command)
        .and_then(|c| c.autocomplete(ctx, partial))
        .unwrap_or_else(|| complete_path(ctx, partial, false))
}

/// Complete a partial path against the filesystem.
///
/// The typed directory part is kept verbatim, so absolute, `~`-relative and
/// bare paths complete in the style they were written. Hidden entries are
/// only offered once the name starts with `.`.
pub fn complete_path(ctx: &CompletionContext<'_>, partial: &str, dirs_only: bool) -> Vec<Suggestion> {
    let (base, term) = match partial.rfind('/') {
        Some(idx) => (&partial[..=idx], &partial[idx + 1..]),
        None => ("", partial),
    };

    let search_dir = if base.is_empty() {
        ctx.state.cwd.clone()
    } else {
        ctx.state.resolve_path(base)
    };

    let Ok(entries) = ctx.state.fs.list(&search_dir) else {
        return Vec::new();
    };

    entries
        .into_iter()
        .filter(|e| e.name.starts_with(term))
        .filter(|e| !e.name.starts_with('.') || term.starts_with('.'))
        .filter(|e| !dirs_only || e.is_dir)
        .map(|e| {
            let slash = if e.is_dir { "/" } else { "" };
            Suggestion {
                kind: if e.is_dir {
                    SuggestionKind::Directory
                } else {
                    SuggestionKind::File
                },
                value: format!("{}{}{}", base, e.name, slash),
                display: format!("{}{}", e.name, slash),
            }
        })
        .collect()
}

/// Longest shared leading substring (case-sensitive).
pub fn common_prefix<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    let mut iter = values.into_iter();
    let Some(first) = iter.next() else {
        return String::new();
    };
    let mut len = first.len();
    for value in iter {
        len = first
            .char_indices()
            .zip(value.chars())
            .take_while(|((i, a), b)| *i < len && a == b)
            .map(|((i, a), _)| i + a.len_utf8())
            .last()
            .unwrap_or(0);
    }
    first[..len].to_string()
}

/// Ghost text: the suffix the first candidate would add to the line.
pub fn hint(ctx: &CompletionContext<'_>, line: &str) -> Option<String> {
    let (_, partial) = split_token(line.trim_start());
    suggest(ctx, line)
        .into_iter()
        .find(|s| s.value.starts_with(partial) && s.value.len() > partial.len())
        .map(|s| s.value[partial.len()..].to_string())
}

// ============================================================================
// Completer
// ============================================================================

/// Open selection list over the last candidate set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Menu {
    /// Line text before the token being completed
    prefix: String,
    pub suggestions: Vec<Suggestion>,
    pub selected: usize,
}

impl Menu {
    pub fn current(&self) -> Option<&Suggestion> {
        self.suggestions.get(self.selected)
    }
}

/// Tab key handling.
///
/// A single candidate completes in place. Several candidates first advance
/// the line to their common prefix and then open a [`Menu`] that cycles
/// circularly until a selection is accepted or dismissed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Completer {
    menu: Option<Menu>,
}

impl Completer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn menu(&self) -> Option<&Menu> {
        self.menu.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.menu.is_some()
    }

    /// Handle Tab on `line`; returns the replacement line, if any.
    ///
    /// With the menu open, Tab moves the selection instead.
    pub fn tab(&mut self, ctx: &CompletionContext<'_>, line: &str) -> Option<String> {
        if self.menu.is_some() {
            self.move_selection(1);
            return None;
        }

        let suggestions = suggest(ctx, line);
        let (prefix, partial) = split_token(line);

        match suggestions.len() {
            0 => None,
            1 => Some(format!("{}{}", prefix, suggestions[0].completed_value())),
            _ => {
                let common = common_prefix(suggestions.iter().map(|s| s.value.as_str()));
                self.menu = Some(Menu {
                    prefix: prefix.to_string(),
                    suggestions,
                    selected: 0,
                });
                (common.len() > partial.len()).then(|| format!("{}{}", prefix, common))
            }
        }
    }

    /// Move the selection by `delta`, wrapping at both ends.
    pub fn move_selection(&mut self, delta: isize) {
        if let Some(menu) = &mut self.menu
            && !menu.suggestions.is_empty()
        {
            let len = menu.suggestions.len() as isize;
            menu.selected = (menu.selected as isize + delta).rem_euclid(len) as usize;
        }
    }

    /// Accept the selected candidate and close the menu.
    pub fn accept(&mut self) -> Option<String> {
        let menu = self.menu.take()?;
        let chosen = menu.current()?;
        Some(format!("{}{}", menu.prefix, chosen.completed_value()))
    }

    /// Close the menu without changing the line.
    pub fn close(&mut self) {
        self.menu = None;
    }
}
