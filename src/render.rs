//! Transcript rendering for a character terminal.
//!
//! Colors follow the kind of each line: errors red, success green, info
//! yellow, directories cyan. With color disabled the plain text is used
//! unchanged.

use vsh_core::OutputLine;
use vsh_core::autocomplete::Menu;
use vsh_core::models::{ListEntry, ListFormat, OutputLineData, TextStyle, ValueKind};

const RESET: &str = "\x1b[0m";
const BOLD_CYAN: &str = "\x1b[1;36m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const MAGENTA: &str = "\x1b[35m";

/// Erase the screen and move the cursor home.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

fn paint(code: &str, text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else {
        format!("{}{}{}", code, text, RESET)
    }
}

fn entry_name(entry: &ListEntry) -> String {
    let name = entry.display_name();
    match entry.style {
        TextStyle::Directory => paint(BOLD_CYAN, &name),
        TextStyle::File => name,
        TextStyle::Hidden => paint(DIM, &name),
    }
}

fn entry(entry: &ListEntry) -> String {
    match &entry.format {
        ListFormat::Short => entry_name(entry),
        ListFormat::Long { size } => {
            let marker = if entry.style == TextStyle::Directory {
                'd'
            } else {
                '-'
            };
            let size = size.map_or_else(|| "-".to_string(), |s| s.to_string());
            format!("{} {:>8} {}", marker, size, entry_name(entry))
        }
    }
}

/// One transcript line as terminal text, without the trailing newline.
pub fn render_line(line: &OutputLine, color: bool) -> String {
    if !color {
        return line.plain_text();
    }
    match &line.data {
        OutputLineData::Command { prompt, input } => format!("{}{}", paint(GREEN, prompt), input),
        OutputLineData::Text(text) => text.clone(),
        OutputLineData::Error(text) => paint(RED, text),
        OutputLineData::Success(text) => paint(GREEN, text),
        OutputLineData::Info(text) => paint(YELLOW, text),
        OutputLineData::Trace(text) => paint(DIM, text),
        OutputLineData::Value { kind, text } => match kind {
            ValueKind::Primitive => paint(MAGENTA, text),
            ValueKind::String => paint(GREEN, text),
            ValueKind::Structured => text.clone(),
        },
        OutputLineData::Row(entries) => entries.iter().map(entry).collect::<Vec<_>>().join("  "),
        OutputLineData::Entry(e) => entry(e),
        OutputLineData::Empty => String::new(),
    }
}

// =============================================================================
// Line Editor
// =============================================================================

/// The shell prompt, green like the echoed command lines.
pub fn render_prompt(prompt: &str, color: bool) -> String {
    if color {
        paint(GREEN, prompt)
    } else {
        prompt.to_string()
    }
}

/// Ghost text after the cursor.
pub fn render_hint(hint: &str, color: bool) -> String {
    if color {
        paint(DIM, hint)
    } else {
        hint.to_string()
    }
}

/// An open completion menu on one line, the selected entry in brackets.
pub fn render_menu(menu: &Menu) -> String {
    menu.suggestions
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if i == menu.selected {
                format!("[{}]", s.display)
            } else {
                s.display.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// Password input: one `*` per character typed.
pub fn mask(line: &str) -> String {
    "*".repeat(line.chars().count())
}
