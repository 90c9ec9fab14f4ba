//! Transcript records produced by commands and prompts.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

/// Text styling for file listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextStyle {
    /// Directory entries
    Directory,
    /// Regular file entries
    File,
    /// Dotfiles
    Hidden,
}

/// Layout of a listing entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListFormat {
    /// Bare name (`ls`, `ls -F`)
    Short,
    /// Type marker and byte size before the name (`ls -l`)
    Long { size: Option<usize> },
}

/// One entry of a directory listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub name: String,
    pub style: TextStyle,
    /// Append `/` to directory names.
    pub classify: bool,
    pub format: ListFormat,
}

impl ListEntry {
    /// Name with the classification suffix applied.
    pub fn display_name(&self) -> String {
        if self.classify && self.style == TextStyle::Directory {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }

    fn plain_text(&self) -> String {
        match &self.format {
            ListFormat::Short => self.display_name(),
            ListFormat::Long { size } => {
                let marker = if self.style == TextStyle::Directory {
                    'd'
                } else {
                    '-'
                };
                let size = size.map_or_else(|| "-".to_string(), |s| s.to_string());
                format!("{} {:>8} {}", marker, size, self.display_name())
            }
        }
    }
}

/// Rendering hint for values printed by the scripting evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Numbers and booleans
    Primitive,
    String,
    /// Arrays and objects
    Structured,
}

/// A single transcript record with a unique ID.
///
/// The ID lets hosts key their rendering; equality only compares the data.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "OutputLineData", into = "OutputLineData")]
pub struct OutputLine {
    pub id: usize,
    pub data: OutputLineData,
}

/// The content of a transcript record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum OutputLineData {
    /// Echo of a submitted line with the prompt it was entered at
    Command { prompt: String, input: String },
    Text(String),
    Error(String),
    Success(String),
    Info(String),
    /// Output captured from `print`/`console.log` in scripting mode
    Trace(String),
    /// Final value of a scripting expression
    Value { kind: ValueKind, text: String },
    /// Several listing entries on one line
    Row(Vec<ListEntry>),
    /// A listing entry on its own line
    Entry(ListEntry),
    Empty,
}

static OUTPUT_LINE_COUNTER: AtomicUsize = AtomicUsize::new(0);

impl From<OutputLineData> for OutputLine {
    fn from(data: OutputLineData) -> Self {
        Self {
            id: OUTPUT_LINE_COUNTER.fetch_add(1, Ordering::Relaxed),
            data,
        }
    }
}

impl From<OutputLine> for OutputLineData {
    fn from(line: OutputLine) -> Self {
        line.data
    }
}

impl PartialEq for OutputLine {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl OutputLine {
    pub fn text(s: impl Into<String>) -> Self {
        OutputLineData::Text(s.into()).into()
    }

    pub fn error(s: impl Into<String>) -> Self {
        OutputLineData::Error(s.into()).into()
    }

    pub fn success(s: impl Into<String>) -> Self {
        OutputLineData::Success(s.into()).into()
    }

    pub fn info(s: impl Into<String>) -> Self {
        OutputLineData::Info(s.into()).into()
    }

    pub fn trace(s: impl Into<String>) -> Self {
        OutputLineData::Trace(s.into()).into()
    }

    pub fn value(kind: ValueKind, text: impl Into<String>) -> Self {
        OutputLineData::Value {
            kind,
            text: text.into(),
        }
        .into()
    }

    pub fn command(prompt: impl Into<String>, input: impl Into<String>) -> Self {
        OutputLineData::Command {
            prompt: prompt.into(),
            input: input.into(),
        }
        .into()
    }

    pub fn row(entries: Vec<ListEntry>) -> Self {
        OutputLineData::Row(entries).into()
    }

    pub fn entry(entry: ListEntry) -> Self {
        OutputLineData::Entry(entry).into()
    }

    pub fn empty() -> Self {
        OutputLineData::Empty.into()
    }

    /// Render the record without any styling, as redirection writes it.
    pub fn plain_text(&self) -> String {
        match &self.data {
            OutputLineData::Command { prompt, input } => format!("{}{}", prompt, input),
            OutputLineData::Text(s)
            | OutputLineData::Error(s)
            | OutputLineData::Success(s)
            | OutputLineData::Info(s)
            | OutputLineData::Trace(s) => s.clone(),
            OutputLineData::Value { text, .. } => text.clone(),
            OutputLineData::Row(entries) => entries
                .iter()
                .map(ListEntry::plain_text)
                .collect::<Vec<_>>()
                .join("  "),
            OutputLineData::Entry(entry) => entry.plain_text(),
            OutputLineData::Empty => String::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.data, OutputLineData::Error(_))
    }
}

/// Join records into plain text, one record per line.
pub fn to_plain_text(lines: &[OutputLine]) -> String {
    lines
        .iter()
        .map(OutputLine::plain_text)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, style: TextStyle, classify: bool, format: ListFormat) -> ListEntry {
        ListEntry {
            name: name.to_string(),
            style,
            classify,
            format,
        }
    }

    #[test]
    fn test_output_line_constructors() {
        assert_eq!(
            OutputLine::text("hello").data,
            OutputLineData::Text("hello".to_string())
        );
        assert_eq!(
            OutputLine::error("error").data,
            OutputLineData::Error("error".to_string())
        );
        assert_eq!(
            OutputLine::trace("log").data,
            OutputLineData::Trace("log".to_string())
        );
    }

    #[test]
    fn test_unique_ids() {
        let line1 = OutputLine::text("first");
        let line2 = OutputLine::text("first");
        assert_ne!(line1.id, line2.id);
        assert_eq!(line1, line2);
    }

    #[test]
    fn test_plain_text_row() {
        let line = OutputLine::row(vec![
            entry("docs", TextStyle::Directory, true, ListFormat::Short),
            entry("a.txt", TextStyle::File, true, ListFormat::Short),
        ]);
        assert_eq!(line.plain_text(), "docs/  a.txt");
    }

    #[test]
    fn test_plain_text_long_entry() {
        let line = OutputLine::entry(entry(
            "a.txt",
            TextStyle::File,
            false,
            ListFormat::Long { size: Some(12) },
        ));
        assert_eq!(line.plain_text(), "-       12 a.txt");
    }

    #[test]
    fn test_plain_text_joins_lines() {
        let lines = vec![OutputLine::text("a"), OutputLine::empty(), OutputLine::text("b")];
        assert_eq!(to_plain_text(&lines), "a\n\nb");
    }

    #[test]
    fn test_serde_kind_content_shape() {
        let json = serde_json::to_string(&OutputLine::error("boom")).unwrap();
        assert_eq!(json, r#"{"kind":"error","content":"boom"}"#);

        let line: OutputLine = serde_json::from_str(&json).unwrap();
        assert_eq!(line.data, OutputLineData::Error("boom".to_string()));
    }
}
