//! Alias table and its `.bash_aliases` file format.
//!
//! File format: one `alias NAME='VALUE'` per line. Blank lines and lines
//! starting with `#` are ignored; surrounding quotes are stripped.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::parser;

static ALIAS_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^alias\s+([^=\s]+)=(.*)$").ok());

/// Name to replacement map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the content of an alias file, skipping lines that do not match.
    pub fn parse(text: &str) -> Self {
        let mut table = Self::new();
        let Some(re) = ALIAS_LINE.as_ref() else {
            return table;
        };
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(caps) = re.captures(line) {
                table.set(&caps[1], strip_quotes(caps[2].trim()));
            }
        }
        table
    }

    /// Render the table in alias file format.
    pub fn to_file(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("alias {}='{}'\n", name, value))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.entries.insert(name.to_string(), value.to_string());
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries.clone()
    }

    /// Replace a leading alias with its value, keeping the arguments.
    ///
    /// Expansion happens once: the replacement is not looked up again.
    pub fn expand(&self, line: &str) -> String {
        let trimmed = line.trim();
        let name = parser::first_word(trimmed);
        match self.get(name) {
            Some(value) => {
                let rest = parser::rest_of(trimmed);
                if rest.is_empty() {
                    value.to_string()
                } else {
                    format!("{} {}", value, rest)
                }
            }
            None => trimmed.to_string(),
        }
    }
}

impl From<BTreeMap<String, String>> for AliasTable {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

/// Strip one pair of matching surrounding quotes.
pub fn strip_quotes(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
