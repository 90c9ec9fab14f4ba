//! Command line parsing.
//!
//! Supports:
//! - Output redirection: `cmd > file`, `cmd >> file` (outside quotes only)
//! - Variable expansion: `$VAR`, `${VAR}`
//! - Quote handling: `"string with spaces"`, `'literal string'`

mod expand;
mod lexer;

pub use lexer::{Lexer, Token, VarLookup};

use expand::expand_tokens;
use thiserror::Error;

// =============================================================================
// Parse Error
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// `ls >` with nothing after the operator
    #[error("syntax error near unexpected token `newline'")]
    MissingRedirectTarget,
}

// =============================================================================
// Redirection
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    /// `>`: create or overwrite
    Write,
    /// `>>`: append
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub mode: RedirectMode,
    pub target: String,
}

/// A submitted line split into the command portion and its redirection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub command: String,
    pub redirect: Option<Redirect>,
}

/// Split off output redirection.
///
/// The first `>` outside quotes starts the redirection; a doubled `>>`
/// appends. The target is the first word after the operator.
pub fn split_redirect(line: &str) -> Result<CommandLine, ParseError> {
    let Some(pos) = find_unquoted(line, '>') else {
        return Ok(CommandLine {
            command: line.trim().to_string(),
            redirect: None,
        });
    };

    let (mode, target_start) = if line[pos + 1..].starts_with('>') {
        (RedirectMode::Append, pos + 2)
    } else {
        (RedirectMode::Write, pos + 1)
    };

    let target = Lexer::new(&line[target_start..])
        .find_map(|token| match token {
            Token::Word(w) if !w.is_empty() => Some(w),
            Token::Variable(name) => Some(format!("${}", name)),
            Token::Word(_) => None,
        })
        .ok_or(ParseError::MissingRedirectTarget)?;

    Ok(CommandLine {
        command: line[..pos].trim().to_string(),
        redirect: Some(Redirect { mode, target }),
    })
}

/// Byte offset of the first `needle` not inside single or double quotes.
fn find_unquoted(line: &str, needle: char) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' && q == '"' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == needle => return Some(i),
            None => {}
        }
    }
    None
}

// =============================================================================
// Arguments
// =============================================================================

/// Tokenize a command portion into words, expanding variables.
pub fn parse_args(line: &str, vars: VarLookup<'_>) -> Vec<String> {
    let tokens = Lexer::with_vars(line, vars).tokenize();
    expand_tokens(tokens, vars)
}

/// First whitespace-delimited word of a line.
pub fn first_word(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or("")
}

/// Raw text after the first word, with leading whitespace removed.
pub fn rest_of(line: &str) -> &str {
    let trimmed = line.trim_start();
    match trimmed.find(char::is_whitespace) {
        Some(end) => trimmed[end..].trim_start(),
        None => "",
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn no_vars(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_no_redirect() {
        let parsed = split_redirect("  ls -la ").unwrap();
        assert_eq!(parsed.command, "ls -la");
        assert_eq!(parsed.redirect, None);
    }

    #[test]
    fn test_write_redirect() {
        let parsed = split_redirect("echo hello > a.txt").unwrap();
        assert_eq!(parsed.command, "echo hello");
        assert_eq!(
            parsed.redirect,
            Some(Redirect {
                mode: RedirectMode::Write,
                target: "a.txt".to_string()
            })
        );
    }

    #[test]
    fn test_append_checked_first() {
        let parsed = split_redirect("echo hi >> log.txt").unwrap();
        assert_eq!(parsed.command, "echo hi");
        assert_eq!(parsed.redirect.unwrap().mode, RedirectMode::Append);
    }

    #[test]
    fn test_quoted_operator_ignored() {
        let parsed = split_redirect(r#"echo "a > b" > out"#).unwrap();
        assert_eq!(parsed.command, r#"echo "a > b""#);
        assert_eq!(parsed.redirect.unwrap().target, "out");
    }

    #[test]
    fn test_quoted_target() {
        let parsed = split_redirect("echo x > 'my file'").unwrap();
        assert_eq!(parsed.redirect.unwrap().target, "my file");
    }

    #[test]
    fn test_missing_target() {
        assert_eq!(
            split_redirect("echo x >"),
            Err(ParseError::MissingRedirectTarget)
        );
    }

    #[test]
    fn test_parse_args_quotes() {
        let args = parse_args(r#"echo "hello world" 'x'"#, &no_vars);
        assert_eq!(args, vec!["echo", "hello world", "x"]);
    }

    #[test]
    fn test_first_word_and_rest() {
        assert_eq!(first_word("  alias ll='ls -la'"), "alias");
        assert_eq!(rest_of("  alias ll='ls -la'"), "ll='ls -la'");
        assert_eq!(rest_of("pwd"), "");
        assert_eq!(first_word(""), "");
    }
}
