//! Modal session state.
//!
//! Exactly one [`SessionMode`] is active at a time. Every mode other than
//! [`SessionMode::Normal`] intercepts submitted lines before the dispatcher
//! sees them.

mod editor;
mod sudo;

pub use editor::EditorState;
pub use sudo::{SudoCache, SudoGrant};

use crate::config::prompts;
use crate::parser::Redirect;
use crate::script::Interpreter;

/// Deferred action guarded by a password prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthKind {
    /// Switch to `target` once its password is given
    Su { target: u32 },
    /// Run `command` as root once the acting user's password is given,
    /// sending its output to `redirect` if the line had one
    Sudo {
        command: String,
        redirect: Option<Redirect>,
    },
    PasswdCurrent { target: u32 },
    PasswdNew { target: u32 },
    /// Commit `password` if it is typed again identically
    PasswdConfirm { target: u32, password: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthPrompt {
    pub kind: AuthKind,
    pub prompt: String,
    pub attempts: u8,
}

impl AuthPrompt {
    pub fn new(kind: AuthKind, prompt: impl Into<String>) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            attempts: 0,
        }
    }

    /// Prompt for `su` into `target`.
    pub fn su(target: u32) -> Self {
        Self::new(AuthKind::Su { target }, prompts::SU)
    }

    /// Prompt on behalf of `user_name` before running `command` as root.
    pub fn sudo(user_name: &str, command: impl Into<String>) -> Self {
        Self::new(
            AuthKind::Sudo {
                command: command.into(),
                redirect: None,
            },
            format!("[sudo] password for {}: ", user_name),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStep {
    First,
    Final,
}

impl ResetStep {
    pub fn prompt(self) -> &'static str {
        match self {
            Self::First => prompts::RESET_FIRST,
            Self::Final => prompts::RESET_FINAL,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionMode {
    #[default]
    Normal,
    Scripting(Interpreter),
    Auth(AuthPrompt),
    ResetConfirm(ResetStep),
    Editor(EditorState),
}

impl SessionMode {
    pub fn is_normal(&self) -> bool {
        matches!(self, Self::Normal)
    }

    /// Whether typed input must be masked.
    pub fn is_secret(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Prompt to show in place of the shell prompt, if any.
    pub fn prompt(&self) -> Option<&str> {
        match self {
            Self::Normal => None,
            Self::Scripting(_) => Some(prompts::SCRIPT),
            Self::Auth(auth) => Some(&auth.prompt),
            Self::ResetConfirm(step) => Some(step.prompt()),
            Self::Editor(editor) if editor.exit_prompt => Some(prompts::EDITOR_EXIT),
            Self::Editor(_) => Some(""),
        }
    }

    /// Short name for log records.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Scripting(_) => "scripting",
            Self::Auth(_) => "auth",
            Self::ResetConfirm(_) => "reset-confirm",
            Self::Editor(_) => "editor",
        }
    }
}

/// Literal `y`/`yes`, case-insensitive.
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affirmative() {
        assert!(is_affirmative("y"));
        assert!(is_affirmative("YES"));
        assert!(is_affirmative(" Yes "));
        assert!(!is_affirmative("yep"));
        assert!(!is_affirmative(""));
    }

    #[test]
    fn test_mode_prompts() {
        assert_eq!(SessionMode::Normal.prompt(), None);
        assert_eq!(
            SessionMode::ResetConfirm(ResetStep::First).prompt(),
            Some("Reset Warning [y/N]: ")
        );
        let mode = SessionMode::Auth(AuthPrompt::sudo("user", "ls"));
        assert_eq!(mode.prompt(), Some("[sudo] password for user: "));
        assert!(mode.is_secret());
    }

    #[test]
    fn test_default_is_normal() {
        assert!(SessionMode::default().is_normal());
    }
}
