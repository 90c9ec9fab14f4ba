//! Interactive line editing on a terminal.
//!
//! [`ShellHelper`] answers Tab and ghost-text queries from the shell and masks
//! what is typed at a password prompt. Up, Down and Enter are bound to the
//! shell's history and completion menu; Ctrl+O and Ctrl+X drive the editor.

use std::borrow::Cow;
use std::cell::RefCell;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context as _;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hint, Hinter};
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, CompletionType, ConditionalEventHandler, Config, Context, Editor, Event, EventContext,
    EventHandler, Helper, KeyCode, KeyEvent, Modifiers, Movement, RepeatCount,
};
use vsh_core::Shell;

use crate::app::{App, EditorKey, SharedShell, lock};
use crate::render::{mask, render_hint, render_menu, render_prompt};

// =============================================================================
// Helper
// =============================================================================

/// Ghost text after the cursor. Menu listings are shown but never inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellHint {
    text: String,
    insertable: bool,
}

impl Hint for ShellHint {
    fn display(&self) -> &str {
        &self.text
    }

    fn completion(&self) -> Option<&str> {
        self.insertable.then_some(self.text.as_str())
    }
}

pub struct ShellHelper {
    shell: SharedShell,
    color: bool,
    /// Line the completion menu was opened on; editing it closes the menu
    menu_line: RefCell<Option<String>>,
}

impl ShellHelper {
    pub fn new(shell: SharedShell, color: bool) -> Self {
        Self {
            shell,
            color,
            menu_line: RefCell::new(None),
        }
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let typed = &line[..pos];
        let mut shell = lock(&self.shell);
        let replacement = match shell.tab(typed) {
            Some(text) => text,
            // Tab moved the menu selection; redraw so the hint follows it
            None if shell.menu().is_some() => typed.to_string(),
            None => return Ok((pos, Vec::new())),
        };
        *self.menu_line.borrow_mut() = shell.menu().map(|_| replacement.clone());
        Ok((
            0,
            vec![Pair {
                display: replacement.clone(),
                replacement,
            }],
        ))
    }
}

impl Hinter for ShellHelper {
    type Hint = ShellHint;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<ShellHint> {
        let mut shell = lock(&self.shell);
        if shell.menu().is_some() && self.menu_line.borrow().as_deref() != Some(line) {
            shell.close_menu();
        }
        if let Some(menu) = shell.menu() {
            return Some(ShellHint {
                text: format!("   {}", render_menu(menu)),
                insertable: false,
            });
        }
        if pos < line.len() {
            return None;
        }
        shell.hint(line).map(|text| ShellHint {
            text,
            insertable: true,
        })
    }
}

impl Highlighter for ShellHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if lock(&self.shell).mode().is_secret() {
            Cow::Owned(mask(line))
        } else {
            Cow::Borrowed(line)
        }
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(&'s self, prompt: &'p str, default: bool) -> Cow<'b, str> {
        if default && self.color && lock(&self.shell).mode().is_normal() {
            Cow::Owned(render_prompt(prompt, true))
        } else {
            Cow::Borrowed(prompt)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        if self.color {
            Cow::Owned(render_hint(hint, true))
        } else {
            Cow::Borrowed(hint)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        // Redraw every keystroke at a password prompt so the mask is applied
        lock(&self.shell).mode().is_secret()
    }
}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}

// =============================================================================
// Key Bindings
// =============================================================================

/// Keys routed to the shell instead of rustyline's defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Up,
    Down,
    Enter,
    Editor(EditorKey),
}

/// Editor key pressed during the current `readline` call.
type PendingKey = Arc<Mutex<Option<EditorKey>>>;

/// New input line for a navigation key, or `None` to leave the key to
/// rustyline.
///
/// With the completion menu open, Up and Down move the selection and Enter
/// accepts it; otherwise Up and Down walk the shell history.
fn navigate(shell: &mut Shell, key: Key, line: &str) -> Option<String> {
    if !shell.mode().is_normal() {
        return None;
    }
    let menu_open = shell.menu().is_some();
    match key {
        Key::Up | Key::Down if menu_open => {
            shell.move_selection(if key == Key::Up { -1 } else { 1 });
            Some(line.to_string())
        }
        Key::Enter if menu_open => shell.accept_suggestion(),
        Key::Up => shell.history_up(line),
        Key::Down => shell.history_down(line),
        Key::Enter | Key::Editor(_) => None,
    }
}

struct KeyHandler {
    key: Key,
    shell: SharedShell,
    pending: PendingKey,
}

impl ConditionalEventHandler for KeyHandler {
    fn handle(&self, _evt: &Event, _n: RepeatCount, _positive: bool, ctx: &EventContext) -> Option<Cmd> {
        let mut shell = lock(&self.shell);
        if let Key::Editor(key) = self.key {
            shell.editor_mut()?;
            *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(key);
            return Some(Cmd::AcceptLine);
        }
        navigate(&mut shell, self.key, ctx.line())
            .map(|line| Cmd::Replace(Movement::WholeLine, Some(line)))
    }
}

fn bind_keys(rl: &mut Editor<ShellHelper, DefaultHistory>, shell: &SharedShell, pending: &PendingKey) {
    let bindings = [
        (KeyEvent(KeyCode::Up, Modifiers::NONE), Key::Up),
        (KeyEvent(KeyCode::Down, Modifiers::NONE), Key::Down),
        (KeyEvent(KeyCode::Enter, Modifiers::NONE), Key::Enter),
        (KeyEvent::ctrl('O'), Key::Editor(EditorKey::Save)),
        (KeyEvent::ctrl('X'), Key::Editor(EditorKey::Exit)),
    ];
    for (event, key) in bindings {
        let handler = KeyHandler {
            key,
            shell: Arc::clone(shell),
            pending: Arc::clone(pending),
        };
        rl.bind_sequence(event, EventHandler::Conditional(Box::new(handler)));
    }
}

// =============================================================================
// Loop
// =============================================================================

/// Drive `app` from the terminal until `exit` or end of input.
pub fn run<W: Write>(app: &mut App<W>) -> anyhow::Result<()> {
    let config = Config::builder()
        .completion_type(CompletionType::List)
        .auto_add_history(false)
        .build();
    let mut rl: Editor<ShellHelper, DefaultHistory> =
        Editor::with_config(config).context("failed to create line editor")?;
    rl.set_helper(Some(ShellHelper::new(app.shared(), app.options().color)));
    let pending = PendingKey::default();
    bind_keys(&mut rl, &app.shared(), &pending);

    app.render_new().context("failed to write output")?;
    while !app.is_closed() {
        let prompt = app.prompt();
        let step = match rl.readline(&prompt) {
            Ok(line) => {
                let key = pending.lock().unwrap_or_else(PoisonError::into_inner).take();
                match key {
                    Some(key) => app.editor_key(key, &line),
                    None => app.handle(&line),
                }
            }
            Err(ReadlineError::Interrupted) => app.interrupt(),
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read input"),
        };
        step.context("failed to write output")?;
    }
    app.shell().flush();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helper() -> ShellHelper {
        let mut shell = Shell::in_memory();
        shell.submit("mkdir projects");
        ShellHelper::new(Arc::new(Mutex::new(shell)), false)
    }

    fn complete(helper: &ShellHelper, line: &str) -> Vec<String> {
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);
        let (start, pairs) = helper.complete(line, line.len(), &ctx).unwrap();
        assert_eq!(start, if pairs.is_empty() { line.len() } else { 0 });
        pairs.into_iter().map(|p| p.replacement).collect()
    }

    fn hint(helper: &ShellHelper, line: &str) -> Option<ShellHint> {
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);
        helper.hint(line, line.len(), &ctx)
    }

    #[test]
    fn test_tab_completes_line() {
        let helper = helper();
        assert_eq!(complete(&helper, "cd pro"), vec!["cd projects/"]);
        assert_eq!(complete(&helper, "zzz"), Vec::<String>::new());
    }

    #[test]
    fn test_menu_shown_as_hint() {
        let helper = helper();
        assert_eq!(complete(&helper, "cd D"), vec!["cd D"]);
        let shown = hint(&helper, "cd D").unwrap();
        assert_eq!(shown.display(), "   [Desktop/]  Documents/");
        assert_eq!(shown.completion(), None);

        assert_eq!(complete(&helper, "cd D"), vec!["cd D"]);
        assert_eq!(hint(&helper, "cd D").unwrap().display(), "   Desktop/  [Documents/]");

        assert_eq!(hint(&helper, "cd Do").map(|h| h.text), Some("cuments/".to_string()));
        assert!(lock(&helper.shell).menu().is_none());
    }

    #[test]
    fn test_hint_is_insertable() {
        let helper = helper();
        let shown = hint(&helper, "whoa").unwrap();
        assert_eq!(shown.completion(), Some("mi"));

        let history = DefaultHistory::new();
        let ctx = Context::new(&history);
        assert_eq!(helper.hint("whoa", 2, &ctx), None);
    }

    #[test]
    fn test_password_is_masked() {
        let helper = helper();
        assert_eq!(helper.highlight("secret", 6), "secret");
        assert!(!helper.highlight_char("secret", 6, false));

        lock(&helper.shell).submit("su");
        assert!(lock(&helper.shell).mode().is_secret());
        assert_eq!(helper.highlight("secret", 6), "******");
        assert!(helper.highlight_char("secret", 6, false));
        assert_eq!(hint(&helper, "whoa"), None);
    }

    #[test]
    fn test_arrows_walk_history() {
        let mut shell = Shell::in_memory();
        shell.submit("echo one");
        shell.submit("echo two");
        assert_eq!(navigate(&mut shell, Key::Up, "").as_deref(), Some("echo two"));
        assert_eq!(navigate(&mut shell, Key::Up, "echo two").as_deref(), Some("echo one"));
        assert_eq!(navigate(&mut shell, Key::Down, "echo one").as_deref(), Some("echo two"));
        assert_eq!(navigate(&mut shell, Key::Enter, "echo two"), None);
    }

    #[test]
    fn test_arrows_drive_menu() {
        let mut shell = Shell::in_memory();
        assert_eq!(shell.tab("cd D"), None);
        assert_eq!(navigate(&mut shell, Key::Down, "cd D").as_deref(), Some("cd D"));
        assert_eq!(shell.menu().map(|m| m.selected), Some(1));
        assert_eq!(navigate(&mut shell, Key::Up, "cd D").as_deref(), Some("cd D"));
        assert_eq!(navigate(&mut shell, Key::Up, "cd D").as_deref(), Some("cd D"));
        assert_eq!(navigate(&mut shell, Key::Enter, "cd D").as_deref(), Some("cd Documents/"));
        assert!(shell.menu().is_none());
    }

    #[test]
    fn test_keys_ignored_at_prompts() {
        let mut shell = Shell::in_memory();
        shell.submit("echo one");
        shell.submit("su");
        assert_eq!(navigate(&mut shell, Key::Up, ""), None);
    }
}
