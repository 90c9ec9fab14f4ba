//! The interactive shell: dispatcher plus modal session handling.
//!
//! [`Shell`] owns the session state, the command registry, the active
//! [`SessionMode`] and the durable storage backend. A host feeds it submitted
//! lines, control keys and [`HostEvent`]s, renders the transcript, and drains
//! the queued [`HostRequest`]s.
//!
//! In [`SessionMode::Normal`] a line goes through alias expansion,
//! redirection, history and the registry; every other mode intercepts the line
//! first.

use std::sync::LazyLock;

use chrono::{Local, Utc};
use regex::Regex;

use crate::autocomplete::{self, Completer, Menu};
use crate::commands::{
    CommandContext, CommandResult, CompletionContext, Invocation, Registry, import_state,
    render_error, reset_final_warning, run_elevated,
};
use crate::config::{MAX_AUTH_ATTEMPTS, MOTD, PERSISTED_OUTPUT_LINES, SCRIPT_EXIT_TOKEN, prompts};
use crate::error::CommandError;
use crate::host::{HostEvent, HostRequest};
use crate::models::OutputLine;
use crate::parser::{self, Redirect, RedirectMode};
use crate::script::{Interpreter, evaluate_arithmetic};
use crate::session::{AuthKind, AuthPrompt, EditorState, ResetStep, SessionMode, is_affirmative};
use crate::state::ShellState;
use crate::storage::{MemoryStorage, Snapshot, Storage};
use crate::utils::RingBuffer;
use crate::utils::format::format_number;

/// Lines the dispatcher tries as arithmetic when no command matches.
static ARITHMETIC: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[\d\s+\-*/().]+$").ok());

pub struct Shell {
    pub state: ShellState,
    registry: Registry,
    mode: SessionMode,
    completer: Completer,
    storage: Box<dyn Storage>,
    host: Vec<HostRequest>,
    /// State changed since the last [`Shell::flush`]
    dirty: bool,
}

impl Shell {
    /// Start a session from whatever `storage` holds.
    ///
    /// An unreadable or invalid snapshot is logged and replaced by a fresh
    /// session.
    pub fn new(storage: Box<dyn Storage>) -> Self {
        let mut state = ShellState::new();
        let restored = match storage.load() {
            Ok(Some(text)) => match Snapshot::parse(&text).and_then(|s| state.restore(s)) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("ignoring stored snapshot: {}", e);
                    state = ShellState::new();
                    false
                }
            },
            Ok(None) => false,
            Err(e) => {
                log::warn!("cannot load snapshot: {}", e);
                false
            }
        };
        if !restored {
            state.print_all(MOTD.lines().map(OutputLine::info));
        }
        state.storage.location = storage.describe();
        log::debug!("session started (restored: {})", restored);

        Self {
            state,
            registry: Registry::with_defaults(),
            mode: SessionMode::Normal,
            completer: Completer::new(),
            storage,
            host: Vec::new(),
            dirty: false,
        }
    }

    /// Session without durable storage.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    pub fn transcript(&self) -> &RingBuffer<OutputLine> {
        &self.state.transcript
    }

    /// Prompt for the next line: the active mode's, or `user@host:path$ `.
    pub fn prompt(&self) -> String {
        match self.mode.prompt() {
            Some(prompt) => prompt.to_string(),
            None => self.state.prompt(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Handle one submitted line in the active mode.
    pub fn submit(&mut self, line: &str) {
        self.completer.close();
        match std::mem::take(&mut self.mode) {
            SessionMode::Normal => {
                self.state.print(OutputLine::command(self.state.prompt(), line));
                if !line.trim().is_empty() {
                    self.dispatch(line);
                }
            }
            SessionMode::Scripting(interpreter) => self.submit_script(interpreter, line),
            SessionMode::Auth(prompt) => {
                // Password input is never echoed
                self.state.print(OutputLine::command(prompt.prompt.clone(), ""));
                self.resolve_auth(prompt, line);
            }
            SessionMode::ResetConfirm(step) => {
                self.state.print(OutputLine::command(step.prompt(), line));
                self.resolve_reset(step, line);
            }
            SessionMode::Editor(editor) => self.submit_editor(editor, line),
        }
        self.state.ensure_cwd();
        self.dirty = true;
    }

    /// Ctrl+C: abandon the open prompt, or cancel the line being typed.
    pub fn interrupt(&mut self) {
        self.completer.close();
        match std::mem::take(&mut self.mode) {
            SessionMode::Normal => {
                self.state.print(OutputLine::command(self.state.prompt(), "^C"));
            }
            SessionMode::Scripting(_) => {
                self.state.print(OutputLine::info("Exiting scripting mode."));
            }
            SessionMode::Auth(prompt) => {
                log::debug!("auth prompt abandoned by interrupt");
                self.state.print(OutputLine::command(prompt.prompt, "^C"));
            }
            SessionMode::ResetConfirm(_) => {
                self.state.print(OutputLine::info("Reset cancelled."));
            }
            SessionMode::Editor(mut editor) => {
                editor.exit_prompt = false;
                self.mode = SessionMode::Editor(editor);
            }
        }
    }

    fn enter(&mut self, mode: SessionMode) {
        log::debug!("mode {} -> {}", self.mode.name(), mode.name());
        self.mode = mode;
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn dispatch(&mut self, line: &str) {
        let expanded = self.state.aliases.expand(line);
        self.state.record_history(line);

        let parsed = match parser::split_redirect(&expanded) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.state.print(OutputLine::error(format!("vsh: {}", e)));
                return;
            }
        };

        let inv = Invocation::parse(&parsed.command, &self.state);
        if inv.name.is_empty() {
            return;
        }
        log::debug!("dispatch '{}' as uid {}", inv.line, inv.acting);

        let Some(command) = self.registry.get(&inv.name) else {
            self.fallback(&parsed.command, &inv.name);
            return;
        };

        self.state.stats.record_command(&inv.name);
        let mut ctx = CommandContext {
            state: &mut self.state,
            registry: &self.registry,
        };
        let result = match command.execute(&mut ctx, &inv) {
            Ok(result) => result,
            Err(e) => {
                let message = render_error(&inv.name, &e);
                self.record_failure(&message);
                CommandResult::line(OutputLine::error(message))
            }
        };
        self.apply(result, parsed.redirect.as_ref());
    }

    /// Unknown command: arithmetic when the line looks like it, else an error.
    fn fallback(&mut self, command: &str, name: &str) {
        let looks_arithmetic = ARITHMETIC.as_ref().is_some_and(|re| re.is_match(command));
        let line = if looks_arithmetic {
            match evaluate_arithmetic(command) {
                Ok(value) => OutputLine::text(format_number(value)),
                Err(e) => OutputLine::error(CommandError::Math(e).to_string()),
            }
        } else {
            OutputLine::error(CommandError::UnknownCommand(name.to_string()).to_string())
        };
        if line.is_error() {
            self.record_failure(&line.plain_text());
        }
        self.state.print(line);
    }

    fn record_failure(&mut self, message: &str) {
        let now = Utc::now().to_rfc3339();
        self.state.stats.record_error(message, now);
    }

    /// Route a handler's output and side requests.
    ///
    /// A handler that opens a prompt has not produced its output yet, so the
    /// redirect is not performed. A sudo prompt carries it to the elevated run.
    fn apply(&mut self, result: CommandResult, redirect: Option<&Redirect>) {
        let CommandResult { output, mode, host } = result;
        match (redirect, &mode) {
            (Some(redirect), None) => {
                let (errors, lines): (Vec<_>, Vec<_>) =
                    output.into_iter().partition(OutputLine::is_error);
                self.state.print_all(errors);
                self.redirect(redirect, &lines);
            }
            _ => self.state.print_all(output),
        }
        self.host.extend(host);
        if let Some(mut mode) = mode {
            if let SessionMode::Auth(AuthPrompt {
                kind: AuthKind::Sudo { redirect: deferred, .. },
                ..
            }) = &mut mode
            {
                *deferred = redirect.cloned();
            }
            self.enter(mode);
        }
    }

    /// Write plain-text output to the redirection target.
    fn redirect(&mut self, redirect: &Redirect, lines: &[OutputLine]) {
        let target = self
            .state
            .parse_args(&redirect.target)
            .into_iter()
            .next()
            .unwrap_or_else(|| redirect.target.clone());
        let path = self.state.resolve_path(&target);

        let mut content = crate::models::to_plain_text(lines);
        content.push('\n');

        let exists = self.state.fs.exists(&path);
        let fs = &mut self.state.fs;
        let result = match (exists, redirect.mode) {
            (false, _) => fs.create(&path, false, Some(&content)),
            (true, RedirectMode::Write) => fs.write_file(&path, &content),
            (true, RedirectMode::Append) => fs.append_file(&path, &content),
        };
        match result {
            Ok(()) if !exists => self.state.stats.files += 1,
            Ok(()) => {}
            Err(e) => self
                .state
                .print(OutputLine::error(format!("vsh: {}: {}", target, e))),
        }
    }

    // =========================================================================
    // Modal Prompts
    // =========================================================================

    fn submit_script(&mut self, mut interpreter: Interpreter, line: &str) {
        self.state.print(OutputLine::command(prompts::SCRIPT, line));
        if line.trim() == SCRIPT_EXIT_TOKEN {
            self.state.print(OutputLine::info("Exiting scripting mode."));
            log::debug!("mode scripting -> normal");
            return;
        }
        if !line.trim().is_empty() {
            self.state.print_all(interpreter.eval(line).into_lines());
        }
        self.mode = SessionMode::Scripting(interpreter);
    }

    fn password_matches(&self, uid: u32, input: &str) -> bool {
        self.state
            .settings
            .user(uid)
            .is_some_and(|user| user.password == input)
    }

    fn resolve_auth(&mut self, mut prompt: AuthPrompt, input: &str) {
        let acting = self.state.uid();
        let (name, verified) = match &prompt.kind {
            AuthKind::Su { target } => ("su", self.password_matches(*target, input)),
            AuthKind::Sudo { .. } => ("sudo", self.password_matches(acting, input)),
            AuthKind::PasswdCurrent { target } => ("passwd", self.password_matches(*target, input)),
            AuthKind::PasswdNew { target } => {
                let next = AuthPrompt::new(
                    AuthKind::PasswdConfirm {
                        target: *target,
                        password: input.to_string(),
                    },
                    prompts::PASSWD_CONFIRM,
                );
                self.enter(SessionMode::Auth(next));
                return;
            }
            AuthKind::PasswdConfirm { target, password } => {
                self.confirm_password(*target, password == input, password);
                return;
            }
        };

        if !verified {
            prompt.attempts += 1;
            let message = render_error(name, &CommandError::AuthFailure);
            self.record_failure(&message);
            self.state.print(OutputLine::error(message));
            if prompt.attempts < MAX_AUTH_ATTEMPTS {
                self.mode = SessionMode::Auth(prompt);
            } else {
                log::debug!("{} prompt abandoned after {} attempts", name, prompt.attempts);
                if name == "sudo" {
                    self.state.print(OutputLine::error(format!(
                        "sudo: {} incorrect password attempts",
                        prompt.attempts
                    )));
                }
            }
            return;
        }

        match prompt.kind {
            AuthKind::Su { target } => {
                self.state.switch_user(target);
                let message = format!("Switched to user {}", self.state.user_name());
                self.state.print(OutputLine::success(message));
            }
            AuthKind::Sudo { command, redirect } => {
                self.state.sudo.grant(acting, Utc::now());
                let result = run_elevated(&self.registry, &mut self.state, &command);
                self.apply(result, redirect.as_ref());
            }
            AuthKind::PasswdCurrent { target } => {
                let next = AuthPrompt::new(AuthKind::PasswdNew { target }, prompts::PASSWD_NEW);
                self.enter(SessionMode::Auth(next));
            }
            AuthKind::PasswdNew { .. } | AuthKind::PasswdConfirm { .. } => {}
        }
    }

    fn confirm_password(&mut self, target: u32, matches: bool, password: &str) {
        if !matches {
            self.state
                .print(OutputLine::error("passwd: passwords do not match"));
            return;
        }
        let Some(user) = self.state.settings.user_mut(target) else {
            return;
        };
        user.password = password.to_string();
        log::info!("password changed for {}", user.name);
        self.state
            .print(OutputLine::success("passwd: password updated successfully"));
    }

    fn resolve_reset(&mut self, step: ResetStep, answer: &str) {
        if !is_affirmative(answer) {
            self.state.print(OutputLine::info("Reset cancelled."));
            return;
        }
        match step {
            ResetStep::First => {
                self.state.print_all(reset_final_warning());
                self.enter(SessionMode::ResetConfirm(ResetStep::Final));
            }
            ResetStep::Final => self.reset(),
        }
    }

    /// Erase stored and in-memory state and ask the host to restart.
    fn reset(&mut self) {
        log::info!("terminal reset confirmed");
        if let Err(e) = self.storage.clear() {
            log::warn!("cannot clear storage: {}", e);
        }
        let location = std::mem::take(&mut self.state.storage.location);
        self.state = ShellState::new();
        self.state.storage.location = location;
        self.state
            .print(OutputLine::success("Terminal reset complete. Restarting..."));
        self.host.push(HostRequest::Restart);
    }

    // =========================================================================
    // Line Editor
    // =========================================================================

    fn submit_editor(&mut self, mut editor: EditorState, line: &str) {
        if !editor.exit_prompt {
            editor.insert(line);
            editor.newline();
            self.mode = SessionMode::Editor(editor);
            return;
        }

        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => {
                if self.save_editor(&mut editor) {
                    self.close_editor(&editor);
                } else {
                    editor.exit_prompt = false;
                    self.mode = SessionMode::Editor(editor);
                }
            }
            "n" | "no" => self.close_editor(&editor),
            _ => self.mode = SessionMode::Editor(editor),
        }
    }

    fn save_editor(&mut self, editor: &mut EditorState) -> bool {
        let created = editor.is_new;
        match editor.save(&mut self.state.fs) {
            Ok(lines) => {
                if created {
                    self.state.stats.files += 1;
                }
                self.state
                    .print(OutputLine::success(format!("[ Wrote {} lines ]", lines)));
                self.dirty = true;
                true
            }
            Err(e) => {
                self.state.print(OutputLine::error(format!(
                    "[ Error writing {}: {} ]",
                    editor.path, e
                )));
                false
            }
        }
    }

    fn close_editor(&mut self, editor: &EditorState) {
        log::debug!("editor closed: {}", editor.path);
        self.mode = SessionMode::Normal;
    }

    /// The open editor buffer, for cursor and text keys.
    pub fn editor_mut(&mut self) -> Option<&mut EditorState> {
        match &mut self.mode {
            SessionMode::Editor(editor) => Some(editor),
            _ => None,
        }
    }

    /// Ctrl+O: write the buffer.
    pub fn editor_save(&mut self) {
        if let SessionMode::Editor(mut editor) = std::mem::take(&mut self.mode) {
            self.save_editor(&mut editor);
            self.mode = SessionMode::Editor(editor);
        }
    }

    /// Ctrl+X: close a clean buffer, or ask about saving a modified one.
    pub fn editor_exit(&mut self) {
        match std::mem::take(&mut self.mode) {
            SessionMode::Editor(editor) if !editor.dirty => self.close_editor(&editor),
            SessionMode::Editor(mut editor) => {
                editor.exit_prompt = true;
                self.mode = SessionMode::Editor(editor);
            }
            other => self.mode = other,
        }
    }

    // =========================================================================
    // Completion and History
    // =========================================================================

    fn completion(&self) -> CompletionContext<'_> {
        CompletionContext {
            state: &self.state,
            registry: &self.registry,
        }
    }

    /// Tab in Normal mode; returns the new line text when it changes.
    pub fn tab(&mut self, line: &str) -> Option<String> {
        if !self.mode.is_normal() {
            return None;
        }
        let ctx = CompletionContext {
            state: &self.state,
            registry: &self.registry,
        };
        self.completer.tab(&ctx, line)
    }

    pub fn menu(&self) -> Option<&Menu> {
        self.completer.menu()
    }

    pub fn move_selection(&mut self, delta: isize) {
        self.completer.move_selection(delta);
    }

    pub fn accept_suggestion(&mut self) -> Option<String> {
        self.completer.accept()
    }

    pub fn close_menu(&mut self) {
        self.completer.close();
    }

    /// Ghost text for the line being typed.
    pub fn hint(&self, line: &str) -> Option<String> {
        if !self.mode.is_normal() || line.trim().is_empty() {
            return None;
        }
        autocomplete::hint(&self.completion(), line)
    }

    pub fn history_up(&mut self, current: &str) -> Option<String> {
        self.state.history.navigate(-1, current)
    }

    pub fn history_down(&mut self, current: &str) -> Option<String> {
        self.state.history.navigate(1, current)
    }

    // =========================================================================
    // Host Bridge
    // =========================================================================

    /// Requests queued since the last call.
    pub fn drain_host_requests(&mut self) -> Vec<HostRequest> {
        std::mem::take(&mut self.host)
    }

    /// Append the outcome of an asynchronous host action.
    pub fn host_event(&mut self, event: HostEvent) {
        let line = match event {
            HostEvent::ScreenshotSaved { filename } => {
                self.state
                    .stats
                    .record_screenshot(Local::now().format("%Y-%m-%d").to_string());
                OutputLine::success(format!("Screenshot saved as: {}", filename))
            }
            HostEvent::ScreenshotFailed { reason } => {
                OutputLine::error(format!("Screenshot failed: {}", reason))
            }
            HostEvent::StateFileLoaded { contents } => {
                import_state(&mut self.state, &contents, "selected file")
            }
            HostEvent::DownloadDone { filename } => {
                OutputLine::info(format!("Downloaded: {}", filename))
            }
        };
        self.state.print(line);
        self.dirty = true;
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Save the session if anything changed. Failures are logged and counted.
    pub fn flush(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        let text = match self.state.snapshot(PERSISTED_OUTPUT_LINES, None).to_json() {
            Ok(text) => text,
            Err(e) => {
                log::warn!("cannot serialize snapshot: {}", e);
                self.state.storage.record_failure();
                return;
            }
        };
        match self.storage.save(&text) {
            Ok(()) => self.state.storage.record_save(&text),
            Err(e) => {
                log::warn!("cannot save snapshot: {}", e);
                self.state.storage.record_failure();
            }
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(shell: &Shell) -> Vec<String> {
        shell
            .transcript()
            .iter()
            .filter(|l| !matches!(l.data, crate::models::OutputLineData::Command { .. }))
            .map(OutputLine::plain_text)
            .collect()
    }

    fn fresh() -> Shell {
        let mut shell = Shell::in_memory();
        shell.state.transcript.clear();
        shell
    }

    #[test]
    fn test_shell_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Shell>();
    }

    #[test]
    fn test_motd_on_fresh_start() {
        let shell = Shell::in_memory();
        assert_eq!(
            shell.transcript().get(0).map(OutputLine::plain_text).as_deref(),
            Some("Welcome to vsh!")
        );
    }

    #[test]
    fn test_redirect_write_and_append() {
        let mut shell = fresh();
        shell.submit("echo one > out.txt");
        shell.submit("echo two >> out.txt");
        assert_eq!(shell.state.fs.read_file("/home/user/out.txt").unwrap(), "one\ntwo\n");
        shell.submit("echo three > out.txt");
        assert_eq!(shell.state.fs.read_file("/home/user/out.txt").unwrap(), "three\n");
        assert!(plain(&shell).is_empty());
    }

    #[test]
    fn test_redirect_keeps_errors_on_screen() {
        let mut shell = fresh();
        shell.submit("cat missing > out.txt");
        assert_eq!(plain(&shell), vec!["cat: missing: No such file or directory"]);
        assert_eq!(shell.state.fs.read_file("/home/user/out.txt").unwrap(), "\n");
    }

    #[test]
    fn test_redirect_without_target() {
        let mut shell = fresh();
        shell.submit("echo hi >");
        assert_eq!(plain(&shell), vec!["vsh: syntax error near unexpected token `newline'"]);
    }

    #[test]
    fn test_unknown_command_and_arithmetic() {
        let mut shell = fresh();
        shell.submit("frob");
        shell.submit("2 + 3 * 4");
        shell.submit("2 +");
        assert_eq!(
            plain(&shell),
            vec!["frob: command not found", "14", "Math error: Invalid expression"]
        );
        assert_eq!(shell.state.stats.errors.len(), 2);
    }

    #[test]
    fn test_deeply_nested_arithmetic_is_math_error() {
        let mut shell = fresh();
        shell.submit(&format!("{}1{}", "(".repeat(2_000), ")".repeat(2_000)));
        shell.submit(&format!("{}1{}", "(".repeat(200), ")".repeat(200)));
        assert_eq!(
            plain(&shell),
            vec!["Math error: Invalid expression", "Math error: Invalid expression"]
        );
    }

    #[test]
    fn test_history_records_raw_line() {
        let mut shell = fresh();
        shell.submit("ll");
        shell.submit("frob");
        assert_eq!(shell.state.history.to_vec(), vec!["ll", "frob"]);
        assert_eq!(shell.state.stats.commands.get("ls"), Some(&1));
    }

    #[test]
    fn test_handler_error_rendered_with_name() {
        let mut shell = fresh();
        shell.submit("cd nowhere");
        assert_eq!(plain(&shell), vec!["cd: nowhere: No such file or directory"]);
        assert_eq!(shell.state.stats.errors[0].message, "cd: nowhere: No such file or directory");
    }

    #[test]
    fn test_su_with_password() {
        let mut shell = fresh();
        shell.submit("su alice");
        assert_eq!(shell.prompt(), "Password: ");
        assert!(shell.mode().is_secret());
        shell.submit("password");
        assert_eq!(shell.state.uid(), 1000);
        assert!(shell.mode().is_normal());
        assert_eq!(plain(&shell), vec!["Switched to user alice"]);
        assert!(!shell.state.history.iter().any(|l| l.contains("password")));
    }

    #[test]
    fn test_sudo_grant_skips_second_prompt() {
        let mut shell = fresh();
        shell.submit("sudo whoami");
        shell.submit("user123");
        assert_eq!(plain(&shell), vec!["root"]);
        assert_eq!(shell.state.uid(), 1001);

        shell.submit("sudo whoami");
        assert!(shell.mode().is_normal());
        assert_eq!(shell.state.stats.sudo, 2);
    }

    #[test]
    fn test_sudo_three_failures() {
        let mut shell = fresh();
        shell.submit("sudo touch /root/x");
        for _ in 0..3 {
            shell.submit("wrong");
        }
        assert!(shell.mode().is_normal());
        assert!(!shell.state.fs.exists("/root/x"));
        assert_eq!(
            plain(&shell),
            vec![
                "sudo: Authentication failure",
                "sudo: Authentication failure",
                "sudo: Authentication failure",
                "sudo: 3 incorrect password attempts",
            ]
        );
        assert!(!shell.state.sudo.is_valid(1001));
    }

    #[test]
    fn test_sudo_redirect_waits_for_password() {
        let mut shell = fresh();
        shell.submit("sudo echo hi > /tmp/x.txt");
        assert!(!shell.state.fs.exists("/tmp/x.txt"));
        for _ in 0..3 {
            shell.submit("wrong");
        }
        assert!(!shell.state.fs.exists("/tmp/x.txt"));

        let mut shell = fresh();
        shell.submit("sudo echo hi > /tmp/x.txt");
        shell.submit("user123");
        assert!(shell.mode().is_normal());
        assert_eq!(shell.state.fs.read_file("/tmp/x.txt").unwrap(), "hi\n");
        assert!(plain(&shell).is_empty());
    }

    #[test]
    fn test_interrupt_abandons_prompt() {
        let mut shell = fresh();
        shell.submit("su");
        shell.submit("nope");
        shell.interrupt();
        assert!(shell.mode().is_normal());
        assert_eq!(shell.state.uid(), 1001);
    }

    #[test]
    fn test_passwd_flow() {
        let mut shell = fresh();
        shell.submit("passwd");
        shell.submit("user123");
        assert_eq!(shell.prompt(), prompts::PASSWD_NEW);
        shell.submit("s3cret");
        assert_eq!(shell.prompt(), prompts::PASSWD_CONFIRM);
        shell.submit("s3cret");
        assert!(shell.mode().is_normal());
        assert_eq!(shell.state.settings.user(1001).unwrap().password, "s3cret");

        shell.submit("passwd");
        shell.submit("s3cret");
        shell.submit("a");
        shell.submit("b");
        assert_eq!(plain(&shell).last().unwrap(), "passwd: passwords do not match");
        assert_eq!(shell.state.settings.user(1001).unwrap().password, "s3cret");
    }

    #[test]
    fn test_reset_confirmation() {
        let mut shell = fresh();
        shell.submit("touch gone.txt");
        shell.submit("reset");
        shell.submit("no");
        assert!(shell.mode().is_normal());
        assert!(shell.state.fs.exists("/home/user/gone.txt"));

        shell.submit("reset");
        shell.submit("y");
        assert_eq!(shell.mode(), &SessionMode::ResetConfirm(ResetStep::Final));
        shell.submit("YES");
        assert!(!shell.state.fs.exists("/home/user/gone.txt"));
        assert_eq!(shell.drain_host_requests(), vec![HostRequest::Restart]);
    }

    #[test]
    fn test_editor_session() {
        let mut shell = fresh();
        shell.submit("nano notes.txt");
        shell.submit("first");
        shell.editor_mut().unwrap().insert("second");
        shell.editor_exit();
        assert_eq!(shell.prompt(), prompts::EDITOR_EXIT);
        shell.interrupt();
        assert_eq!(shell.prompt(), "");
        shell.editor_exit();
        shell.submit("y");
        assert!(shell.mode().is_normal());
        assert_eq!(
            shell.state.fs.read_file("/home/user/notes.txt").unwrap(),
            "first\nsecond"
        );
        assert_eq!(plain(&shell).last().unwrap(), "[ Wrote 2 lines ]");
    }

    #[test]
    fn test_editor_discard() {
        let mut shell = fresh();
        shell.submit("nano Desktop/document.txt");
        shell.submit("junk");
        shell.editor_exit();
        shell.submit("n");
        assert!(shell.mode().is_normal());
        assert_eq!(
            shell.state.fs.read_file("/home/user/Desktop/document.txt").unwrap(),
            "Hello World!"
        );
    }

    #[test]
    fn test_scripting_mode() {
        let mut shell = fresh();
        shell.submit("script");
        shell.submit("let x = 20");
        shell.submit("x + 1");
        shell.submit(".exit");
        assert!(shell.mode().is_normal());
        assert!(plain(&shell).contains(&"21".to_string()));
    }

    #[test]
    fn test_flush_saves_once() {
        let mut shell = fresh();
        shell.flush();
        assert_eq!(shell.state.storage.saves, 0);
        shell.submit("pwd");
        shell.flush();
        shell.flush();
        assert_eq!(shell.state.storage.saves, 1);
        assert!(shell.state.storage.fingerprint.is_some());
    }

    #[test]
    fn test_storage_failure_is_counted() {
        let mut shell = Shell::new(Box::new(MemoryStorage::unavailable()));
        shell.submit("pwd");
        shell.flush();
        assert_eq!(shell.state.storage.failures, 1);
        assert_eq!(shell.state.cwd, "/home/user");
    }

    #[test]
    fn test_restore_from_storage() {
        let mut first = fresh();
        first.submit("mkdir kept");
        first.submit("cd kept");
        let text = first.state.snapshot(PERSISTED_OUTPUT_LINES, None).to_json().unwrap();

        let second = Shell::new(Box::new(MemoryStorage::with_data(text)));
        assert_eq!(second.state.cwd, "/home/user/kept");
        assert_eq!(second.state.history.to_vec(), vec!["mkdir kept", "cd kept"]);
    }

    #[test]
    fn test_corrupt_storage_starts_fresh() {
        let shell = Shell::new(Box::new(MemoryStorage::with_data("not json")));
        assert_eq!(shell.state.cwd, "/home/user");
        assert!(!shell.transcript().is_empty());
    }

    #[test]
    fn test_partial_snapshot_starts_fresh() {
        let mut first = fresh();
        first.submit("mkdir kept");
        first.submit("cd kept");
        let text = first.state.snapshot(PERSISTED_OUTPUT_LINES, None).to_json().unwrap();

        for field in ["fileSystem", "settings", "version"] {
            let mut json: serde_json::Value = serde_json::from_str(&text).unwrap();
            json.as_object_mut().unwrap().remove(field);
            let shell = Shell::new(Box::new(MemoryStorage::with_data(json.to_string())));
            assert_eq!(shell.state.cwd, "/home/user", "restored without {}", field);
            assert!(!shell.state.fs.exists("/home/user/kept"));
            assert!(shell.state.history.is_empty());
        }
    }

    #[test]
    fn test_host_events() {
        let mut shell = fresh();
        shell.submit("screenshot");
        assert_eq!(shell.drain_host_requests(), vec![HostRequest::Screenshot]);
        shell.host_event(HostEvent::ScreenshotSaved {
            filename: "shot.png".into(),
        });
        assert_eq!(shell.state.stats.screenshots.values().sum::<u64>(), 1);
        assert_eq!(plain(&shell).last().unwrap(), "Screenshot saved as: shot.png");
    }

    #[test]
    fn test_tab_completion() {
        let mut shell = fresh();
        assert_eq!(shell.tab("pw").as_deref(), Some("pwd "));
        assert_eq!(shell.tab("cd Des").as_deref(), Some("cd Desktop/"));
        assert_eq!(shell.hint("whoa"), Some("mi".to_string()));
    }
}
