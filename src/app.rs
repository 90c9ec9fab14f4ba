//! Terminal front end shared by the interactive editor and piped input.
//!
//! [`App`] feeds lines and keys to a [`Shell`], prints whatever the transcript
//! gained, carries out the host requests the shell queued and saves the
//! session after every step. Piped input goes through [`App::run`]; a terminal
//! is driven by [`crate::repl`].

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use vsh_core::models::{OutputLineData, to_plain_text};
use vsh_core::{HostEvent, HostRequest, OutputLine, SessionMode, Shell};

use crate::config::{
    EDITOR_EXIT_LINE, EDITOR_HINT, EDITOR_SAVE_LINE, INTERRUPT_LINE, PICK_STATE_PROMPT,
    SCREENSHOT_PREFIX,
};
use crate::render::{CLEAR_SCREEN, render_line};

/// The shell, reachable from the line editor's key handlers.
pub type SharedShell = Arc<Mutex<Shell>>;

/// Lock the shell. A handler that panicked mid-call leaves the session as it
/// was, so a poisoned lock is still usable.
pub fn lock(shell: &SharedShell) -> MutexGuard<'_, Shell> {
    shell.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Editor keys that act on the buffer rather than submit a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKey {
    /// Ctrl+O
    Save,
    /// Ctrl+X
    Exit,
}

/// How the front end talks to the terminal.
#[derive(Debug, Clone)]
pub struct Options {
    /// Emit ANSI colors
    pub color: bool,
    /// Print the echo of each submitted line (off when the terminal
    /// already shows what was typed)
    pub echo: bool,
    /// Clear the screen on `clear`/restart
    pub interactive: bool,
    /// Where downloads and screenshots are written
    pub download_dir: PathBuf,
}

pub struct App<W: Write> {
    shell: SharedShell,
    out: W,
    options: Options,
    /// ID of the last transcript line written to `out`
    last_id: Option<usize>,
    /// The next line is a snapshot path for `load-state`
    picking_state: bool,
    closed: bool,
}

impl<W: Write> App<W> {
    pub fn new(shell: Shell, out: W, options: Options) -> Self {
        Self {
            shell: Arc::new(Mutex::new(shell)),
            out,
            options,
            last_id: None,
            picking_state: false,
            closed: false,
        }
    }

    pub fn shell(&self) -> MutexGuard<'_, Shell> {
        lock(&self.shell)
    }

    pub fn shared(&self) -> SharedShell {
        Arc::clone(&self.shell)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Prompt for the next line.
    pub fn prompt(&self) -> String {
        if self.picking_state {
            PICK_STATE_PROMPT.to_string()
        } else {
            self.shell().prompt()
        }
    }

    /// Treat the current transcript as already shown.
    pub fn mark_seen(&mut self) {
        let last_id = self.shell().transcript().last().map(|l| l.id);
        self.last_id = last_id;
    }

    pub fn into_output(self) -> W {
        self.out
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Read piped lines until end of input or until the shell asks to close.
    pub fn run(&mut self, input: impl BufRead) -> anyhow::Result<()> {
        self.render_new().context("failed to write output")?;
        for line in input.lines() {
            if self.closed {
                break;
            }
            let line = line.context("failed to read input")?;
            self.handle(&line).context("failed to write output")?;
        }
        self.shell().flush();
        Ok(())
    }

    /// Process one input line.
    ///
    /// Piped input cannot carry control keys, so `^C`, `^O` and `^X` typed
    /// on a line of their own stand in for them.
    pub fn handle(&mut self, line: &str) -> io::Result<()> {
        let line = line.trim_end_matches(['\n', '\r']);
        if std::mem::take(&mut self.picking_state) {
            return self.step(|app| app.load_state_file(line.trim()));
        }
        match line.trim() {
            INTERRUPT_LINE => self.interrupt(),
            EDITOR_SAVE_LINE if self.editing() => self.editor_key(EditorKey::Save, ""),
            EDITOR_EXIT_LINE if self.editing() => self.editor_key(EditorKey::Exit, ""),
            _ => self.step(|app| {
                app.shell().submit(line);
                Ok(())
            }),
        }
    }

    /// Ctrl+C.
    pub fn interrupt(&mut self) -> io::Result<()> {
        self.picking_state = false;
        self.step(|app| {
            app.shell().interrupt();
            Ok(())
        })
    }

    /// An editor key pressed with `typed` still on the input line.
    ///
    /// The typed text joins the buffer first, so Ctrl+O right after typing
    /// saves it too.
    pub fn editor_key(&mut self, key: EditorKey, typed: &str) -> io::Result<()> {
        self.step(|app| {
            let mut shell = app.shell();
            if let Some(editor) = shell.editor_mut()
                && !editor.exit_prompt
            {
                editor.insert(typed);
            }
            match key {
                EditorKey::Save => shell.editor_save(),
                EditorKey::Exit => shell.editor_exit(),
            }
            Ok(())
        })
    }

    /// Editor open and not asking whether to save.
    fn editing(&self) -> bool {
        matches!(self.shell().mode(), SessionMode::Editor(e) if !e.exit_prompt)
    }

    /// Run `action`, then show and persist what it changed.
    fn step(&mut self, action: impl FnOnce(&mut Self) -> io::Result<()>) -> io::Result<()> {
        let (had_output, was_editing) = {
            let shell = self.shell();
            (
                !shell.transcript().is_empty(),
                matches!(shell.mode(), SessionMode::Editor(_)),
            )
        };

        action(self)?;

        if self.options.interactive && had_output && self.shell().transcript().is_empty() {
            write!(self.out, "{}", CLEAR_SCREEN)?;
        }
        self.serve_host_requests()?;
        self.render_new()?;
        let title = match self.shell().mode() {
            SessionMode::Editor(editor) if !was_editing => Some(editor.title()),
            _ => None,
        };
        if let Some(title) = title {
            writeln!(self.out, "{}\n{}", title, EDITOR_HINT)?;
        }
        self.shell().flush();
        self.out.flush()
    }

    // =========================================================================
    // Output
    // =========================================================================

    pub fn render_new(&mut self) -> io::Result<()> {
        let shell = lock(&self.shell);
        let last = self.last_id;
        for line in shell
            .transcript()
            .iter()
            .filter(|l| last.is_none_or(|id| l.id > id))
        {
            if !self.options.echo && matches!(line.data, OutputLineData::Command { .. }) {
                continue;
            }
            writeln!(self.out, "{}", render_line(line, self.options.color))?;
        }
        if let Some(line) = shell.transcript().last() {
            self.last_id = Some(line.id);
        }
        self.out.flush()
    }

    /// A host-side message that is not part of the transcript.
    fn notice(&mut self, line: OutputLine) -> io::Result<()> {
        writeln!(self.out, "{}", render_line(&line, self.options.color))
    }

    // =========================================================================
    // Host Requests
    // =========================================================================

    fn serve_host_requests(&mut self) -> io::Result<()> {
        let requests = self.shell().drain_host_requests();
        for request in requests {
            log::debug!("host request: {:?}", request);
            match request {
                HostRequest::Close => self.closed = true,
                HostRequest::Restart => {
                    if self.options.interactive {
                        write!(self.out, "{}", CLEAR_SCREEN)?;
                    }
                }
                HostRequest::Download { filename, contents } => {
                    self.download(&filename, &contents)?;
                }
                HostRequest::Screenshot => self.screenshot(),
                HostRequest::PickStateFile => self.picking_state = true,
            }
        }
        Ok(())
    }

    fn download(&mut self, filename: &str, contents: &str) -> io::Result<()> {
        let path = self.options.download_dir.join(filename);
        match fs::write(&path, contents) {
            Ok(()) => {
                self.shell().host_event(HostEvent::DownloadDone {
                    filename: path.display().to_string(),
                });
                Ok(())
            }
            Err(e) => {
                log::warn!("download to {} failed: {}", path.display(), e);
                self.notice(OutputLine::error(format!(
                    "Download failed: {}: {}",
                    path.display(),
                    e
                )))
            }
        }
    }

    /// Capture the transcript as plain text.
    fn screenshot(&mut self) {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let filename = format!("{}-{}.txt", SCREENSHOT_PREFIX, stamp);
        let mut shell = self.shell();
        let lines: Vec<OutputLine> = shell.transcript().iter().cloned().collect();
        let path = self.options.download_dir.join(&filename);
        let event = match fs::write(&path, to_plain_text(&lines) + "\n") {
            Ok(()) => HostEvent::ScreenshotSaved { filename },
            Err(e) => HostEvent::ScreenshotFailed {
                reason: e.to_string(),
            },
        };
        shell.host_event(event);
    }

    fn load_state_file(&mut self, path: &str) -> io::Result<()> {
        if path.is_empty() {
            return self.notice(OutputLine::info("No file selected."));
        }
        match fs::read_to_string(path) {
            Ok(contents) => {
                self.shell().host_event(HostEvent::StateFileLoaded { contents });
                Ok(())
            }
            Err(e) => self.notice(OutputLine::error(format!("Cannot read {}: {}", path, e))),
        }
    }
}
