//! Mutable session state shared by all command handlers.

use chrono::{DateTime, Duration, Utc};

use crate::alias::AliasTable;
use crate::config::{self, MAX_TERMINAL_HISTORY, SNAPSHOT_VERSION, dotfiles};
use crate::error::StorageError;
use crate::env::Environment;
use crate::filesystem::{self, VirtualFs};
use crate::history::CommandHistory;
use crate::models::{OutputLine, Settings, Stats};
use crate::parser;
use crate::session::SudoCache;
use crate::storage::{Snapshot, StorageInfo};
use crate::utils::RingBuffer;

/// Everything a command can observe or change.
#[derive(Debug, Clone)]
pub struct ShellState {
    pub fs: VirtualFs,
    pub settings: Settings,
    /// Absolute path of the working directory
    pub cwd: String,
    pub aliases: AliasTable,
    pub history: CommandHistory,
    pub transcript: RingBuffer<OutputLine>,
    pub sudo: SudoCache,
    pub stats: Stats,
    pub started_at: DateTime<Utc>,
    pub storage: StorageInfo,
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellState {
    /// Fresh session: default users, seeded filesystem, default user's home.
    pub fn new() -> Self {
        let settings = Settings::default();
        let fs = VirtualFs::seeded(&settings.users);
        Self::from_parts(fs, settings)
    }

    /// Session over an existing filesystem and account set.
    pub fn from_parts(fs: VirtualFs, settings: Settings) -> Self {
        let mut state = Self {
            fs,
            settings,
            cwd: "/".to_string(),
            aliases: AliasTable::new(),
            history: CommandHistory::new(),
            transcript: RingBuffer::new(MAX_TERMINAL_HISTORY),
            sudo: SudoCache::new(),
            stats: Stats::default(),
            started_at: Utc::now(),
            storage: StorageInfo::default(),
        };
        state.cwd = state.home();
        state.ensure_cwd();
        state.load_user_files();
        state
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub fn uid(&self) -> u32 {
        self.settings.current_user
    }

    pub fn user_name(&self) -> String {
        self.settings.name_of(self.uid())
    }

    pub fn home(&self) -> String {
        self.settings.home_of(self.uid())
    }

    pub fn is_root(&self) -> bool {
        self.uid() == config::ROOT_UID
    }

    /// Make `uid` the active identity, remembering the previous one.
    ///
    /// Moves to the new user's home and loads their aliases and history.
    pub fn switch_user(&mut self, uid: u32) {
        self.settings.last_user = self.settings.current_user;
        self.settings.current_user = uid;
        self.cwd = self.home();
        self.ensure_cwd();
        self.load_user_files();
        log::info!("identity switched to {}", self.user_name());
    }

    // =========================================================================
    // Paths and Variables
    // =========================================================================

    /// Normalize user input against the working directory and home.
    pub fn resolve_path(&self, path: &str) -> String {
        VirtualFs::normalize_path(path, &self.cwd, &self.home())
    }

    /// Working directory with the home prefix shown as `~`.
    pub fn display_cwd(&self) -> String {
        let home = self.home();
        if home != "/" && filesystem::is_within(&self.cwd, &home) {
            format!("~{}", &self.cwd[home.len()..])
        } else {
            self.cwd.clone()
        }
    }

    /// `user@host:path$ ` (`#` for root).
    pub fn prompt(&self) -> String {
        let sigil = if self.is_root() { '#' } else { '$' };
        format!(
            "{}@{}:{}{} ",
            self.user_name(),
            config::HOST_NAME,
            self.display_cwd(),
            sigil
        )
    }

    pub fn environment(&self) -> Environment {
        Environment {
            user: self.user_name(),
            uid: self.uid(),
            home: self.home(),
            pwd: self.cwd.clone(),
        }
    }

    /// Split a command portion into words with variables expanded.
    pub fn parse_args(&self, line: &str) -> Vec<String> {
        let env = self.environment();
        let lookup = |name: &str| env.get(name);
        parser::parse_args(line, &lookup)
    }

    /// Walk up from the working directory until it names a directory.
    pub fn ensure_cwd(&mut self) {
        while !self.fs.is_directory(&self.cwd) {
            if self.cwd == "/" {
                // Root is always a directory
                break;
            }
            self.cwd = filesystem::parent_path(&self.cwd);
        }
    }

    // =========================================================================
    // Per-user Dotfiles
    // =========================================================================

    fn dotfile(&self, name: &str) -> String {
        filesystem::join_path(&self.home(), name)
    }

    /// Reload aliases and history from the active user's dotfiles.
    pub fn load_user_files(&mut self) {
        self.aliases = self
            .fs
            .read_file(&self.dotfile(dotfiles::ALIASES))
            .map(AliasTable::parse)
            .unwrap_or_default();
        self.history = self
            .fs
            .read_file(&self.dotfile(dotfiles::HISTORY))
            .map(CommandHistory::from_file)
            .unwrap_or_default();
    }

    /// Write the alias table back to `~/.bash_aliases`.
    pub fn save_aliases(&mut self) {
        let path = self.dotfile(dotfiles::ALIASES);
        if let Err(e) = self.fs.write_file(&path, &self.aliases.to_file()) {
            log::warn!("cannot write {}: {}", path, e);
        }
    }

    /// Record a submitted line in the ring and in `~/.bash_history`.
    pub fn record_history(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        self.history.push(line);
        let path = self.dotfile(dotfiles::HISTORY);
        if let Err(e) = self.fs.append_file(&path, &format!("{}\n", line)) {
            log::warn!("cannot append to {}: {}", path, e);
        }
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        let path = self.dotfile(dotfiles::HISTORY);
        if let Err(e) = self.fs.write_file(&path, "") {
            log::warn!("cannot truncate {}: {}", path, e);
        }
    }

    // =========================================================================
    // Transcript
    // =========================================================================

    pub fn print(&mut self, line: OutputLine) {
        self.transcript.push(line);
    }

    pub fn print_all(&mut self, lines: impl IntoIterator<Item = OutputLine>) {
        self.transcript.extend(lines);
    }

    /// Milliseconds since the session started.
    pub fn uptime_ms(&self) -> u64 {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        u64::try_from(elapsed.num_milliseconds()).unwrap_or(0)
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Serializable copy of the session with the last `output_lines`
    /// transcript records.
    pub fn snapshot(&self, output_lines: usize, export_date: Option<String>) -> Snapshot {
        let mut stats = self.stats.clone();
        stats.uptime = self.uptime_ms();
        Snapshot {
            file_system: self.fs.clone(),
            settings: self.settings.clone(),
            version: SNAPSHOT_VERSION.to_string(),
            stats: Some(stats),
            current_path: Some(self.cwd.clone()),
            current_user: Some(self.user_name()),
            aliases: Some(self.aliases.to_map()),
            output_history: Some(self.transcript.tail(output_lines).cloned().collect()),
            command_history: Some(self.history.to_vec()),
            export_date,
        }
    }

    /// Replace the session with `snapshot`.
    ///
    /// Nothing changes when the snapshot names an unknown active user.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<(), StorageError> {
        if snapshot.settings.user(snapshot.settings.current_user).is_none() {
            return Err(StorageError::InvalidSnapshot(format!(
                "unknown current user {}",
                snapshot.settings.current_user
            )));
        }

        self.fs = snapshot.file_system;
        self.settings = snapshot.settings;
        self.stats = snapshot.stats.unwrap_or_default();
        self.started_at = Utc::now() - Duration::milliseconds(self.stats.uptime as i64);
        self.sudo.clear();

        self.cwd = match snapshot.current_path {
            Some(path) if self.fs.is_directory(&path) => path,
            _ => self.home(),
        };
        self.ensure_cwd();

        self.load_user_files();
        if let Some(aliases) = snapshot.aliases {
            self.aliases = aliases.into();
        }
        if let Some(history) = snapshot.command_history {
            self.history = CommandHistory::from_entries(history);
        }
        self.transcript.clear();
        self.transcript
            .extend(snapshot.output_history.into_iter().flatten());
        log::info!("session restored for {} at {}", self.user_name(), self.cwd);
        Ok(())
    }
}
