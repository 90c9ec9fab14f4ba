//! Shell configuration.
//!
//! Centralizes the constants used throughout the shell: capacities, prompt
//! texts, default users and the seed filesystem.

use std::time::Duration;

// =============================================================================
// Application Metadata
// =============================================================================

/// Host name shown in the prompt and by `$HOSTNAME`.
pub const HOST_NAME: &str = "vsh";

/// Value of `$SHELL`.
pub const SHELL_PATH: &str = "/bin/vsh";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Terminal Configuration
// =============================================================================

/// Maximum number of commands kept in the history ring.
pub const MAX_COMMAND_HISTORY: usize = 100;

/// Maximum number of transcript records kept in memory.
pub const MAX_TERMINAL_HISTORY: usize = 1000;

/// Transcript records saved with the durable snapshot.
pub const PERSISTED_OUTPUT_LINES: usize = 100;

/// Transcript records included in an exported state document.
pub const EXPORTED_OUTPUT_LINES: usize = 50;

/// Handler failures kept in the stats error log.
pub const MAX_ERROR_LOG: usize = 50;

/// Column width used by `help` for command names.
pub const HELP_NAME_WIDTH: usize = 12;

/// Descriptions longer than this are truncated by `help`.
pub const HELP_DESCRIPTION_WIDTH: usize = 50;

/// Per-user dotfiles, relative to the home directory.
pub mod dotfiles {
    pub const HISTORY: &str = ".bash_history";
    pub const ALIASES: &str = ".bash_aliases";
    pub const RC: &str = ".bashrc";
}

// =============================================================================
// Authentication
// =============================================================================

/// Wrong passwords accepted before a prompt is abandoned.
pub const MAX_AUTH_ATTEMPTS: u8 = 3;

/// How long a successful `sudo` authentication stays valid.
pub const SUDO_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// User id with full privileges.
pub const ROOT_UID: u32 = 0;

/// Prompt texts for each authentication step.
pub mod prompts {
    pub const SU: &str = "Password: ";
    pub const PASSWD_CURRENT: &str = "Current password: ";
    pub const PASSWD_NEW: &str = "New password: ";
    pub const PASSWD_CONFIRM: &str = "Retype new password: ";
    pub const RESET_FIRST: &str = "Reset Warning [y/N]: ";
    pub const RESET_FINAL: &str = "Final Confirmation [y/N]: ";
    pub const SCRIPT: &str = "> ";
    pub const EDITOR_EXIT: &str = "Save modified buffer? (y/n, ^C to cancel): ";
}

/// Token that leaves scripting mode.
pub const SCRIPT_EXIT_TOKEN: &str = ".exit";

/// Deepest nesting of brackets and unary operators the script parser accepts.
pub const MAX_SCRIPT_DEPTH: usize = 64;

/// Most tokens accepted in one script line. Bounds the height of operator
/// chains, which the evaluator walks recursively.
pub const MAX_SCRIPT_TOKENS: usize = 1024;

// =============================================================================
// Text Commands
// =============================================================================

/// Default number of lines for `head` and `tail`.
pub const DEFAULT_LINE_COUNT: usize = 10;

// =============================================================================
// Persistence
// =============================================================================

/// Version tag written into snapshots.
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Prefix of exported state file names.
pub const EXPORT_FILE_PREFIX: &str = "terminal-state";

// =============================================================================
// Default Users
// =============================================================================

/// A user created on first boot: (name, uid, password, home).
pub struct DefaultUser {
    pub name: &'static str,
    pub uid: u32,
    pub password: &'static str,
    pub home: &'static str,
}

pub const DEFAULT_USERS: &[DefaultUser] = &[
    DefaultUser {
        name: "root",
        uid: 0,
        password: "toor",
        home: "/root",
    },
    DefaultUser {
        name: "alice",
        uid: 1000,
        password: "password",
        home: "/home/alice",
    },
    DefaultUser {
        name: "user",
        uid: 1001,
        password: "user123",
        home: "/home/user",
    },
];

/// Identity that owns the session on first boot.
pub const DEFAULT_UID: u32 = 1001;

// =============================================================================
// Seed Filesystem
// =============================================================================

/// Message of the day, shown when a fresh session starts.
pub const MOTD: &str = "Welcome to vsh!\n\nType 'help' to see all available commands.";

/// Default `.bashrc` written into every home directory.
pub const DEFAULT_BASHRC: &str = "# ~/.bashrc: executed by bash for non-login shells\n\
export PATH=$PATH:/usr/local/bin\n\
export EDITOR=nano\n";

/// Aliases seeded for regular users.
pub const DEFAULT_USER_ALIASES: &str = "alias ll='ls -l'\nalias la='ls -A'\nalias l='ls -F'\n";

/// Aliases seeded for root.
pub const DEFAULT_ROOT_ALIASES: &str = "alias ll='ls -la'\nalias la='ls -A'\n";

/// Extra directories created at boot (besides home directories).
pub const SEED_DIRECTORIES: &[&str] = &[
    "/etc",
    "/usr",
    "/usr/bin",
    "/tmp",
    "/home/user/Desktop",
    "/home/user/Documents",
];

/// Extra files created at boot: (path, content).
pub const SEED_FILES: &[(&str, &str)] = &[
    ("/etc/hosts", "127.0.0.1 localhost\n::1 localhost\n"),
    ("/etc/motd", MOTD),
    ("/usr/bin/ls", "binary"),
    ("/usr/bin/cat", "binary"),
    ("/home/user/Desktop/document.txt", "Hello World!"),
    (
        "/home/user/Desktop/script.sh",
        "#!/bin/sh\necho \"Hello from script\"\n",
    ),
    (
        "/home/user/Documents/readme.md",
        "# Documents\n\nPut your notes here.\n",
    ),
];
