//! Host configuration.
//!
//! Constants for the terminal front end. Shell behaviour itself is
//! configured in `vsh_core::config`.

use std::path::PathBuf;

// =============================================================================
// Persistence
// =============================================================================

/// Directory under `$HOME` holding the snapshot file.
pub const STATE_DIR: &str = ".vsh";

/// Snapshot file name inside [`STATE_DIR`].
pub const STATE_FILE: &str = "state.json";

/// Snapshot path used when `--state` is not given.
///
/// Falls back to the working directory when `$HOME` is unset.
pub fn default_state_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(STATE_DIR).join(STATE_FILE),
        None => PathBuf::from(format!("{}-{}", STATE_DIR, STATE_FILE)),
    }
}

// =============================================================================
// Key Lines
// =============================================================================

// Piped input cannot carry control keys, so these are typed literally on a
// line of their own.

/// Interrupt the open prompt.
pub const INTERRUPT_LINE: &str = "^C";

/// Write the editor buffer.
pub const EDITOR_SAVE_LINE: &str = "^O";

/// Leave the editor.
pub const EDITOR_EXIT_LINE: &str = "^X";

// =============================================================================
// Host Actions
// =============================================================================

/// Prompt shown while waiting for a snapshot path after `load-state`.
pub const PICK_STATE_PROMPT: &str = "state file path: ";

/// File name prefix for transcript captures.
pub const SCREENSHOT_PREFIX: &str = "terminal-screenshot";

/// Shown when the editor opens.
pub const EDITOR_HINT: &str = "^O Write Out   ^X Exit   (Enter appends the line)";
