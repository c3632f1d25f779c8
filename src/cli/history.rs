//! # History File Resolution
//!
//! Decides where the shell keeps its line history. Resolution order:
//!
//! 1. `ROWDB_HISTORY`: explicit override. An empty value disables
//!    history persistence entirely.
//! 2. `$XDG_STATE_HOME/rowdb/history` when the XDG state directory is
//!    set and non-empty.
//! 3. `~/.local/state/rowdb/history`, the XDG default under `$HOME`.
//!
//! History is state, not configuration, so it follows the XDG state
//! directory rather than landing as a dotfile in the home directory.
//! The `rowdb/` subdirectory may not exist on first run; the REPL
//! creates it before saving. rustyline handles the file I/O itself.

use std::env;
use std::path::PathBuf;

const HISTORY_ENV_VAR: &str = "ROWDB_HISTORY";
const STATE_SUBDIR: &str = "rowdb";
const HISTORY_FILE: &str = "history";

/// Resolved history location, or None when persistence is disabled or no
/// home directory can be determined.
pub fn history_path() -> Option<PathBuf> {
    if let Ok(overridden) = env::var(HISTORY_ENV_VAR) {
        if overridden.is_empty() {
            return None;
        }
        return Some(PathBuf::from(overridden));
    }

    Some(state_dir()?.join(STATE_SUBDIR).join(HISTORY_FILE))
}

fn state_dir() -> Option<PathBuf> {
    match env::var("XDG_STATE_HOME") {
        Ok(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => {
            let home = env::var("HOME").ok().filter(|h| !h.is_empty())?;
            Some(PathBuf::from(home).join(".local").join("state"))
        }
    }
}
