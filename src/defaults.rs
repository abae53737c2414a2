//! Where the file-backed store keeps its objects when no directory is given.

use std::path::PathBuf;

/// Directory name used under the platform data directory.
pub const STATE_DIR_NAME: &str = "ents-config";

/// Used when the platform has no data directory (e.g. no `HOME`).
pub const FALLBACK_STATE_DIR: &str = ".ents-config-state";

/// Default state directory: `<data dir>/ents-config`, or
/// [`FALLBACK_STATE_DIR`] relative to the working directory.
///
/// The stored objects are state rather than cache, so they go under the data
/// directory (`$XDG_DATA_HOME` on Linux).
pub fn default_state_dir() -> PathBuf {
    match dirs::data_dir() {
        Some(data) => data.join(STATE_DIR_NAME),
        None => PathBuf::from(FALLBACK_STATE_DIR),
    }
}

/// The state directory to use: `explicit` when given (from `--state-dir` or
/// `ENTS_CONFIG_STATE_DIR`), otherwise [`default_state_dir`].
pub fn resolve_state_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(default_state_dir)
}
