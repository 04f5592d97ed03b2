//! Shared test utilities.

use camino::Utf8PathBuf;
use tempfile::TempDir;

pub mod runtime;

/// Creates a scratch directory and the path of a state file inside it.
///
/// The file itself is not created. Keep the directory alive for as long as
/// the path is in use.
///
/// # Panics
///
/// Panics if the directory cannot be created or its path is not UTF-8.
pub fn temp_state_file() -> (TempDir, Utf8PathBuf) {
    let directory = TempDir::new()
        .unwrap_or_else(|error| panic!("failed to create temporary directory: {error}"));
    let path = Utf8PathBuf::from_path_buf(directory.path().join("revwatch").join("state.json"))
        .unwrap_or_else(|raw| panic!("temporary path is not UTF-8: {}", raw.display()));
    (directory, path)
}
