//! Store-directory discovery and script location.
//!
//! The store is where the user keeps `sk.lua`: `--store <dir>` when given,
//! otherwise `~/.sk`. Both the directory and the script file are validated
//! here so the dispatcher only ever sees a usable path or a
//! [`Error::Config`].

use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};
use crate::options::Options;

/// File name of the script inside the store.
pub const SCRIPT_NAME: &str = "sk.lua";

/// Directory name of the default store under the home directory.
pub const DEFAULT_STORE: &str = ".sk";

/// Get the user's home directory in a cross-platform way.
#[must_use]
pub fn get_home_dir() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os("HOME") {
        return Some(PathBuf::from(home));
    }

    // Windows fallback.
    if let Some(userprofile) = std::env::var_os("USERPROFILE") {
        return Some(PathBuf::from(userprofile));
    }

    None
}

/// Resolve the store directory from the parsed options.
///
/// # Errors
///
/// Returns [`Error::Config`] when the home directory cannot be determined
/// or the resolved path is not a directory.
pub fn resolve_store(options: &Options) -> Result<PathBuf> {
    let store = match options.value_of("store") {
        Some(path) => PathBuf::from(path),
        None => get_home_dir()
            .ok_or_else(|| Error::Config("could not determine home directory".to_string()))?
            .join(DEFAULT_STORE),
    };

    if !store.is_dir() {
        return Err(Error::Config(format!(
            "store path `{}` is not a directory",
            store.display()
        )));
    }

    Ok(store)
}

/// Locate the script file inside the store.
///
/// # Errors
///
/// Returns [`Error::Config`] when `sk.lua` is missing.
pub fn script_path(store: &Path) -> Result<PathBuf> {
    let path = store.join(SCRIPT_NAME);
    if !path.is_file() {
        return Err(Error::Config(format!(
            "{SCRIPT_NAME} not found in `{}`",
            store.display()
        )));
    }
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_store_must_be_a_directory() {
        let mut options = Options::new();
        options.set_long("store", "/definitely/not/here".to_string());
        assert!(matches!(resolve_store(&options), Err(Error::Config(_))));
    }

    #[test]
    fn test_explicit_store_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = Options::new();
        options.set_long("store", dir.path().to_string_lossy().to_string());
        assert_eq!(resolve_store(&options).unwrap(), dir.path());
    }

    #[test]
    fn test_script_path_requires_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().to_path_buf();
        assert!(matches!(script_path(&store), Err(Error::Config(_))));

        std::fs::write(store.join(SCRIPT_NAME), "return {}").unwrap();
        assert_eq!(script_path(&store).unwrap(), store.join(SCRIPT_NAME));
    }
}
