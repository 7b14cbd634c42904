use std::path::{Path, PathBuf};

use crate::config::CacheConfig;

/// Resolved on-disk locations of the cache files.
///
/// This is derived from a [`CacheConfig`]. It does *not* perform any IO itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    /// Directory holding the cache files.
    pub dir: PathBuf,
    /// Path to the extracted obfuscated name table.
    pub names_path: PathBuf,
    /// Path to the stored target-library size.
    pub fingerprint_path: PathBuf,
    /// Path to the externally supplied true-name list.
    pub true_names_path: PathBuf,
}

impl CacheLayout {
    pub fn new(config: &CacheConfig) -> Self {
        let dir = config.dir.clone();
        Self {
            names_path: dir.join(&config.names_file),
            fingerprint_path: dir.join(&config.fingerprint_file),
            true_names_path: dir.join(&config.true_names_file),
            dir,
        }
    }

    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(&CacheConfig::new(dir.as_ref()))
    }
}
