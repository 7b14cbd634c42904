//! Fingerprinted persistence of the extracted name table.
//!
//! Two plain-text files: the name table (count line, then one name per line) and the
//! fingerprint (the target library's byte size when the table was written). A matching size on
//! a later run is taken as proof the stored table is still valid, so discovery is skipped.
//! Size equality is a heuristic; two builds of the same size share a cache.

mod format;
mod layout;

use std::fs;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Serialize;

pub use format::{
    parse_fingerprint, parse_name_list, read_name_list, render_name_list, write_name_list,
    Fingerprint,
};
pub use layout::CacheLayout;

/// Freshness of the stored table relative to the current target library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum CacheState {
    /// No readable fingerprint on disk.
    Missing,
    /// The target library's size is unknown, so freshness cannot be decided.
    Unknown { stored: Fingerprint },
    Stale { stored: Fingerprint, current: Fingerprint },
    Fresh { stored: Fingerprint },
}

impl CacheState {
    pub fn is_fresh(&self) -> bool {
        matches!(self, CacheState::Fresh { .. })
    }
}

#[derive(Debug, Clone)]
pub struct FingerprintCache {
    layout: CacheLayout,
}

impl FingerprintCache {
    pub fn new(layout: CacheLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    /// The stored fingerprint, if one can be read.
    pub fn stored_fingerprint(&self) -> Option<Fingerprint> {
        if !self.layout.fingerprint_path.is_file() {
            debug!("No fingerprint at {}", self.layout.fingerprint_path.display());
            return None;
        }
        match Fingerprint::read(&self.layout.fingerprint_path) {
            Ok(stored) => Some(stored),
            Err(err) => {
                warn!("Ignoring unreadable cache fingerprint: {err:#}");
                None
            }
        }
    }

    pub fn state(&self, current: Option<Fingerprint>) -> CacheState {
        match (self.stored_fingerprint(), current) {
            (None, _) => CacheState::Missing,
            (Some(stored), None) => CacheState::Unknown { stored },
            (Some(stored), Some(current)) if stored == current => CacheState::Fresh { stored },
            (Some(stored), Some(current)) => CacheState::Stale { stored, current },
        }
    }

    /// The stored name table, provided its fingerprint equals `current`.
    ///
    /// Any problem (missing files, stale fingerprint, unreadable table) yields `None`, which
    /// callers treat as a cold cache.
    pub fn load_if_fresh(&self, current: Fingerprint) -> Option<Vec<String>> {
        match self.state(Some(current)) {
            CacheState::Fresh { .. } => {}
            CacheState::Stale { stored, current } => {
                info!("Cache is stale (stored {stored}, target now {current})");
                return None;
            }
            _ => return None,
        }
        match read_name_list(&self.layout.names_path) {
            Ok(names) => {
                info!(
                    "Loaded {} cached names from {}",
                    names.len(),
                    self.layout.names_path.display()
                );
                Some(names)
            }
            Err(err) => {
                warn!("Cache fingerprint matches but the name table is unusable: {err:#}");
                None
            }
        }
    }

    /// Persist `names` and then `fingerprint`. The fingerprint is only written once the table
    /// is on disk, so a failed write never leaves a fresh-looking cache behind.
    pub fn store(&self, names: &[String], fingerprint: Fingerprint) -> Result<()> {
        fs::create_dir_all(&self.layout.dir).with_context(|| {
            format!("Failed to create cache dir: {}", self.layout.dir.display())
        })?;
        write_name_list(&self.layout.names_path, names)?;
        fingerprint.write(&self.layout.fingerprint_path)?;
        info!("Cached {} names for a {} target", names.len(), fingerprint);
        Ok(())
    }
}
