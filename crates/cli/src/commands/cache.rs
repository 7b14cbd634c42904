use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use serde::Serialize;
use sha2::{Digest, Sha256};
use unalias_core::cache::{read_name_list, CacheLayout, CacheState, Fingerprint, FingerprintCache};

use crate::ConfigArgs;

#[derive(Debug, Serialize)]
pub struct CacheInfo {
    pub names_path: String,
    pub fingerprint_path: String,
    pub true_names_path: String,
    pub target_library: String,
    /// Size of the target library now, if it can be read.
    pub current: Option<Fingerprint>,
    /// Diagnostic only; freshness is decided by size.
    pub target_sha256: Option<String>,
    pub state: CacheState,
    pub cached_names: Option<usize>,
    pub true_names: Option<usize>,
}

/// Hex SHA-256 of the target library, shown next to its size.
pub fn target_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open target library: {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("Failed to hash target library: {}", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

fn count_names(path: &Path) -> Option<usize> {
    if !path.is_file() {
        return None;
    }
    match read_name_list(path) {
        Ok(names) => Some(names.len()),
        Err(err) => {
            warn!("{err:#}");
            None
        }
    }
}

/// Inspect the cache files against the current target library.
pub fn collect_cache_info(args: &ConfigArgs) -> Result<CacheInfo> {
    let config = args.resolve()?;
    let layout = CacheLayout::new(&config.cache);
    let target = &config.target_library;

    let current = Fingerprint::of_file(target).ok();
    let target_sha256 = if current.is_some() { target_sha256(target).ok() } else { None };
    let state = FingerprintCache::new(layout.clone()).state(current);

    Ok(CacheInfo {
        names_path: layout.names_path.display().to_string(),
        fingerprint_path: layout.fingerprint_path.display().to_string(),
        true_names_path: layout.true_names_path.display().to_string(),
        target_library: target.display().to_string(),
        current,
        target_sha256,
        state,
        cached_names: count_names(&layout.names_path),
        true_names: count_names(&layout.true_names_path),
    })
}

/// Report cache freshness, fingerprints and entry counts.
pub fn cache_info_command(args: &ConfigArgs, json: bool) -> Result<()> {
    let info = collect_cache_info(args)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let describe = |count: Option<usize>| match count {
        Some(n) => format!("{n} names"),
        None => "(missing)".to_string(),
    };

    println!("Name cache");
    println!("==========");
    println!("Target library: {}", info.target_library);
    match info.current {
        Some(current) => println!("  Current size: {current}"),
        None => println!("  Current size: (unreadable)"),
    }
    if let Some(sha) = &info.target_sha256 {
        println!("  SHA-256: {sha}");
    }
    let state = match info.state {
        CacheState::Missing => "missing".to_string(),
        CacheState::Unknown { stored } => format!("unknown (stored {stored})"),
        CacheState::Stale { stored, current } => format!("stale (stored {stored}, now {current})"),
        CacheState::Fresh { stored } => format!("fresh ({stored})"),
    };
    println!("State: {state}");
    println!("- Names file: {} ({})", info.names_path, describe(info.cached_names));
    println!("- Fingerprint file: {}", info.fingerprint_path);
    println!("- True names file: {} ({})", info.true_names_path, describe(info.true_names));

    Ok(())
}
