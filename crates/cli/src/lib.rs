use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use unalias_core::{load_config, CacheConfig, ResolverConfig};

pub mod commands;

/// Options shared by every command that needs a resolver configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Config file (JSON or YAML). Defaults are used when omitted.
    #[arg(long)]
    pub config: Option<String>,

    /// Directory holding the cache and true-name files. Overrides the config.
    #[arg(long)]
    pub cache_dir: Option<String>,

    /// Target library whose byte size fingerprints the cache. Overrides the config.
    #[arg(long)]
    pub target: Option<String>,
}

impl ConfigArgs {
    /// Load the configured (or default) resolver config and apply command-line overrides.
    pub fn resolve(&self) -> Result<ResolverConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(Path::new(path))?,
            None => ResolverConfig::default(),
        };
        if let Some(dir) = &self.cache_dir {
            config.cache = CacheConfig { dir: PathBuf::from(dir), ..config.cache };
        }
        if let Some(target) = &self.target {
            config.target_library = PathBuf::from(target);
        }
        Ok(config)
    }
}

/// `path` as an absolute path: canonical when it exists, otherwise joined onto the working
/// directory so error messages still name a full path.
pub fn absolute_path(path: &str) -> Result<PathBuf> {
    let path = Path::new(path);
    if let Ok(canonical) = path.canonicalize() {
        return Ok(canonical);
    }
    let cwd = env::current_dir().context("Failed to read the working directory")?;
    Ok(cwd.join(path))
}
