use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// Where the cache and true-name files live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding the cache files (relative paths resolve against the working directory).
    pub dir: PathBuf,
    /// Extracted obfuscated name table.
    pub names_file: String,
    /// Byte size of the target library observed when `names_file` was written.
    pub fingerprint_file: String,
    /// Ordered list of true export names, supplied externally.
    pub true_names_file: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            names_file: "savedSecretName.txt".to_string(),
            fingerprint_file: "savedGAhash.txt".to_string(),
            true_names_file: "savedSecretNameNoEnc.txt".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), ..Self::default() }
    }
}

/// Serializable configuration for a resolver.
///
/// Every field has a default matching the stock Unity/IL2CPP setup, so an empty JSON object is
/// a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Name of the loaded module whose image embeds the anchor and the name table.
    pub host_module: String,
    /// File whose byte size fingerprints the cache.
    pub target_library: PathBuf,
    /// Marker string searched for in the data section.
    pub anchor: String,
    /// Executable section holding the reference, the call and the table routine.
    pub code_section: String,
    /// Read-only data section holding the anchor.
    pub data_section: String,
    /// Names without this prefix are never looked up.
    pub name_prefix: String,
    pub cache: CacheConfig,
    /// Log file used by the in-process host. The CLI logs to stderr and ignores this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            host_module: "UnityPlayer".to_string(),
            target_library: PathBuf::from("GameAssembly.dll"),
            anchor: "GameAssembly.dll".to_string(),
            code_section: ".text".to_string(),
            data_section: ".rdata".to_string(),
            name_prefix: "il2cpp".to_string(),
            cache: CacheConfig::default(),
            log_file: None,
        }
    }
}

/// Config file formats, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        match ext {
            "json" => Ok(ConfigFormat::Json),
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            other => Err(anyhow!(
                "Unsupported config extension '{}' for {} (expected json, yaml or yml)",
                other,
                path.display()
            )),
        }
    }
}

/// Load a resolver config from a JSON or YAML file.
pub fn load_config(path: &Path) -> Result<ResolverConfig> {
    let format = ConfigFormat::from_path(path)?;
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    let config = match format {
        ConfigFormat::Json => {
            serde_json::from_str(&body).context("Failed to parse config JSON")?
        }
        ConfigFormat::Yaml => {
            serde_yaml::from_str(&body).context("Failed to parse config YAML")?
        }
    };
    Ok(config)
}

/// Serialize a resolver config in the format implied by `path`'s extension.
pub fn render_config(config: &ResolverConfig, path: &Path) -> Result<String> {
    let body = match ConfigFormat::from_path(path)? {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(body)
}
