use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use unalias_core::config::render_config;
use unalias_core::ResolverConfig;

/// Write the default resolver configuration to `out` (JSON or YAML by extension).
pub fn init_config_command(out: &str, force: bool) -> Result<()> {
    let path = Path::new(out);
    if path.exists() && !force {
        return Err(anyhow!("Refusing to overwrite {} (pass --force)", path.display()));
    }

    let body = render_config(&ResolverConfig::default(), path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
    }
    fs::write(path, body)
        .with_context(|| format!("Failed to write config: {}", path.display()))?;

    println!("Wrote default config to {}", path.display());
    Ok(())
}
