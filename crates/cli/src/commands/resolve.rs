use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use unalias_core::cache::read_name_list;
use unalias_core::resolver::NameOrigin;
use unalias_core::{ImageFile, NameResolver};

use crate::{absolute_path, ConfigArgs};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResolvedName {
    pub name: String,
    pub resolved: String,
}

#[derive(Debug, Serialize)]
pub struct ResolveOutput {
    pub origin: NameOrigin,
    pub entries: Vec<ResolvedName>,
}

/// Build a resolver over a PE file and translate each of `names`.
pub fn resolve_names(
    image: &str,
    args: &ConfigArgs,
    true_names: Option<&str>,
    names: &[String],
) -> Result<ResolveOutput> {
    let config = args.resolve()?;
    let image_path = absolute_path(image)?;
    let mut resolver = NameResolver::new(config, Box::new(ImageFile::new(image_path)));
    if let Some(path) = true_names {
        resolver = resolver.with_true_names(read_name_list(Path::new(path))?);
    }

    let entries = names
        .iter()
        .map(|name| ResolvedName {
            name: name.clone(),
            resolved: resolver.resolve(name).to_string(),
        })
        .collect();
    Ok(ResolveOutput { origin: resolver.origin(), entries })
}

/// Print `name -> resolved` for each requested name.
pub fn resolve_command(
    image: &str,
    args: &ConfigArgs,
    true_names: Option<&str>,
    names: &[String],
    json: bool,
) -> Result<()> {
    let output = resolve_names(image, args, true_names, names)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Names (from {}):", output.origin.as_str());
    for entry in &output.entries {
        println!("  {} -> {}", entry.name, entry.resolved);
    }
    Ok(())
}
