use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

/// Byte size of the target library file. Equal sizes are taken to mean the same build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Fingerprint the file at `path` as it is on disk now.
    pub fn of_file(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to stat target library {}", path.display()))?;
        Ok(Fingerprint(metadata.len()))
    }

    /// Read a stored fingerprint: a single decimal integer.
    pub fn read(path: &Path) -> Result<Self> {
        let body = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fingerprint file {}", path.display()))?;
        parse_fingerprint(&body)
            .with_context(|| format!("Failed to parse fingerprint file {}", path.display()))
    }

    pub fn write(self, path: &Path) -> Result<()> {
        fs::write(path, self.0.to_string())
            .with_context(|| format!("Failed to write fingerprint file {}", path.display()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes", self.0)
    }
}

pub fn parse_fingerprint(body: &str) -> Result<Fingerprint> {
    let token = body.split_ascii_whitespace().next().ok_or_else(|| anyhow!("empty fingerprint"))?;
    let size = token.parse::<u64>().with_context(|| format!("invalid fingerprint '{token}'"))?;
    Ok(Fingerprint(size))
}

/// Parse a name list: a decimal count followed by that many whitespace-separated names.
///
/// A list shorter than its count is returned as far as it goes.
pub fn parse_name_list(body: &str) -> Result<Vec<String>> {
    let mut tokens = body.split_ascii_whitespace();
    let Some(count) = tokens.next() else {
        return Ok(Vec::new());
    };
    let count = count.parse::<usize>().with_context(|| format!("invalid name count '{count}'"))?;
    let names: Vec<String> = tokens.take(count).map(str::to_string).collect();
    if names.len() < count {
        warn!("Name list declares {} entries but holds {}", count, names.len());
    }
    Ok(names)
}

pub fn render_name_list(names: &[String]) -> String {
    let mut body = format!("{}\n", names.len());
    for name in names {
        body.push_str(name);
        body.push('\n');
    }
    body
}

pub fn read_name_list(path: &Path) -> Result<Vec<String>> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("Failed to read name list {}", path.display()))?;
    parse_name_list(&body).with_context(|| format!("Failed to parse name list {}", path.display()))
}

/// Write a name list. Names containing whitespace cannot be read back intact; they are written
/// anyway and reported.
pub fn write_name_list(path: &Path, names: &[String]) -> Result<()> {
    if let Some(bad) = names.iter().find(|n| n.is_empty() || n.contains(char::is_whitespace)) {
        warn!("Name {:?} will not survive a round trip through {}", bad, path.display());
    }
    fs::write(path, render_name_list(names))
        .with_context(|| format!("Failed to write name list {}", path.display()))
}
