use serde::Serialize;

use super::ModuleImage;
use crate::error::{DiscoveryError, DiscoveryResult};

/// Longest name a PE section header can hold.
const SECTION_NAME_LEN: usize = 8;

/// Absolute address range of a section. The all-zero range stands in for a missing section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionRange {
    pub start: u64,
    pub size: u64,
}

impl SectionRange {
    pub const EMPTY: SectionRange = SectionRange { start: 0, size: 0 };

    pub fn new(start: u64, size: u64) -> Self {
        Self { start, size }
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.size)
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end()
    }
}

/// Result of looking up a list of section names.
///
/// `ranges` runs parallel to the requested names up to and including the first missing one,
/// which is reported as [`SectionRange::EMPTY`]. Lookup stops there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionLookup {
    pub ranges: Vec<SectionRange>,
    pub missing: Option<String>,
}

impl SectionLookup {
    pub fn is_complete(&self) -> bool {
        self.missing.is_none()
    }

    /// All ranges, or the first missing section as an error.
    pub fn into_result(self) -> DiscoveryResult<Vec<SectionRange>> {
        match self.missing {
            Some(name) => Err(DiscoveryError::MissingSection(name)),
            None => Ok(self.ranges),
        }
    }
}

fn section_name_matches(raw: &[u8; SECTION_NAME_LEN], wanted: &str) -> bool {
    let wanted = wanted.as_bytes();
    if wanted.is_empty() || wanted.len() > SECTION_NAME_LEN {
        return false;
    }
    raw.starts_with(wanted) && raw[wanted.len()..].iter().all(|b| *b == 0)
}

/// Look up each requested section by exact name, in order.
pub fn locate_sections(image: &ModuleImage<'_>, names: &[&str]) -> SectionLookup {
    let mut ranges = Vec::with_capacity(names.len());
    for name in names {
        let found = image.sections().iter().find(|s| section_name_matches(&s.name, name));
        match found {
            Some(section) => ranges.push(SectionRange::new(
                image.base() + section.virtual_address as u64,
                section.virtual_size as u64,
            )),
            None => {
                ranges.push(SectionRange::EMPTY);
                return SectionLookup { ranges, missing: Some(name.to_string()) };
            }
        }
    }
    SectionLookup { ranges, missing: None }
}
