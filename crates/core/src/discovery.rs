//! The discovery pipeline: sections -> anchor -> code reference -> name table.

use log::{error, info};
use serde::Serialize;

use crate::config::ResolverConfig;
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::image::{locate_sections, ImageSource, ModuleImage};
use crate::scan::{extract_name_table, find_anchor, walk_code_reference, CodeReferenceChain};

/// Bytes kept on each side of the anchor for the context dump.
const ANCHOR_CONTEXT_MARGIN: usize = 45;

/// What to look for and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryPlan {
    pub anchor: Vec<u8>,
    pub code_section: String,
    pub data_section: String,
}

impl DiscoveryPlan {
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self {
            anchor: config.anchor.as_bytes().to_vec(),
            code_section: config.code_section.clone(),
            data_section: config.data_section.clone(),
        }
    }
}

impl Default for DiscoveryPlan {
    fn default() -> Self {
        Self::from_config(&ResolverConfig::default())
    }
}

/// Everything one successful discovery run learned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    pub anchor: u64,
    pub chain: CodeReferenceChain,
    /// Obfuscated names in extraction order.
    pub names: Vec<String>,
    pub terminated: bool,
    /// Raw bytes surrounding the anchor, for inspection.
    #[serde(skip)]
    pub anchor_context: Vec<u8>,
}

/// Run the pipeline over one image.
pub fn discover(
    image: &ModuleImage<'_>,
    plan: &DiscoveryPlan,
) -> DiscoveryResult<DiscoveryReport> {
    let lookup = locate_sections(image, &[plan.code_section.as_str(), plan.data_section.as_str()]);
    let ranges = lookup.into_result()?;
    let [code_range, data_range] = ranges[..] else {
        return Err(DiscoveryError::InvalidImage("section lookup returned a partial list".into()));
    };

    let data = image.view(data_range)?;
    let anchor = find_anchor(data, &plan.anchor).ok_or_else(|| {
        DiscoveryError::AnchorNotFound(String::from_utf8_lossy(&plan.anchor).into_owned())
    })?;
    info!("Found anchor {:?} at 0x{:X}", String::from_utf8_lossy(&plan.anchor), anchor);
    let anchor_context = image
        .window(anchor, ANCHOR_CONTEXT_MARGIN, plan.anchor.len() + ANCHOR_CONTEXT_MARGIN)
        .to_vec();

    let code = image.view(code_range)?;
    let chain = walk_code_reference(code, anchor)?;
    let table = extract_name_table(image, code, chain.call_target)?;

    Ok(DiscoveryReport {
        anchor,
        chain,
        names: table.names,
        terminated: table.terminated,
        anchor_context,
    })
}

/// Open the image behind `source` and run the pipeline over it, logging any failure.
pub fn discover_from(
    source: &dyn ImageSource,
    plan: &DiscoveryPlan,
) -> DiscoveryResult<DiscoveryReport> {
    let result = source.open().and_then(|image| discover(&image, plan));
    if let Err(err) = &result {
        error!("Discovery in {} failed ({}): {}", source.name(), err.kind().as_str(), err);
    }
    result
}
