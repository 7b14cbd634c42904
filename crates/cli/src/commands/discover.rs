use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{error, warn};
use serde::Serialize;
use unalias_core::cache::{CacheLayout, Fingerprint, FingerprintCache};
use unalias_core::{discover, DiscoveryPlan, DiscoveryReport, ModuleImage};

use crate::{absolute_path, ConfigArgs};

/// Instructions rendered per disassembly block.
const DISASM_COUNT: usize = 6;

/// What happened to the cache after a discovery run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum CacheOutcome {
    Stored { fingerprint: Fingerprint },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct DisasmBlock {
    pub label: String,
    pub address: u64,
    pub lines: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DiscoverOutput {
    pub image: String,
    #[serde(flatten)]
    pub report: DiscoveryReport,
    pub cache: CacheOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disasm: Vec<DisasmBlock>,
}

/// Run discovery offline against a PE file and report what it found.
pub fn discover_command(
    image: &str,
    args: &ConfigArgs,
    no_cache: bool,
    json: bool,
    disasm: bool,
    dump_anchor: Option<&str>,
) -> Result<()> {
    let config = args.resolve()?;
    let image_path = absolute_path(image)?;
    let module = ModuleImage::from_file(&image_path)
        .with_context(|| format!("Failed to load image {}", image_path.display()))?;
    let report = discover(&module, &DiscoveryPlan::from_config(&config))
        .with_context(|| format!("Discovery failed for {}", image_path.display()))?;

    if let Some(out) = dump_anchor {
        fs::write(out, &report.anchor_context)
            .with_context(|| format!("Failed to write anchor dump: {out}"))?;
    }

    let cache = if no_cache {
        CacheOutcome::Skipped { reason: "disabled by --no-cache".to_string() }
    } else {
        store_in_cache(&CacheLayout::new(&config.cache), &config.target_library, &report.names)
    };

    let disasm = if disasm { disasm_blocks(&module, &report)? } else { Vec::new() };

    let output =
        DiscoverOutput { image: image_path.display().to_string(), report, cache, disasm };
    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_report(&output);
    if let Some(out) = dump_anchor {
        println!("Anchor context written to {out}");
    }
    Ok(())
}

fn store_in_cache(layout: &CacheLayout, target: &Path, names: &[String]) -> CacheOutcome {
    let fingerprint = match Fingerprint::of_file(target) {
        Ok(fingerprint) => fingerprint,
        Err(err) => {
            warn!("Not caching: {err:#}");
            return CacheOutcome::Skipped { reason: format!("{err:#}") };
        }
    };
    match FingerprintCache::new(layout.clone()).store(names, fingerprint) {
        Ok(()) => CacheOutcome::Stored { fingerprint },
        Err(err) => {
            error!("Failed to persist name cache: {err:#}");
            CacheOutcome::Skipped { reason: format!("{err:#}") }
        }
    }
}

#[cfg(feature = "disasm")]
fn disasm_blocks(module: &ModuleImage<'_>, report: &DiscoveryReport) -> Result<Vec<DisasmBlock>> {
    use unalias_core::disasm::render_instructions;

    let targets = [
        ("anchor reference", report.chain.reference_at),
        ("call", report.chain.call_at),
        ("table routine", report.chain.call_target),
    ];
    targets
        .into_iter()
        .map(|(label, address)| {
            Ok(DisasmBlock {
                label: label.to_string(),
                address,
                lines: render_instructions(module, address, DISASM_COUNT)?,
            })
        })
        .collect()
}

#[cfg(not(feature = "disasm"))]
fn disasm_blocks(_module: &ModuleImage<'_>, _report: &DiscoveryReport) -> Result<Vec<DisasmBlock>> {
    Err(anyhow::anyhow!("--disasm requires a build with the `disasm` feature"))
}

fn print_report(output: &DiscoverOutput) {
    let report = &output.report;
    println!("Discovery in {}", output.image);
    println!("  Anchor: 0x{:X}", report.anchor);
    println!("  Reference: 0x{:X}", report.chain.reference_at);
    println!(
        "  Call: 0x{:X} -> 0x{:X} ({} bytes after the reference)",
        report.chain.call_at,
        report.chain.call_target,
        report.chain.distance()
    );
    let ending = if report.terminated { "terminated" } else { "no terminator" };
    println!("  Names ({}, {}):", report.names.len(), ending);
    for (index, name) in report.names.iter().enumerate() {
        println!("    [{index}] {name}");
    }
    match &output.cache {
        CacheOutcome::Stored { fingerprint } => {
            println!("  Cache: stored {} names for a {} target", report.names.len(), fingerprint)
        }
        CacheOutcome::Skipped { reason } => println!("  Cache: skipped ({reason})"),
    }
    for block in &output.disasm {
        println!();
        println!("{} @ 0x{:X}:", block.label, block.address);
        for line in &block.lines {
            println!("  {line}");
        }
    }
}
