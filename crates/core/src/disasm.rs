//! Short instruction listings around discovered addresses, for eyeballing a discovery run.
//!
//! Only used for diagnostics; the scanners themselves never decode instructions.

use anyhow::{anyhow, Result};
use capstone::{arch, prelude::*, Capstone};

use crate::image::ModuleImage;

/// Longest x86 instruction encoding.
const MAX_INSN_LEN: usize = 15;

fn make_cs() -> Result<Capstone> {
    Capstone::new()
        .x86()
        .mode(arch::x86::ArchMode::Mode64)
        .detail(false)
        .build()
        .map_err(|e| anyhow!("capstone init failed: {e}"))
}

/// Disassemble up to `count` instructions starting at `addr`, one formatted line each.
pub fn render_instructions(
    image: &ModuleImage<'_>,
    addr: u64,
    count: usize,
) -> Result<Vec<String>> {
    let bytes = image.window(addr, 0, count.saturating_mul(MAX_INSN_LEN));
    if bytes.is_empty() {
        return Err(anyhow!("address 0x{addr:X} is outside the image"));
    }
    let cs = make_cs()?;
    let insns =
        cs.disasm_count(bytes, addr, count).map_err(|e| anyhow!("disassembly failed: {e}"))?;
    Ok(insns
        .iter()
        .map(|insn| {
            format!(
                "0x{:X}: {} {}",
                insn.address(),
                insn.mnemonic().unwrap_or("??"),
                insn.op_str().unwrap_or("")
            )
            .trim_end()
            .to_string()
        })
        .collect())
}
