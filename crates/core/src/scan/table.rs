use log::{debug, info, warn};
use serde::Serialize;

use super::patterns::{LEA_RDX_RIP, TABLE_TERMINATOR};
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::image::{ByteView, ModuleImage};

/// Names decoded from the table routine, in encounter order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameTable {
    pub routine: u64,
    pub names: Vec<String>,
    /// False when the scan ran into the end of the code section without seeing the terminator.
    pub terminated: bool,
}

/// Decode the name table starting at `routine`.
///
/// Each `lea rdx, [rip+disp32]` contributes the NUL-terminated string it points at. The scan
/// steps one byte at a time between entries, stops at the terminator shape, and never leaves
/// `code`.
pub fn extract_name_table(
    image: &ModuleImage<'_>,
    code: ByteView<'_>,
    routine: u64,
) -> DiscoveryResult<NameTable> {
    let mut cursor = code.offset_of(routine).ok_or(DiscoveryError::CallTargetOutOfRange {
        target: routine,
        start: code.start,
        end: code.end(),
    })?;

    let mut names = Vec::new();
    let mut terminated = false;
    while cursor < code.bytes.len() {
        let at = code.address_of(cursor);
        let bytes = &code.bytes[cursor..];

        if TABLE_TERMINATOR.matches(bytes) {
            debug!("Table terminator at 0x{:X}", at);
            terminated = true;
            break;
        }

        if let Some(target) = LEA_RDX_RIP.target(at, bytes) {
            let name = image
                .c_string_at(target)
                .ok_or(DiscoveryError::UnreadableString { at, target })?;
            debug!("Entry {} at 0x{:X}: {}", names.len(), at, name);
            names.push(name);
            cursor += LEA_RDX_RIP.len;
            continue;
        }

        cursor += 1;
    }

    if terminated {
        info!("Extracted {} names from routine at 0x{:X}", names.len(), routine);
    } else {
        warn!(
            "No table terminator between 0x{:X} and the end of the code section (0x{:X}); kept {} names",
            routine,
            code.end(),
            names.len()
        );
    }

    Ok(NameTable { routine, names, terminated })
}
