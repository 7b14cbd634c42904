use log::{debug, info};
use serde::Serialize;

use super::patterns::{CALL_REL32, MOVUPS_XMM0_RIP};
use super::scan_forward;
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::image::ByteView;

/// The two code locations linking the anchor string to the name table routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodeReferenceChain {
    /// Address of the instruction loading the anchor string.
    pub reference_at: u64,
    /// Address of the first call after it.
    pub call_at: u64,
    /// Where that call lands: the routine holding the name table.
    pub call_target: u64,
}

impl CodeReferenceChain {
    /// Byte distance from the anchor reference to the call.
    pub fn distance(&self) -> u64 {
        self.call_at - self.reference_at
    }
}

/// Find the instruction referencing `anchor` inside `code`, then the first call after it.
///
/// The reference must resolve to `anchor` exactly; the call is taken unconditionally, however
/// many bytes separate the two.
pub fn walk_code_reference(
    code: ByteView<'_>,
    anchor: u64,
) -> DiscoveryResult<CodeReferenceChain> {
    let (reference, _) = scan_forward(code, 0, |at, bytes| {
        MOVUPS_XMM0_RIP.target(at, bytes).filter(|target| *target == anchor)
    })
    .ok_or(DiscoveryError::ReferenceNotFound(anchor))?;
    let reference_at = code.address_of(reference);
    info!("Found {} referencing anchor at 0x{:X}", MOVUPS_XMM0_RIP.name, reference_at);

    let (call, call_target) = scan_forward(code, reference + MOVUPS_XMM0_RIP.len, |at, bytes| {
        CALL_REL32.target(at, bytes)
    })
    .ok_or(DiscoveryError::CallNotFound(reference_at))?;

    let chain = CodeReferenceChain { reference_at, call_at: code.address_of(call), call_target };
    info!(
        "Found call at 0x{:X} -> 0x{:X}, {} bytes after the anchor reference",
        chain.call_at,
        chain.call_target,
        chain.distance()
    );
    debug!("Code reference chain: {:?}", chain);
    Ok(chain)
}
