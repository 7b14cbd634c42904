//! Byte-level instruction shapes recognized by the scanners.
//!
//! Only the handful of x86-64 encodings the host's loader actually emits are covered. A shape
//! is matched against the bytes at a cursor; nothing here decodes instruction lengths.

/// An instruction with a fixed opcode prefix and a little-endian `disp32` relative to the
/// address of the next instruction (RIP-relative operands and `rel32` branches).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeShape {
    pub name: &'static str,
    pub prefix: &'static [u8],
    /// Total encoded length, which is also where the displacement is measured from.
    pub len: usize,
    pub disp_offset: usize,
}

impl RelativeShape {
    pub const fn new(
        name: &'static str,
        prefix: &'static [u8],
        len: usize,
        disp_offset: usize,
    ) -> Self {
        Self { name, prefix, len, disp_offset }
    }

    pub fn matches(&self, bytes: &[u8]) -> bool {
        bytes.len() >= self.len && bytes.starts_with(self.prefix)
    }

    pub fn displacement(&self, bytes: &[u8]) -> Option<i32> {
        if !self.matches(bytes) {
            return None;
        }
        let raw = bytes.get(self.disp_offset..self.disp_offset + 4)?;
        Some(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    /// Absolute address referenced by the instruction encoded at the start of `bytes`, which
    /// itself lives at address `at`.
    pub fn target(&self, at: u64, bytes: &[u8]) -> Option<u64> {
        let disp = self.displacement(bytes)?;
        Some(at.wrapping_add(self.len as u64).wrapping_add_signed(disp as i64))
    }
}

/// An instruction matched byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactShape {
    pub name: &'static str,
    pub bytes: &'static [u8],
}

impl ExactShape {
    pub const fn new(name: &'static str, bytes: &'static [u8]) -> Self {
        Self { name, bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn matches(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(self.bytes)
    }
}

/// `movups xmm0, xmmword ptr [rip+disp32]`: how the loader copies the library file name.
pub const MOVUPS_XMM0_RIP: RelativeShape =
    RelativeShape::new("movups xmm0, [rip+disp32]", &[0x0F, 0x10, 0x05], 7, 3);

/// `call rel32`.
pub const CALL_REL32: RelativeShape = RelativeShape::new("call rel32", &[0xE8], 5, 1);

/// `lea rdx, [rip+disp32]`: one name table entry, loading a pointer to the original name.
pub const LEA_RDX_RIP: RelativeShape =
    RelativeShape::new("lea rdx, [rip+disp32]", &[0x48, 0x8D, 0x15], 7, 3);

/// `lea rbx, [rax+0xCD98]`: first instruction after the last table entry.
pub const TABLE_TERMINATOR: ExactShape =
    ExactShape::new("lea rbx, [rax+0xCD98]", &[0x48, 0x8D, 0x98, 0x98, 0xCD, 0x00, 0x00]);
