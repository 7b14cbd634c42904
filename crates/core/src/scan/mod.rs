//! Byte scanners driving the discovery pipeline.
//!
//! - `anchor`: find the marker string in the data section.
//! - `xref`: find the code referencing it and the call that follows.
//! - `table`: decode the name table out of the called routine.
//!
//! All scans step one byte at a time over a bounded [`ByteView`](crate::image::ByteView); no
//! instruction-length decoding is attempted.

pub mod anchor;
pub mod patterns;
pub mod table;
pub mod xref;

pub use anchor::find_anchor;
pub use table::{extract_name_table, NameTable};
pub use xref::{walk_code_reference, CodeReferenceChain};

use crate::image::ByteView;

/// Step a cursor from `from` through `view`, returning the first offset where `matcher` yields a
/// value. `matcher` sees the bytes from the cursor to the end of the view.
pub(crate) fn scan_forward<T>(
    view: ByteView<'_>,
    from: usize,
    mut matcher: impl FnMut(u64, &[u8]) -> Option<T>,
) -> Option<(usize, T)> {
    (from..view.bytes.len()).find_map(|offset| {
        matcher(view.address_of(offset), &view.bytes[offset..]).map(|found| (offset, found))
    })
}
