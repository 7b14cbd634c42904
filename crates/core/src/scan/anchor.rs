use memchr::memmem;

use crate::image::ByteView;

/// Address of the first byte-exact occurrence of `marker` inside `data`.
///
/// Matches must lie entirely within the view; an empty marker never matches.
pub fn find_anchor(data: ByteView<'_>, marker: &[u8]) -> Option<u64> {
    if marker.is_empty() {
        return None;
    }
    memmem::find(data.bytes, marker).map(|offset| data.address_of(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_first_occurrence() {
        let bytes = b"xxGameAssembly.dll\0GameAssembly.dll\0";
        let view = ByteView::new(0x5000, bytes);
        assert_eq!(find_anchor(view, b"GameAssembly.dll"), Some(0x5002));
    }

    #[test]
    fn match_is_case_sensitive() {
        let view = ByteView::new(0, b"gameassembly.dll");
        assert_eq!(find_anchor(view, b"GameAssembly.dll"), None);
    }

    #[test]
    fn marker_cut_off_at_view_end_is_not_found() {
        let view = ByteView::new(0, b"....GameAssem");
        assert_eq!(find_anchor(view, b"GameAssembly.dll"), None);
        assert_eq!(find_anchor(view, b""), None);
    }
}
