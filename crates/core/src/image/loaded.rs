use std::ffi::c_void;

use super::{parse_headers, ModuleImage};
use crate::error::{DiscoveryError, DiscoveryResult};

/// The DOS, NT and section headers of any module fit in its first page.
const HEADER_PAGE: usize = 0x1000;

#[link(name = "kernel32")]
extern "system" {
    fn GetModuleHandleW(module_name: *const u16) -> *mut c_void;
}

pub(super) fn module_image(name: &str) -> DiscoveryResult<ModuleImage<'static>> {
    let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
    // SAFETY: `wide` is NUL terminated and outlives the call.
    let handle = unsafe { GetModuleHandleW(wide.as_ptr()) };
    if handle.is_null() {
        return Err(DiscoveryError::ModuleNotLoaded(name.to_string()));
    }
    let base = handle as *const u8;

    // SAFETY: a module handle is the base address of the mapped image, whose header page is
    // always mapped readable.
    let header_page = unsafe { std::slice::from_raw_parts(base, HEADER_PAGE) };
    let size_of_image = parse_headers(header_page)?.size_of_image.max(HEADER_PAGE);

    // SAFETY: SizeOfImage bytes from the base are reserved for this module by the loader, and
    // the module stays loaded for the rest of the process lifetime.
    let data: &'static [u8] = unsafe { std::slice::from_raw_parts(base, size_of_image) };
    ModuleImage::from_mapped(base as u64, data)
}
