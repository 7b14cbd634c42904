//! Module images: a loaded-layout byte view of a PE module plus its section table.
//!
//! "Loaded layout" means a byte at offset `o` of the view lives at address `base + o`, exactly as
//! the Windows loader maps the image. Images come either from a module already loaded in the
//! current process ([`LoadedModule`]) or from a PE file on disk mapped by hand ([`ImageFile`]),
//! so the discovery pipeline can also run offline against a copy of the host binary.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use goblin::pe::header::Header;
use goblin::pe::section_table::SectionTable;

use crate::error::{DiscoveryError, DiscoveryResult};

#[cfg(windows)]
mod loaded;
mod sections;

pub use sections::{locate_sections, SectionLookup, SectionRange};

const PE_MAGIC_SIZE: usize = 4;
const COFF_HEADER_SIZE: usize = 20;
/// Refuse to map images claiming more than 1 GiB.
const MAX_IMAGE_SIZE: usize = 0x4000_0000;

/// One entry of a module's section table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    /// Raw 8-byte name, NUL padded.
    pub name: [u8; 8],
    /// Offset of the section from the image base.
    pub virtual_address: u32,
    pub virtual_size: u32,
}

impl SectionHeader {
    /// Build a header from a textual name. Names longer than 8 bytes are truncated, as the PE
    /// format does.
    pub fn new(name: &str, virtual_address: u32, virtual_size: u32) -> Self {
        let mut raw = [0u8; 8];
        let len = name.len().min(raw.len());
        raw[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self { name: raw, virtual_address, virtual_size }
    }

    /// Name bytes without the NUL padding.
    pub fn name_bytes(&self) -> &[u8] {
        let len = self.name.iter().position(|b| *b == 0).unwrap_or(self.name.len());
        &self.name[..len]
    }

    pub fn display_name(&self) -> String {
        String::from_utf8_lossy(self.name_bytes()).into_owned()
    }

    fn from_table(section: &SectionTable) -> Self {
        // Some linkers leave VirtualSize empty; the raw size is the best remaining bound.
        let virtual_size = if section.virtual_size == 0 {
            section.size_of_raw_data
        } else {
            section.virtual_size
        };
        Self { name: section.name, virtual_address: section.virtual_address, virtual_size }
    }
}

/// A contiguous run of image bytes together with the absolute address of its first byte.
#[derive(Debug, Clone, Copy)]
pub struct ByteView<'a> {
    pub start: u64,
    pub bytes: &'a [u8],
}

impl<'a> ByteView<'a> {
    pub fn new(start: u64, bytes: &'a [u8]) -> Self {
        Self { start, bytes }
    }

    pub fn end(&self) -> u64 {
        self.start + self.bytes.len() as u64
    }

    pub fn address_of(&self, offset: usize) -> u64 {
        self.start + offset as u64
    }

    pub fn offset_of(&self, addr: u64) -> Option<usize> {
        if addr < self.start || addr >= self.end() {
            return None;
        }
        Some((addr - self.start) as usize)
    }
}

/// Loaded-layout view of a PE module.
#[derive(Debug, Clone)]
pub struct ModuleImage<'a> {
    base: u64,
    data: Cow<'a, [u8]>,
    sections: Vec<SectionHeader>,
}

struct ParsedHeaders {
    image_base: u64,
    size_of_image: usize,
    size_of_headers: usize,
    sections: Vec<SectionTable>,
}

fn invalid(err: impl std::fmt::Display) -> DiscoveryError {
    DiscoveryError::InvalidImage(err.to_string())
}

/// Parse the DOS, NT and section headers. Headers sit at the same offsets in the file and in
/// the loaded image, so this works on both layouts.
fn parse_headers(bytes: &[u8]) -> DiscoveryResult<ParsedHeaders> {
    let header = Header::parse(bytes).map_err(invalid)?;
    let optional = header.optional_header.ok_or_else(|| invalid("missing optional header"))?;
    let mut offset = header.dos_header.pe_pointer as usize
        + PE_MAGIC_SIZE
        + COFF_HEADER_SIZE
        + header.coff_header.size_of_optional_header as usize;
    let sections = header.coff_header.sections(bytes, &mut offset).map_err(invalid)?;
    Ok(ParsedHeaders {
        image_base: optional.windows_fields.image_base,
        size_of_image: optional.windows_fields.size_of_image as usize,
        size_of_headers: optional.windows_fields.size_of_headers as usize,
        sections,
    })
}

impl<'a> ModuleImage<'a> {
    /// Assemble an image from an already mapped view and a section table.
    pub fn from_parts(
        base: u64,
        data: impl Into<Cow<'a, [u8]>>,
        sections: Vec<SectionHeader>,
    ) -> Self {
        Self { base, data: data.into(), sections }
    }

    /// Wrap a view that is already in loaded layout (for example a module mapped by the OS
    /// loader) and read its section table from the mapped headers.
    pub fn from_mapped(base: u64, data: &'a [u8]) -> DiscoveryResult<Self> {
        let headers = parse_headers(data)?;
        let sections = headers.sections.iter().map(SectionHeader::from_table).collect();
        Ok(Self::from_parts(base, data, sections))
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn end(&self) -> u64 {
        self.base + self.data.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn sections(&self) -> &[SectionHeader] {
        &self.sections
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.end()
    }

    fn offset_of(&self, addr: u64) -> Option<usize> {
        self.contains(addr).then(|| (addr - self.base) as usize)
    }

    /// Read `len` bytes at `addr`; `None` if any of them falls outside the image.
    pub fn read(&self, addr: u64, len: usize) -> Option<&[u8]> {
        let start = addr.checked_sub(self.base)? as usize;
        let end = start.checked_add(len)?;
        self.data.get(start..end)
    }

    /// View over a located section range.
    pub fn view(&self, range: SectionRange) -> DiscoveryResult<ByteView<'_>> {
        let bytes = self.read(range.start, range.size as usize).ok_or_else(|| {
            invalid(format!(
                "section range 0x{:X}+0x{:X} exceeds image (0x{:X}-0x{:X})",
                range.start,
                range.size,
                self.base,
                self.end()
            ))
        })?;
        Ok(ByteView::new(range.start, bytes))
    }

    /// Read the NUL-terminated string at `addr`. Invalid UTF-8 is replaced lossily; a string
    /// running off the end of the image yields `None`.
    pub fn c_string_at(&self, addr: u64) -> Option<String> {
        let start = self.offset_of(addr)?;
        let tail = &self.data[start..];
        let len = memchr::memchr(0, tail)?;
        Some(String::from_utf8_lossy(&tail[..len]).into_owned())
    }

    /// Bytes from `before` ahead of `addr` up to `after` past it, clamped to the image.
    pub fn window(&self, addr: u64, before: usize, after: usize) -> &[u8] {
        let Some(center) = self.offset_of(addr) else {
            return &[];
        };
        let start = center.saturating_sub(before);
        let end = center.saturating_add(after).min(self.data.len());
        &self.data[start..end]
    }

    pub fn into_owned(self) -> ModuleImage<'static> {
        ModuleImage {
            base: self.base,
            data: Cow::Owned(self.data.into_owned()),
            sections: self.sections,
        }
    }
}

impl ModuleImage<'static> {
    /// Map a PE file's bytes into loaded layout: headers at offset zero, each section's raw
    /// data at its virtual address, everything else zero filled. The base is the image's
    /// preferred base address.
    pub fn from_file_bytes(bytes: &[u8]) -> DiscoveryResult<Self> {
        let headers = parse_headers(bytes)?;
        if headers.size_of_image == 0 || headers.size_of_image > MAX_IMAGE_SIZE {
            return Err(invalid(format!("implausible SizeOfImage 0x{:X}", headers.size_of_image)));
        }

        let mut mapped = vec![0u8; headers.size_of_image];
        let header_len = headers.size_of_headers.min(bytes.len()).min(mapped.len());
        mapped[..header_len].copy_from_slice(&bytes[..header_len]);

        let mut sections = Vec::with_capacity(headers.sections.len());
        for table in &headers.sections {
            let section = SectionHeader::from_table(table);
            let raw_start = table.pointer_to_raw_data as usize;
            let len = (table.size_of_raw_data as usize).min(section.virtual_size as usize);
            let va = section.virtual_address as usize;
            if len > 0 {
                let raw = bytes.get(raw_start..raw_start + len).ok_or_else(|| {
                    invalid(format!(
                        "raw data of section {} exceeds file size",
                        section.display_name()
                    ))
                })?;
                let dest = mapped.get_mut(va..va + len).ok_or_else(|| {
                    invalid(format!("section {} exceeds SizeOfImage", section.display_name()))
                })?;
                dest.copy_from_slice(raw);
            }
            sections.push(section);
        }

        Ok(Self { base: headers.image_base, data: Cow::Owned(mapped), sections })
    }

    /// Read a PE file from disk and map it with [`ModuleImage::from_file_bytes`].
    pub fn from_file(path: &Path) -> DiscoveryResult<Self> {
        let bytes = std::fs::read(path)
            .map_err(|source| DiscoveryError::ReadImage { path: path.to_path_buf(), source })?;
        Self::from_file_bytes(&bytes)
    }

    /// View a module loaded in the current process in place.
    ///
    /// The view is `'static` on the assumption that the host keeps the module loaded for the
    /// rest of the process lifetime.
    #[cfg(windows)]
    pub fn from_loaded_module(name: &str) -> DiscoveryResult<Self> {
        loaded::module_image(name)
    }

    #[cfg(not(windows))]
    pub fn from_loaded_module(name: &str) -> DiscoveryResult<Self> {
        Err(DiscoveryError::Unsupported(format!("in-process lookup of module {name}")))
    }
}

/// Where a resolver gets its module image from.
pub trait ImageSource: Send + Sync {
    fn open(&self) -> DiscoveryResult<ModuleImage<'static>>;
    fn name(&self) -> String;
}

/// A module already loaded in the current process, looked up by name.
#[derive(Debug, Clone)]
pub struct LoadedModule {
    module: String,
}

impl LoadedModule {
    pub fn new(module: impl Into<String>) -> Self {
        Self { module: module.into() }
    }
}

impl ImageSource for LoadedModule {
    fn open(&self) -> DiscoveryResult<ModuleImage<'static>> {
        ModuleImage::from_loaded_module(&self.module)
    }

    fn name(&self) -> String {
        self.module.clone()
    }
}

/// A PE file on disk, mapped into loaded layout on open.
#[derive(Debug, Clone)]
pub struct ImageFile {
    path: PathBuf,
}

impl ImageFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageSource for ImageFile {
    fn open(&self) -> DiscoveryResult<ModuleImage<'static>> {
        ModuleImage::from_file(&self.path)
    }

    fn name(&self) -> String {
        self.path.display().to_string()
    }
}
