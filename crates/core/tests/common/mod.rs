//! Synthetic host binary shared by the integration tests.
//!
//! Layout (RVAs):
//! - `.text` at 0x1000: a decoy `movups` at +0x20 pointing at another string, the real
//!   anchor reference at +0x30, a call at +0x3C into the table routine at +0x100.
//! - `.rdata` at 0x2000: a decoy string at +0x40, the anchor at +0x100, names from +0x200.
//!
//! On-disk copies are written with `object`'s PE writer.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use object::pe;
use object::write::pe::{NtHeaders, Writer};
use unalias_core::{ModuleImage, SectionHeader};

pub const BASE: u64 = 0x1_8000_0000;
pub const TEXT_RVA: u32 = 0x1000;
pub const RDATA_RVA: u32 = 0x2000;
pub const TEXT_LEN: usize = 0x800;
pub const RDATA_LEN: usize = 0x400;

pub const ANCHOR: &str = "GameAssembly.dll";
pub const DECOY_OFFSET: usize = 0x40;
pub const ANCHOR_OFFSET: usize = 0x100;
pub const NAMES_OFFSET: usize = 0x200;

pub const DECOY_REF_OFFSET: usize = 0x20;
pub const REFERENCE_OFFSET: usize = 0x30;
pub const CALL_OFFSET: usize = 0x3C;
pub const ROUTINE_OFFSET: usize = 0x100;

const SECTION_ALIGNMENT: u32 = 0x1000;
const FILE_ALIGNMENT: u32 = 0x200;

/// Name decoded after the terminator; must never show up in a table.
pub const PAST_TERMINATOR: &str = "il2cpp_past_terminator";

pub fn text_addr(offset: usize) -> u64 {
    BASE + TEXT_RVA as u64 + offset as u64
}

pub fn rdata_addr(offset: usize) -> u64 {
    BASE + RDATA_RVA as u64 + offset as u64
}

fn rel32(insn_addr: u64, insn_len: usize, target: u64) -> [u8; 4] {
    let next = (insn_addr + insn_len as u64) as i64;
    ((target as i64 - next) as i32).to_le_bytes()
}

fn put(buf: &mut [u8], offset: usize, bytes: &[u8]) {
    buf[offset..offset + bytes.len()].copy_from_slice(bytes);
}

#[derive(Debug, Clone)]
pub struct HostFixture {
    pub names: Vec<String>,
    pub terminated: bool,
    pub with_anchor: bool,
    pub with_reference: bool,
    pub with_call: bool,
    pub call_past_text: bool,
    pub stray_entry: bool,
}

impl HostFixture {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            terminated: true,
            with_anchor: true,
            with_reference: true,
            with_call: true,
            call_past_text: false,
            stray_entry: false,
        }
    }

    pub fn unterminated(mut self) -> Self {
        self.terminated = false;
        self
    }

    pub fn without_anchor(mut self) -> Self {
        self.with_anchor = false;
        self
    }

    pub fn without_reference(mut self) -> Self {
        self.with_reference = false;
        self
    }

    /// No call anywhere after the anchor reference; the table routine is left out too.
    pub fn without_call(mut self) -> Self {
        self.with_call = false;
        self
    }

    /// The call lands past the end of `.text`, in the alignment padding before `.rdata`.
    pub fn call_past_text(mut self) -> Self {
        self.call_past_text = true;
        self
    }

    /// The first table entry points outside the image.
    pub fn stray_entry(mut self) -> Self {
        self.stray_entry = true;
        self
    }

    /// Address the call lands on.
    pub fn call_target(&self) -> u64 {
        if self.call_past_text {
            text_addr(TEXT_LEN + 0x100)
        } else {
            text_addr(ROUTINE_OFFSET)
        }
    }

    /// Where the first table entry points when [`HostFixture::stray_entry`] is set.
    pub fn stray_target() -> u64 {
        BASE + 0x10_0000
    }

    /// Raw `.text` and `.rdata` contents.
    pub fn sections(&self) -> (Vec<u8>, Vec<u8>) {
        let mut rdata = vec![0u8; RDATA_LEN];
        put(&mut rdata, DECOY_OFFSET, b"KERNEL32.dll\0");
        let anchor = if self.with_anchor { b"GameAssembly.dll\0" } else { b"GameAssembly.exe\0" };
        put(&mut rdata, ANCHOR_OFFSET, anchor);

        let mut string_at = NAMES_OFFSET;
        let mut name_addrs = Vec::with_capacity(self.names.len());
        for name in self.names.iter().map(String::as_str).chain([PAST_TERMINATOR]) {
            name_addrs.push(rdata_addr(string_at));
            put(&mut rdata, string_at, name.as_bytes());
            string_at += name.len() + 1;
        }

        let mut text = vec![0u8; TEXT_LEN];
        put(&mut text, 0, &[0xCC; 0x20]);

        let decoy = text_addr(DECOY_REF_OFFSET);
        put(&mut text, DECOY_REF_OFFSET, &[0x0F, 0x10, 0x05]);
        put(&mut text, DECOY_REF_OFFSET + 3, &rel32(decoy, 7, rdata_addr(DECOY_OFFSET)));

        let reference = text_addr(REFERENCE_OFFSET);
        let referenced = if self.with_reference {
            rdata_addr(ANCHOR_OFFSET)
        } else {
            rdata_addr(ANCHOR_OFFSET + 1)
        };
        put(&mut text, REFERENCE_OFFSET, &[0x0F, 0x10, 0x05]);
        put(&mut text, REFERENCE_OFFSET + 3, &rel32(reference, 7, referenced));
        // lea rcx, [rsp+20h]
        put(&mut text, REFERENCE_OFFSET + 7, &[0x48, 0x8D, 0x4C, 0x24, 0x20]);

        if !self.with_call {
            put(&mut text, CALL_OFFSET, &[0x90, 0xC3]);
            return (text, rdata);
        }

        let call = text_addr(CALL_OFFSET);
        put(&mut text, CALL_OFFSET, &[0xE8]);
        put(&mut text, CALL_OFFSET + 1, &rel32(call, 5, self.call_target()));
        put(&mut text, CALL_OFFSET + 5, &[0x90, 0xC3]);

        // sub rsp, 28h
        let mut cursor = ROUTINE_OFFSET;
        put(&mut text, cursor, &[0x48, 0x83, 0xEC, 0x28]);
        cursor += 4;
        let (table, past) = name_addrs.split_at(self.names.len());
        for (index, target) in table.iter().enumerate() {
            let target = if self.stray_entry && index == 0 { Self::stray_target() } else { *target };
            cursor = emit_entry(&mut text, cursor, target);
        }
        if self.terminated {
            put(&mut text, cursor, &[0x48, 0x8D, 0x98, 0x98, 0xCD, 0x00, 0x00]);
            cursor += 7;
            cursor = emit_entry(&mut text, cursor, past[0]);
            put(&mut text, cursor, &[0xC3]);
        }

        (text, rdata)
    }

    /// Loaded-layout image assembled directly from the sections.
    pub fn image(&self) -> ModuleImage<'static> {
        let (text, rdata) = self.sections();
        let mut mapped = vec![0u8; 0x3000];
        put(&mut mapped, 0, b"MZ");
        put(&mut mapped, TEXT_RVA as usize, &text);
        put(&mut mapped, RDATA_RVA as usize, &rdata);
        let sections = vec![
            SectionHeader::new(".text", TEXT_RVA, TEXT_LEN as u32),
            SectionHeader::new(".rdata", RDATA_RVA, RDATA_LEN as u32),
        ];
        ModuleImage::from_parts(BASE, mapped, sections)
    }

    /// The same image as a PE file on disk would hold it.
    pub fn pe_bytes(&self) -> Vec<u8> {
        let (text, rdata) = self.sections();
        pe_file(&text, &rdata)
    }

    pub fn write_pe(&self, dir: &Path) -> PathBuf {
        let path = dir.join("UnityPlayer.dll");
        std::fs::write(&path, self.pe_bytes()).expect("write fixture PE");
        path
    }
}

/// A PE32+ DLL based at [`BASE`] with `.text` at [`TEXT_RVA`] followed by `.rdata`.
pub fn pe_file(text: &[u8], rdata: &[u8]) -> Vec<u8> {
    let mut buffer = Vec::new();
    let mut writer = Writer::new(true, SECTION_ALIGNMENT, FILE_ALIGNMENT, &mut buffer);

    writer.reserve_dos_header();
    writer.reserve_nt_headers(pe::IMAGE_NUMBEROF_DIRECTORY_ENTRIES);
    writer.reserve_section_headers(2);
    let text_range = writer.reserve_text_section(text.len() as u32);
    let rdata_range = writer.reserve_rdata_section(rdata.len() as u32);
    assert_eq!(text_range.virtual_address, TEXT_RVA);

    writer.write_empty_dos_header().expect("write DOS header");
    writer.write_nt_headers(NtHeaders {
        machine: pe::IMAGE_FILE_MACHINE_AMD64,
        time_date_stamp: 0,
        characteristics: pe::IMAGE_FILE_EXECUTABLE_IMAGE
            | pe::IMAGE_FILE_LARGE_ADDRESS_AWARE
            | pe::IMAGE_FILE_DLL,
        major_linker_version: 14,
        minor_linker_version: 0,
        address_of_entry_point: 0,
        image_base: BASE,
        major_operating_system_version: 6,
        minor_operating_system_version: 0,
        major_image_version: 0,
        minor_image_version: 0,
        major_subsystem_version: 6,
        minor_subsystem_version: 0,
        subsystem: pe::IMAGE_SUBSYSTEM_WINDOWS_GUI,
        dll_characteristics: 0,
        size_of_stack_reserve: 0x10_0000,
        size_of_stack_commit: 0x1000,
        size_of_heap_reserve: 0x10_0000,
        size_of_heap_commit: 0x1000,
    });
    writer.write_section_headers();
    writer.write_section(text_range.file_offset, text);
    writer.write_section(rdata_range.file_offset, rdata);
    buffer
}

/// `lea rdx, [rip+disp32]` to `target` followed by `mov [rax], rdx`.
fn emit_entry(text: &mut [u8], cursor: usize, target: u64) -> usize {
    put(text, cursor, &[0x48, 0x8D, 0x15]);
    put(text, cursor + 3, &rel32(text_addr(cursor), 7, target));
    put(text, cursor + 7, &[0x48, 0x89, 0x10]);
    cursor + 10
}

/// A target library of `len` bytes, for cache fingerprinting.
pub fn write_target_library(dir: &Path, len: usize) -> PathBuf {
    let path = dir.join("GameAssembly.dll");
    std::fs::write(&path, vec![0xAB; len]).expect("write target library");
    path
}

pub fn write_true_names(path: &Path, names: &[&str]) {
    let mut body = format!("{}\n", names.len());
    for name in names {
        body.push_str(name);
        body.push('\n');
    }
    std::fs::write(path, body).expect("write true names");
}

pub fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}
