//! unalias-core
//!
//! Core library for recovering the original export names of an aliased native runtime
//! library from the host binary that loads it.
//!
//! The host's loader embeds a table of the library's original export names in its own code
//! section. This crate locates that table (section lookup, anchor string, code reference,
//! table decoding), caches it keyed by the library's file size, and exposes a read-only
//! name translation built from it.
//!
//! All substantive logic lives here so it is testable and reusable from multiple frontends
//! (the `unalias` CLI and the in-process `unalias-host` library).

pub mod cache;
pub mod config;
#[cfg(feature = "disasm")]
pub mod disasm;
pub mod discovery;
pub mod error;
pub mod image;
pub mod mapper;
pub mod resolver;
pub mod scan;

pub use config::{load_config, CacheConfig, ResolverConfig};
pub use discovery::{discover, DiscoveryPlan, DiscoveryReport};
pub use error::{DiscoveryError, ErrorKind};
pub use image::{ImageFile, ImageSource, LoadedModule, ModuleImage, SectionHeader};
pub use mapper::NameMapping;
pub use resolver::NameResolver;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
