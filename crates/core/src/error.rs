use std::path::PathBuf;

use thiserror::Error;

/// Broad classification of a discovery failure, used for log records and CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The module, file or a required section is not available.
    Environment,
    /// The image is present but one of the expected byte patterns is not.
    PatternNotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Environment => "environment",
            ErrorKind::PatternNotFound => "pattern-not-found",
        }
    }
}

/// Error type for the discovery pipeline.
///
/// Every variant is fatal to a single discovery run. The resolver never surfaces these to its
/// callers; it logs them and degrades to passthrough.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Module not loaded in this process: {0}")]
    ModuleNotLoaded(String),

    #[error("Invalid PE image: {0}")]
    InvalidImage(String),

    #[error("Failed to read image {path}: {source}")]
    ReadImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Section not found: {0}")]
    MissingSection(String),

    #[error("Anchor {0:?} not found in data section")]
    AnchorNotFound(String),

    #[error("No code reference to anchor at 0x{0:X}")]
    ReferenceNotFound(u64),

    #[error("No call instruction after reference at 0x{0:X}")]
    CallNotFound(u64),

    #[error("Call target 0x{target:X} lies outside the code section (0x{start:X}-0x{end:X})")]
    CallTargetOutOfRange { target: u64, start: u64, end: u64 },

    #[error("Unreadable string at 0x{target:X} referenced from 0x{at:X}")]
    UnreadableString { at: u64, target: u64 },

    #[error("Unsupported on this platform: {0}")]
    Unsupported(String),
}

impl DiscoveryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiscoveryError::ModuleNotLoaded(_)
            | DiscoveryError::InvalidImage(_)
            | DiscoveryError::ReadImage { .. }
            | DiscoveryError::MissingSection(_)
            | DiscoveryError::Unsupported(_) => ErrorKind::Environment,
            DiscoveryError::AnchorNotFound(_)
            | DiscoveryError::ReferenceNotFound(_)
            | DiscoveryError::CallNotFound(_)
            | DiscoveryError::CallTargetOutOfRange { .. }
            | DiscoveryError::UnreadableString { .. } => ErrorKind::PatternNotFound,
        }
    }
}

/// Convenience result type for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;
