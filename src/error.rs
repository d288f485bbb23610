use std::fmt;

use thiserror::Error;

/// Buffer an instruction tried to read from or write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Source,
    Target,
    Actions,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Source => f.write_str("source"),
            Region::Target => f.write_str("target"),
            Region::Actions => f.write_str("action stream"),
        }
    }
}

/// Every way parsing or applying a patch can fail. All variants are terminal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BpsError {
    #[error("Magic header {found:?} is incorrect (expected \"BPS1\")")]
    BadMagic { found: Vec<u8> },

    #[error("Patch checksum {expected:#010X} does not match actual checksum {actual:#010X}")]
    CorruptPatch { expected: u32, actual: u32 },

    #[error("Patch is truncated while reading {field}")]
    TruncatedPatch { field: &'static str },

    #[error("Patch metadata is not valid UTF-8: {0}")]
    InvalidMetadata(#[from] std::str::Utf8Error),

    #[error("Value of {field} does not fit in a machine integer")]
    ValueOverflow { field: &'static str },

    #[error("Cannot allocate a target buffer of {target_size} bytes")]
    TargetTooLarge { target_size: u64 },

    #[error("Source size {actual} does not match expected {expected}")]
    SourceSizeMismatch { expected: u64, actual: u64 },

    #[error("Source checksum {actual:#010X} does not match expected {expected:#010X}")]
    SourceChecksumMismatch { expected: u32, actual: u32 },

    #[error("Read of {length} bytes at offset {offset} is outside the {region} ({size} bytes)")]
    OutOfBounds {
        region: Region,
        offset: i64,
        length: u64,
        size: u64,
    },

    #[error("Write of {length} bytes at offset {offset} overflows target of {target_size} bytes")]
    TargetOverflow {
        offset: u64,
        length: u64,
        target_size: u64,
    },

    #[error("Action stream ended after {actual} bytes of a {expected} byte target")]
    IncompleteTarget { expected: u64, actual: u64 },

    #[error("Target checksum {actual:#010X} does not match expected {expected:#010X}")]
    TargetChecksumMismatch { expected: u32, actual: u32 },
}

pub type Result<T> = std::result::Result<T, BpsError>;
