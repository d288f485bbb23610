use crate::error::{BpsError, Result};

/// CRC32 (IEEE) of `data`, the checksum used by all three BPS footer fields.
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

pub fn verify_source(expected: u32, source: &[u8]) -> Result<()> {
    let actual = crc32(source);
    if actual != expected {
        return Err(BpsError::SourceChecksumMismatch { expected, actual });
    }
    Ok(())
}

pub fn verify_target(expected: u32, target: &[u8]) -> Result<()> {
    let actual = crc32(target);
    if actual != expected {
        return Err(BpsError::TargetChecksumMismatch { expected, actual });
    }
    Ok(())
}

/// Check the whole-file checksum: CRC32 of every byte before the last four.
pub fn verify_patch(expected: u32, covered: &[u8]) -> Result<()> {
    let actual = crc32(covered);
    if actual != expected {
        return Err(BpsError::CorruptPatch { expected, actual });
    }
    Ok(())
}
