use crate::checksum;
use crate::error::{BpsError, Result};
use crate::varint::{self, ByteCursor};

pub const MAGIC: &[u8; 4] = b"BPS1";

/// Source checksum, target checksum and patch checksum, four bytes each.
pub const FOOTER_LEN: usize = 12;

/// A validated BPS container. Metadata and actions borrow from the patch bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BpsPatch<'a> {
    pub source_size: u64,
    pub target_size: u64,
    pub metadata: &'a str,
    pub actions: &'a [u8],
    pub source_checksum: u32,
    pub target_checksum: u32,
    pub patch_checksum: u32,
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

impl<'a> BpsPatch<'a> {
    /// Parse and validate a patch file.
    ///
    /// The footer is read and the whole-file checksum verified before any
    /// other field is trusted.
    pub fn parse(patch: &'a [u8]) -> Result<Self> {
        if patch.len() < MAGIC.len() || &patch[..MAGIC.len()] != MAGIC {
            let found = patch[..patch.len().min(MAGIC.len())].to_vec();
            return Err(BpsError::BadMagic { found });
        }
        if patch.len() < MAGIC.len() + FOOTER_LEN {
            return Err(BpsError::TruncatedPatch { field: "footer" });
        }

        let footer_start = patch.len() - FOOTER_LEN;
        let footer = &patch[footer_start..];
        let source_checksum = read_u32_le(&footer[0..4]);
        let target_checksum = read_u32_le(&footer[4..8]);
        let patch_checksum = read_u32_le(&footer[8..12]);

        checksum::verify_patch(patch_checksum, &patch[..patch.len() - 4])?;

        let mut body = ByteCursor::new(&patch[MAGIC.len()..footer_start]);
        let source_size = varint::decode(&mut body).required("source size")?;
        let target_size = varint::decode(&mut body).required("target size")?;
        let metadata_size = varint::decode(&mut body).required("metadata size")?;

        let metadata_len = usize::try_from(metadata_size).map_err(|_| BpsError::ValueOverflow {
            field: "metadata size",
        })?;
        let metadata = body
            .take(metadata_len)
            .ok_or(BpsError::TruncatedPatch { field: "metadata" })?;
        let metadata = std::str::from_utf8(metadata)?;

        Ok(Self {
            source_size,
            target_size,
            metadata,
            actions: body.rest(),
            source_checksum,
            target_checksum,
            patch_checksum,
        })
    }

    /// Check that `source` is the file this patch was made against.
    pub fn verify_source(&self, source: &[u8]) -> Result<()> {
        let actual = source.len() as u64;
        if actual != self.source_size {
            return Err(BpsError::SourceSizeMismatch {
                expected: self.source_size,
                actual,
            });
        }
        checksum::verify_source(self.source_checksum, source)
    }
}
