use anyhow::{Context, Result};
use log::{debug, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use bpspatch::{ActionReader, ApplyStats, BpsPatch};

use crate::util;

pub struct PatchInfo {
    pub source_size: u64,
    pub target_size: u64,
    pub metadata: String,
    pub action_bytes: usize,
    pub source_checksum: u32,
    pub target_checksum: u32,
    pub patch_checksum: u32,
    pub stats: ApplyStats,
}

pub struct VerifyOutcome {
    pub path: PathBuf,
    pub result: Result<PatchInfo>,
}

/// Decode the whole action stream without executing it.
/// Catches framing errors (truncated varints, short literal runs) up front.
fn scan_actions(patch: &BpsPatch<'_>) -> bpspatch::Result<ApplyStats> {
    let mut stats = ApplyStats::default();
    for action in ActionReader::new(patch.actions) {
        stats.record(&action?);
    }
    Ok(stats)
}

fn describe(patch: &BpsPatch<'_>) -> bpspatch::Result<PatchInfo> {
    let stats = scan_actions(patch)?;
    Ok(PatchInfo {
        source_size: patch.source_size,
        target_size: patch.target_size,
        metadata: patch.metadata.to_owned(),
        action_bytes: patch.actions.len(),
        source_checksum: patch.source_checksum,
        target_checksum: patch.target_checksum,
        patch_checksum: patch.patch_checksum,
        stats,
    })
}

/// Parse a patch file and summarise its header and action stream.
pub fn patch_info(patch_path: &Path) -> Result<PatchInfo> {
    verify_one(patch_path, None)
}

fn verify_one(patch_path: &Path, source: Option<&[u8]>) -> Result<PatchInfo> {
    let raw = util::mmap_file(patch_path)?;
    let patch = bpspatch::parse(&raw)
        .with_context(|| format!("Invalid patch file: {}", patch_path.display()))?;
    let info = describe(&patch)
        .with_context(|| format!("Malformed action stream in: {}", patch_path.display()))?;
    if let Some(source) = source {
        patch
            .verify_source(source)
            .with_context(|| format!("Source does not match: {}", patch_path.display()))?;
    }
    Ok(info)
}

/// Validate many patch files in parallel, optionally against one source file.
/// Results come back in the order the paths were given.
pub fn verify_patches(
    patch_paths: &[PathBuf],
    source_path: Option<&Path>,
) -> Result<Vec<VerifyOutcome>> {
    let source = source_path.map(util::mmap_file).transpose()?;
    if let (Some(path), Some(map)) = (source_path, &source) {
        debug!(
            "Verifying against source {} ({} bytes)",
            path.display(),
            map.len()
        );
    }

    let outcomes: Vec<VerifyOutcome> = patch_paths
        .par_iter()
        .map(|path| {
            let result = verify_one(path, source.as_deref());
            if let Err(e) = &result {
                warn!("{}: {:#}", path.display(), e);
            }
            VerifyOutcome {
                path: path.clone(),
                result,
            }
        })
        .collect();

    Ok(outcomes)
}
