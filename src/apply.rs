use anyhow::{bail, Context, Result};
use log::debug;
use std::path::Path;
use std::time::Instant;

use bpspatch::ApplyStats;

use crate::util;

pub struct ApplySummary {
    pub source_size: u64,
    pub target_size: u64,
    pub metadata: String,
    pub stats: ApplyStats,
}

/// Apply the patch at `patch_path` to `source_path` and write the result to `output_path`.
/// Parsing and reconstruction run on a blocking thread; the output is only
/// written once the target has passed every check, and is replaced atomically.
pub async fn apply_patch(
    source_path: &Path,
    patch_path: &Path,
    output_path: &Path,
) -> Result<ApplySummary> {
    if util::same_file(source_path, output_path) {
        bail!(
            "Refusing to overwrite the source file: {}",
            output_path.display()
        );
    }

    let source_owned = source_path.to_path_buf();
    let patch_owned = patch_path.to_path_buf();

    let (target, summary) = tokio::task::spawn_blocking(move || -> Result<(Vec<u8>, ApplySummary)> {
        let raw = util::mmap_file(&patch_owned)?;
        let source = util::mmap_file(&source_owned)?;
        debug!(
            "Loaded patch ({} bytes) and source ({} bytes)",
            raw.len(),
            source.len()
        );

        let patch = bpspatch::parse(&raw)
            .with_context(|| format!("Invalid patch file: {}", patch_owned.display()))?;
        debug!(
            "Patch header: source {} bytes, target {} bytes, {} bytes of actions",
            patch.source_size,
            patch.target_size,
            patch.actions.len()
        );

        let start = Instant::now();
        let (target, stats) = bpspatch::apply_with_stats(&patch, &source).with_context(|| {
            format!(
                "Failed to apply {} to {}",
                patch_owned.display(),
                source_owned.display()
            )
        })?;
        debug!(
            "Executed {} actions in {:.3}s",
            stats.actions(),
            start.elapsed().as_secs_f64()
        );

        let summary = ApplySummary {
            source_size: patch.source_size,
            target_size: patch.target_size,
            metadata: patch.metadata.to_owned(),
            stats,
        };
        Ok((target, summary))
    })
    .await??;

    util::write_replacing(output_path, &target)
        .await
        .with_context(|| format!("Failed to write patched file: {}", output_path.display()))?;

    Ok(summary)
}
