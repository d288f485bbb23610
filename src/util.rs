use anyhow::{Context, Result};
use memmap2::Mmap;
use std::path::Path;

/// Memory-map a file for read-only access.
///
/// # Safety
/// The mapping is read-only. Callers must not concurrently truncate or replace
/// the underlying file while the `Mmap` is live.
pub fn mmap_file(path: &Path) -> Result<Mmap> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    // SAFETY: We only read from this mapping; inputs are not modified while patching.
    unsafe {
        Mmap::map(&file)
            .with_context(|| format!("Failed to memory-map file: {}", path.display()))
    }
}

/// True when both paths resolve to the same existing file.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Write `data` to a sibling temporary file, then rename it over `path`.
/// A failed write never leaves a partial file at `path`.
pub async fn write_replacing(path: &Path, data: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .with_context(|| format!("Output path has no file name: {}", path.display()))?;
    let mut partial_name = file_name.to_os_string();
    partial_name.push(".partial");
    let partial = path.with_file_name(partial_name);

    let result: Result<()> = async {
        tokio::fs::write(&partial, data)
            .await
            .with_context(|| format!("Failed to write file: {}", partial.display()))?;
        tokio::fs::rename(&partial, path)
            .await
            .with_context(|| format!("Failed to move {} into place", partial.display()))?;
        Ok(())
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&partial).await;
    }
    result
}
