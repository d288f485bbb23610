//! Decode and apply BPS binary patches.
//!
//! A BPS file carries the sizes of a source and target blob, a free-form
//! metadata string, a stream of copy instructions, and CRC32 checksums of the
//! source, the target and the patch itself. [`parse`] validates the container,
//! [`apply`] rebuilds the target from a matching source.
//!
//! ```no_run
//! # fn main() -> bpspatch::Result<()> {
//! let patch_bytes = std::fs::read("game.bps").unwrap();
//! let source = std::fs::read("game.sfc").unwrap();
//! let patch = bpspatch::parse(&patch_bytes)?;
//! let target = bpspatch::apply(&patch, &source)?;
//! # Ok(())
//! # }
//! ```

pub mod binary_patch;
pub mod checksum;
pub mod error;
pub mod patch_format;
pub mod varint;

pub use binary_patch::{Action, ActionReader, ApplyStats, RunState};
pub use error::{BpsError, Region, Result};
pub use patch_format::BpsPatch;

/// Parse and validate a patch file held in memory.
pub fn parse(patch: &[u8]) -> Result<BpsPatch<'_>> {
    BpsPatch::parse(patch)
}

/// Apply `patch` to `source`, returning the verified target.
pub fn apply(patch: &BpsPatch<'_>, source: &[u8]) -> Result<Vec<u8>> {
    apply_with_stats(patch, source).map(|(target, _)| target)
}

/// Like [`apply`], also reporting what the action stream did.
///
/// The source is checked before any instruction runs, and the target is only
/// returned once it is complete and matches its checksum.
pub fn apply_with_stats(patch: &BpsPatch<'_>, source: &[u8]) -> Result<(Vec<u8>, ApplyStats)> {
    patch.verify_source(source)?;

    let too_large = || BpsError::TargetTooLarge {
        target_size: patch.target_size,
    };
    let target_size = usize::try_from(patch.target_size).map_err(|_| too_large())?;
    let mut target: Vec<u8> = Vec::new();
    target
        .try_reserve_exact(target_size)
        .map_err(|_| too_large())?;
    target.resize(target_size, 0);
    let mut state = RunState::default();
    let mut stats = ApplyStats::default();

    for action in ActionReader::new(patch.actions) {
        let action = action?;
        state.execute(&action, source, &mut target)?;
        stats.record(&action);
    }

    if state.output_offset != target_size {
        return Err(BpsError::IncompleteTarget {
            expected: patch.target_size,
            actual: state.output_offset as u64,
        });
    }
    checksum::verify_target(patch.target_checksum, &target)?;

    Ok((target, stats))
}
