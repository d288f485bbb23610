use std::ops::Range;

use crate::error::{BpsError, Region, Result};
use crate::varint::{self, ByteCursor};

/// One decoded instruction from the action stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    /// Copy `length` bytes from the source at the current output offset.
    SourceRead { length: u64 },
    /// Literal bytes carried inline in the action stream.
    TargetRead { data: &'a [u8] },
    /// Copy from the source at the source cursor, after moving it by `delta`.
    SourceCopy { length: u64, delta: i64 },
    /// Copy from already written target bytes at the target cursor, after
    /// moving it by `delta`. Overlapping runs repeat the pattern.
    TargetCopy { length: u64, delta: i64 },
}

const SOURCE_READ: u64 = 0;
const TARGET_READ: u64 = 1;
const SOURCE_COPY: u64 = 2;
const TARGET_COPY: u64 = 3;

impl Action<'_> {
    /// Number of target bytes this instruction produces.
    pub fn output_len(&self) -> u64 {
        match *self {
            Action::SourceRead { length }
            | Action::SourceCopy { length, .. }
            | Action::TargetCopy { length, .. } => length,
            Action::TargetRead { data } => data.len() as u64,
        }
    }

    /// Append this instruction's wire form to `out`.
    ///
    /// Lengths must be at least one; the format has no way to express an
    /// empty instruction.
    pub fn encode(&self, out: &mut Vec<u8>) {
        let (command, delta) = match *self {
            Action::SourceRead { .. } => (SOURCE_READ, None),
            Action::TargetRead { .. } => (TARGET_READ, None),
            Action::SourceCopy { delta, .. } => (SOURCE_COPY, Some(delta)),
            Action::TargetCopy { delta, .. } => (TARGET_COPY, Some(delta)),
        };
        debug_assert!(self.output_len() > 0, "BPS instructions cannot be empty");
        varint::encode(((self.output_len() - 1) << 2) | command, out);
        if let Action::TargetRead { data } = self {
            out.extend_from_slice(data);
        }
        if let Some(delta) = delta {
            let sign = u64::from(delta < 0);
            varint::encode((delta.unsigned_abs() << 1) | sign, out);
        }
    }
}

/// Streaming decoder over an action stream.
///
/// Yields instructions until the stream is cleanly exhausted. After an error
/// the reader yields nothing further.
#[derive(Debug, Clone)]
pub struct ActionReader<'a> {
    cursor: ByteCursor<'a>,
    size: usize,
    failed: bool,
}

impl<'a> ActionReader<'a> {
    pub fn new(actions: &'a [u8]) -> Self {
        Self {
            cursor: ByteCursor::new(actions),
            size: actions.len(),
            failed: false,
        }
    }

    /// Decode the next instruction; `Ok(None)` marks the end of the stream.
    pub fn next_action(&mut self) -> Result<Option<Action<'a>>> {
        let Some(action) = varint::decode(&mut self.cursor).optional("action")? else {
            return Ok(None);
        };
        let length = (action >> 2) + 1;

        let action = match action & 3 {
            SOURCE_READ => Action::SourceRead { length },
            TARGET_READ => Action::TargetRead {
                data: self.payload(length)?,
            },
            SOURCE_COPY => Action::SourceCopy {
                length,
                delta: self.delta()?,
            },
            TARGET_COPY => Action::TargetCopy {
                length,
                delta: self.delta()?,
            },
            _ => unreachable!("command is two bits"),
        };
        Ok(Some(action))
    }

    fn payload(&mut self, length: u64) -> Result<&'a [u8]> {
        let offset = self.cursor.position() as i64;
        usize::try_from(length)
            .ok()
            .and_then(|len| self.cursor.take(len))
            .ok_or(BpsError::OutOfBounds {
                region: Region::Actions,
                offset,
                length,
                size: self.size as u64,
            })
    }

    /// Signed cursor adjustment: low bit is the sign, the rest the magnitude.
    fn delta(&mut self) -> Result<i64> {
        let raw = varint::decode(&mut self.cursor).required("copy offset")?;
        let magnitude = (raw >> 1) as i64;
        Ok(if raw & 1 == 1 { -magnitude } else { magnitude })
    }
}

impl<'a> Iterator for ActionReader<'a> {
    type Item = Result<Action<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_action() {
            Ok(action) => action.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Cursors for one application run.
///
/// The two relative cursors are independent of `output_offset` and of each
/// other; each only moves on instructions of its own kind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunState {
    pub output_offset: usize,
    pub source_relative_offset: i64,
    pub target_relative_offset: i64,
}

/// Instruction counts and byte totals for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyStats {
    pub source_reads: usize,
    pub target_reads: usize,
    pub source_copies: usize,
    pub target_copies: usize,
    pub bytes_from_source: u64,
    pub bytes_from_patch: u64,
    pub bytes_from_target: u64,
}

impl ApplyStats {
    pub fn record(&mut self, action: &Action<'_>) {
        let len = action.output_len();
        match action {
            Action::SourceRead { .. } => {
                self.source_reads += 1;
                self.bytes_from_source += len;
            }
            Action::TargetRead { .. } => {
                self.target_reads += 1;
                self.bytes_from_patch += len;
            }
            Action::SourceCopy { .. } => {
                self.source_copies += 1;
                self.bytes_from_source += len;
            }
            Action::TargetCopy { .. } => {
                self.target_copies += 1;
                self.bytes_from_target += len;
            }
        }
    }

    pub fn actions(&self) -> usize {
        self.source_reads + self.target_reads + self.source_copies + self.target_copies
    }
}

/// Range inside a buffer of `size` bytes, or `OutOfBounds`.
fn read_range(region: Region, offset: i64, length: u64, size: usize) -> Result<Range<usize>> {
    let err = || BpsError::OutOfBounds {
        region,
        offset,
        length,
        size: size as u64,
    };
    let start = usize::try_from(offset).map_err(|_| err())?;
    let len = usize::try_from(length).map_err(|_| err())?;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= size)
        .ok_or_else(err)?;
    Ok(start..end)
}

impl RunState {
    /// Output range for the next `length` bytes, or `TargetOverflow`.
    fn reserve(&self, length: u64, target_size: usize) -> Result<Range<usize>> {
        let err = || BpsError::TargetOverflow {
            offset: self.output_offset as u64,
            length,
            target_size: target_size as u64,
        };
        let len = usize::try_from(length).map_err(|_| err())?;
        let end = self
            .output_offset
            .checked_add(len)
            .filter(|&end| end <= target_size)
            .ok_or_else(err)?;
        Ok(self.output_offset..end)
    }

    /// Execute one instruction against `target`.
    pub fn execute(
        &mut self,
        action: &Action<'_>,
        source: &[u8],
        target: &mut [u8],
    ) -> Result<()> {
        match *action {
            Action::SourceRead { length } => {
                let dst = self.reserve(length, target.len())?;
                let src = read_range(Region::Source, dst.start as i64, length, source.len())?;
                target[dst.clone()].copy_from_slice(&source[src]);
                self.output_offset = dst.end;
            }
            Action::TargetRead { data } => {
                let dst = self.reserve(data.len() as u64, target.len())?;
                target[dst.clone()].copy_from_slice(data);
                self.output_offset = dst.end;
            }
            Action::SourceCopy { length, delta } => {
                let dst = self.reserve(length, target.len())?;
                self.source_relative_offset = self.source_relative_offset.saturating_add(delta);
                let src = read_range(
                    Region::Source,
                    self.source_relative_offset,
                    length,
                    source.len(),
                )?;
                target[dst.clone()].copy_from_slice(&source[src.clone()]);
                self.output_offset = dst.end;
                self.source_relative_offset = src.end as i64;
            }
            Action::TargetCopy { length, delta } => {
                let dst = self.reserve(length, target.len())?;
                self.target_relative_offset = self.target_relative_offset.saturating_add(delta);
                let src = read_range(
                    Region::Target,
                    self.target_relative_offset,
                    length,
                    target.len(),
                )?;
                // Byte at a time: a run may read bytes written earlier in the same run.
                for (to, from) in dst.clone().zip(src.clone()) {
                    target[to] = target[from];
                }
                self.output_offset = dst.end;
                self.target_relative_offset = src.end as i64;
            }
        }
        Ok(())
    }
}
