#![allow(dead_code)]

use bpspatch::varint;
use bpspatch::Action;

/// Build a complete BPS file whose actions turn `source` into `target`.
/// The caller is responsible for the actions actually producing `target`.
pub fn build_patch(source: &[u8], target: &[u8], metadata: &str, actions: &[Action<'_>]) -> Vec<u8> {
    let mut out = b"BPS1".to_vec();
    varint::encode(source.len() as u64, &mut out);
    varint::encode(target.len() as u64, &mut out);
    varint::encode(metadata.len() as u64, &mut out);
    out.extend_from_slice(metadata.as_bytes());
    for action in actions {
        action.encode(&mut out);
    }
    out.extend_from_slice(&crc32fast::hash(source).to_le_bytes());
    out.extend_from_slice(&crc32fast::hash(target).to_le_bytes());
    let patch_crc = crc32fast::hash(&out);
    out.extend_from_slice(&patch_crc.to_le_bytes());
    out
}

pub const SOURCE: &[u8] = b"The quick brown fox jumps over the lazy dog.";
pub const TARGET: &[u8] = b"The quick red fox jumps over the lazy dog!!!!";

/// A patch exercising all four commands: SOURCE -> TARGET.
pub fn sample_patch() -> Vec<u8> {
    build_patch(
        SOURCE,
        TARGET,
        "title: sample\nauthor: tests",
        &[
            // "The quick "
            Action::SourceRead { length: 10 },
            Action::TargetRead { data: b"red" },
            // " fox jumps over the lazy dog" from source offset 15
            Action::SourceCopy {
                length: 28,
                delta: 15,
            },
            Action::TargetRead { data: b"!" },
            // "!!!" repeating the previous byte
            Action::TargetCopy {
                length: 3,
                delta: 41,
            },
        ],
    )
}
