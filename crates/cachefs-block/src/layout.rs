//! On-disk layout for the sharded block store (spec §4.2, §6.3)
//!
//! ```text
//! <root>/<ff>/<ff>/<fingerprint>.<part_idx>.blk
//! <root>/<ff>/<ff>/<fingerprint>.<part_idx>.dmap
//! ```
//! The two shard levels are the fingerprint's first and second hex byte
//! (confirmed against `fs_layout.h` in the original C++ source: `hex[0..2]`,
//! `hex[2..4]`), bounding fan-out to <= 65536 fingerprints per two-level
//! shard.

use std::path::{Path, PathBuf};

/// Split a fingerprint into its two shard directory components.
///
/// Panics if `fingerprint` is shorter than 4 characters — callers always
/// pass a 16-char fingerprint produced by `cachefs_hash::fingerprint`.
#[must_use]
pub fn shard_dir(fingerprint: &str) -> (&str, &str) {
    (&fingerprint[0..2], &fingerprint[2..4])
}

/// Directory a given fingerprint's part/bitmap files live under.
#[must_use]
pub fn shard_path(root: &Path, fingerprint: &str) -> PathBuf {
    let (a, b) = shard_dir(fingerprint);
    root.join(a).join(b)
}

/// Path to the part file holding blocks `[part_idx * PART_MAX, (part_idx+1) * PART_MAX)`.
#[must_use]
pub fn part_path(root: &Path, fingerprint: &str, part_idx: u64) -> PathBuf {
    shard_path(root, fingerprint).join(format!("{fingerprint}.{part_idx}.blk"))
}

/// Path to the dirty bitmap file for a given part.
#[must_use]
pub fn bitmap_path(root: &Path, fingerprint: &str, part_idx: u64) -> PathBuf {
    shard_path(root, fingerprint).join(format!("{fingerprint}.{part_idx}.dmap"))
}

/// Split an absolute object offset into `(part_idx, offset_within_part)`.
#[must_use]
pub fn split_offset(offset: u64, part_max: u64) -> (u64, u64) {
    (offset / part_max, offset % part_max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_dir_is_first_two_hex_bytes() {
        assert_eq!(shard_dir("ab12cd34ef56ab78"), ("ab", "12"));
    }

    #[test]
    fn part_path_round_trips_via_layout_function() {
        let root = Path::new("/cache");
        let p = part_path(root, "ab12cd34ef56ab78", 3);
        assert_eq!(p, Path::new("/cache/ab/12/ab12cd34ef56ab78.3.blk"));

        let b = bitmap_path(root, "ab12cd34ef56ab78", 3);
        assert_eq!(b, Path::new("/cache/ab/12/ab12cd34ef56ab78.3.dmap"));
    }

    #[test]
    fn split_offset_divides_by_part_max() {
        let part_max = 2u64 * 1024 * 1024 * 1024;
        assert_eq!(split_offset(0, part_max), (0, 0));
        assert_eq!(split_offset(part_max - 1, part_max), (0, part_max - 1));
        assert_eq!(split_offset(part_max, part_max), (1, 0));
        assert_eq!(split_offset(part_max + 42, part_max), (1, 42));
    }
}
