//! Write path: INSERT produces a
//! sorted temporary part under `tmp_*`; commit renames it into place.
//! No in-place edits — readers see the part set they captured at start.

use std::path::{Path, PathBuf};

use crate::error::{EngineError, EngineResult};
use crate::storage::mergetree::part::{Part, PartName};

pub fn temporary_directory(base: &Path, name: &PartName) -> PathBuf {
    base.join(format!("tmp_{}", name.directory_name()))
}

/// Atomically renames a freshly-written temporary part directory into its
/// final name. `std::fs::rename` is atomic within one filesystem, matching
/// the "no in-place edits, no WAL" commit described above.
pub fn commit(base: &Path, part: &Part) -> EngineResult<()> {
    let tmp = temporary_directory(base, &part.name);
    let final_path = part.directory();
    std::fs::rename(&tmp, &final_path).map_err(EngineError::from)?;
    tracing::info!(part = %part.name.directory_name(), "committed part");
    Ok(())
}

/// Commits a merge's output and removes the superseded input directories.
/// Per spec: "atomically swaps" — the rename makes the merged part visible
/// first; cleanup of the old parts is a separate, idempotent step a
/// background thread (or the replication cleanup tick, §4.F) may retry.
pub fn commit_merge(base: &Path, merged: &Part, superseded: &[Part]) -> EngineResult<()> {
    commit(base, merged)?;
    for old in superseded {
        let _ = std::fs::remove_dir_all(old.directory());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::DataType;
    use tempfile::tempdir;

    fn part(dir: &Path, name: PartName) -> Part {
        Part { name, path: dir.to_path_buf(), columns: vec![("v".into(), DataType::UInt64)], rows_count: 0, marks_count: 0, column_byte_size: vec![], default_dependencies: vec![] }
    }

    #[test]
    fn commit_renames_tmp_directory_to_final_name() {
        let dir = tempdir().unwrap();
        let name = PartName { partition: "p".into(), min_block: 1, max_block: 1, level: 0, mutation: None };
        let p = part(dir.path(), name);
        std::fs::create_dir_all(temporary_directory(dir.path(), &p.name)).unwrap();

        commit(dir.path(), &p).unwrap();
        assert!(p.directory().is_dir());
        assert!(!temporary_directory(dir.path(), &p.name).exists());
    }

    #[test]
    fn commit_merge_removes_superseded_parts() {
        let dir = tempdir().unwrap();
        let old1 = part(dir.path(), PartName { partition: "p".into(), min_block: 1, max_block: 1, level: 0, mutation: None });
        let old2 = part(dir.path(), PartName { partition: "p".into(), min_block: 2, max_block: 2, level: 0, mutation: None });
        std::fs::create_dir_all(old1.directory()).unwrap();
        std::fs::create_dir_all(old2.directory()).unwrap();

        let merged_name = old1.name.merged_with(&old2.name);
        let merged = part(dir.path(), merged_name);
        std::fs::create_dir_all(temporary_directory(dir.path(), &merged.name)).unwrap();

        commit_merge(dir.path(), &merged, &[old1.clone(), old2.clone()]).unwrap();
        assert!(merged.directory().is_dir());
        assert!(!old1.directory().exists());
        assert!(!old2.directory().exists());
    }
}
