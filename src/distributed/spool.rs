//! Spooling for unreachable shards: rows that
//! can't be sent immediately are appended to
//! `<table_path>/<shard_name>/*.bin` and replayed later by a per-directory
//! monitor.

use std::path::{Path, PathBuf};

use crate::error::{EngineError, EngineResult};

pub struct ShardSpool {
    directory: PathBuf,
}

impl ShardSpool {
    pub fn new(table_path: &Path, shard_name: &str) -> Self {
        Self { directory: table_path.join(shard_name) }
    }

    /// Appends one pre-serialized block to a fresh spool file. Real
    /// monitor threads pick these up in filename order and replay them
    /// against the shard once it's reachable again.
    pub fn spool(&self, sequence: u64, block_bytes: &[u8]) -> EngineResult<()> {
        std::fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(format!("{sequence:020}.bin"));
        std::fs::write(path, block_bytes).map_err(EngineError::from)
    }

    /// Files ready to be replayed, oldest first.
    pub fn pending(&self) -> EngineResult<Vec<PathBuf>> {
        if !self.directory.exists() {
            return Ok(Vec::new());
        }
        let mut entries: Vec<PathBuf> = std::fs::read_dir(&self.directory)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|e| e == "bin").unwrap_or(false))
            .collect();
        entries.sort();
        Ok(entries)
    }

    pub fn mark_replayed(&self, path: &Path) -> EngineResult<()> {
        std::fs::remove_file(path).map_err(EngineError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn spooled_files_are_returned_oldest_first() {
        let dir = tempdir().unwrap();
        let spool = ShardSpool::new(dir.path(), "shard_01");
        spool.spool(2, b"block-2").unwrap();
        spool.spool(1, b"block-1").unwrap();
        let pending = spool.pending().unwrap();
        assert!(pending[0].to_string_lossy().contains("00000000000000000001"));
    }

    #[test]
    fn replaying_removes_the_file() {
        let dir = tempdir().unwrap();
        let spool = ShardSpool::new(dir.path(), "shard_01");
        spool.spool(1, b"x").unwrap();
        let pending = spool.pending().unwrap();
        spool.mark_replayed(&pending[0]).unwrap();
        assert!(spool.pending().unwrap().is_empty());
    }
}
