//! `Schema` — an ordered list of volumes with a max-part-size constraint
//! per volume, e.g. "fast SSD volume for parts under 10GB,
//! spill to HDD volume above that".

use std::sync::Arc;

use crate::diskspace::reservation::Reservation;
use crate::diskspace::volume::Volume;
use crate::error::{EngineError, EngineResult, ErrorCode};

struct VolumeEntry {
    volume: Arc<Volume>,
    max_part_size_bytes: Option<u64>,
}

pub struct Schema {
    volumes: Vec<VolumeEntry>,
}

impl Schema {
    pub fn new() -> Self {
        Self { volumes: Vec::new() }
    }

    pub fn add_volume(&mut self, volume: Arc<Volume>, max_part_size_bytes: Option<u64>) {
        self.volumes.push(VolumeEntry { volume, max_part_size_bytes });
    }

    /// Reserves `size` bytes on the first volume (in order) whose
    /// `max_part_size_bytes` constraint isn't violated and that has room.
    pub fn reserve(&self, size: u64) -> EngineResult<Reservation> {
        for entry in &self.volumes {
            if let Some(max) = entry.max_part_size_bytes {
                if size > max {
                    continue;
                }
            }
            if let Some(r) = entry.volume.reserve(size) {
                return Ok(r);
            }
        }
        Err(EngineError::new(ErrorCode::MemoryLimitExceeded, format!("no volume in schema could reserve {size} bytes")))
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diskspace::reservation::DiskSpaceMonitor;

    #[test]
    fn skips_volume_whose_max_part_size_is_exceeded() {
        let mut schema = Schema::new();
        let fast = Volume::new("fast", vec![DiskSpaceMonitor::new(1 << 30)]);
        let slow = Volume::new("slow", vec![DiskSpaceMonitor::new(1 << 30)]);
        schema.add_volume(fast, Some(1024));
        schema.add_volume(slow, None);
        let r = schema.reserve(2048).unwrap();
        assert_eq!(r.size(), 2048);
    }
}
