//! `DiskSpaceMonitor` / `Reservation`.
//!
//! `tryToReserve` in the original is backed by `statvfs`; querying real
//! filesystem free space needs a platform syscall this workspace's stack
//! has no crate for, so `DiskSpaceMonitor` takes the disk's total capacity
//! as a constructor argument (refreshed by the caller however it likes —
//! e.g. from a periodic `statvfs` call at the edge) and does the same
//! bytes-available arithmetic named above.

use std::sync::{Arc, Mutex};

const KEEP_FREE_BYTES: u64 = 0;
const RESERVED_PADDING_BYTES: u64 = 30 * 1024 * 1024;

struct Inner {
    capacity_bytes: u64,
    reserved_bytes: u64,
    reservation_count: u64,
}

/// Tracks `{reserved_bytes, reservation_count}` under one mutex per disk,
/// exactly as describes.
#[derive(Clone)]
pub struct DiskSpaceMonitor {
    inner: Arc<Mutex<Inner>>,
}

impl DiskSpaceMonitor {
    pub fn new(capacity_bytes: u64) -> Self {
        Self { inner: Arc::new(Mutex::new(Inner { capacity_bytes, reserved_bytes: 0, reservation_count: 0 })) }
    }

    /// Updates the capacity figure a caller would otherwise get from
    /// `statvfs.f_bfree * f_bsize` at the edge.
    pub fn set_capacity_bytes(&self, capacity_bytes: u64) {
        self.inner.lock().unwrap().capacity_bytes = capacity_bytes;
    }

    pub fn reserved_bytes(&self) -> u64 {
        self.inner.lock().unwrap().reserved_bytes
    }

    pub fn reservation_count(&self) -> u64 {
        self.inner.lock().unwrap().reservation_count
    }

    /// `nullopt` if `capacity − keep_free − 30MiB − reserved < size`;
    /// otherwise an RAII `Reservation` that decrements on drop.
    pub fn try_to_reserve(&self, size: u64) -> Option<Reservation> {
        let mut inner = self.inner.lock().unwrap();
        let available = inner
            .capacity_bytes
            .saturating_sub(KEEP_FREE_BYTES)
            .saturating_sub(RESERVED_PADDING_BYTES)
            .saturating_sub(inner.reserved_bytes);
        if available < size {
            return None;
        }
        inner.reserved_bytes += size;
        inner.reservation_count += 1;
        Some(Reservation { monitor: self.inner.clone(), size })
    }
}

/// RAII handle: dropping it releases its share of `reserved_bytes`.
pub struct Reservation {
    monitor: Arc<Mutex<Inner>>,
    size: u64,
}

impl Reservation {
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        let mut inner = self.monitor.lock().unwrap();
        inner.reserved_bytes = inner.reserved_bytes.saturating_sub(self.size);
        inner.reservation_count = inner.reservation_count.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_decrements_on_drop() {
        let monitor = DiskSpaceMonitor::new(1024 * 1024 * 1024);
        {
            let _r = monitor.try_to_reserve(100).unwrap();
            assert_eq!(monitor.reservation_count(), 1);
        }
        assert_eq!(monitor.reservation_count(), 0);
        assert_eq!(monitor.reserved_bytes(), 0);
    }

    #[test]
    fn reservation_fails_when_insufficient_space() {
        let monitor = DiskSpaceMonitor::new(RESERVED_PADDING_BYTES + 50);
        assert!(monitor.try_to_reserve(100).is_none());
    }
}
