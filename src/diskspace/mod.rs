//! Disk-space reservation: per-disk byte accounting behind an
//! RAII `Reservation`, a round-robin `Volume` chooser, and a `Schema`
//! (ordered volumes with a max-part-size constraint).

pub mod reservation;
pub mod schema;
pub mod volume;

pub use reservation::{DiskSpaceMonitor, Reservation};
pub use schema::Schema;
pub use volume::Volume;
