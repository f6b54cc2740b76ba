//! Domain specific structures, implementations, and logic

/// Number of partitions the notification queue is split into by default
///
/// All producers and consumers of a queue have to agree on this value.
pub(self) const DEFAULT_PARTITIONS: u32 = 8;

/// Default number of notifications retained in each partition
pub(self) const DEFAULT_RETENTION: usize = 100_000;

mod envelope;
mod user;

pub use envelope::*;
pub use user::*;
