//! Structures to realise a keyed, partitioned notification pipeline
//!
//! Whenever something noteworthy happens, a [`Notification`] describing it is published.
//! Notifications are stored in a log-like data structure which is split into a fixed number
//! of [`Partitions`](Partition). Each notification carries a key from which its partition is
//! derived, so all notifications sharing a key land in the same partition and are
//! readable in publish order. There is no ordering guarantee between different partitions.
//!
//! Notifications are consumed in a reliable and resilient way using a concept called
//! [`ConsumerGroups`](ConsumerGroupDescriptor). All members of a group collectively process
//! the log where each partition is owned by exactly one member at any given time. Which member
//! owns which partition is decided by a [`GroupCoordinator`]. When the group membership changes,
//! every member revokes all of its claims before the partitions are redistributed.
//!
//! For each owned partition, a [`ClaimProcessor`] pulls entries in order, hands them to a
//! [`Consumer`] and acknowledges them once they have been applied. Upon crashing, unacknowledged
//! entries are delivered again to whichever member owns the partition next. This ensures that no
//! [`QueueEntries`](QueueEntry) are left unprocessed (at-least-once delivery).

mod claim;
mod consumer;
mod consumer_group;
mod notification;
mod partition;
mod publisher;
mod queue;
mod queue_provider;

pub use claim::*;
pub use consumer::*;
pub use consumer_group::*;
pub use notification::*;
pub use partition::*;
pub use publisher::*;
pub use queue::*;
pub use queue_provider::*;
