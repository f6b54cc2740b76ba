use super::{Assignment, Partition, QueueDescriptor, QueueLocation};
use crate::library::BoxedError;
use async_trait::async_trait;
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// Unique identifier for a group of consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerGroupIdentifier {
    /// Consumers materializing user inboxes
    Notifications,
    /// Unknown consumer group
    Other(String),
}

impl Display for ConsumerGroupIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notifications => write!(f, "{}", crate::constants::DEFAULT_CONSUMER_GROUP),
            Self::Other(identifier) => write!(f, "{}", identifier),
        }
    }
}

impl From<String> for ConsumerGroupIdentifier {
    fn from(identifier: String) -> Self {
        if identifier == crate::constants::DEFAULT_CONSUMER_GROUP {
            Self::Notifications
        } else {
            Self::Other(identifier)
        }
    }
}

/// Definition of a consumer group
///
/// In a partitioned queue, a group of consumers collaborates to consume messages.
/// Each partition is owned by only one consumer within the same group, identified
/// by a [`ConsumerGroupIdentifier`]. When it is created, the group starts processing messages
/// from the provided [`QueueLocation`].
#[derive(Debug, Clone)]
pub struct ConsumerGroupDescriptor {
    identifier: ConsumerGroupIdentifier,
    start: QueueLocation,
}

impl ConsumerGroupDescriptor {
    /// Creates a new instance from raw parts
    pub fn new(identifier: ConsumerGroupIdentifier, start: QueueLocation) -> Self {
        Self { identifier, start }
    }

    /// Unique identifier of the group
    pub fn identifier(&self) -> &ConsumerGroupIdentifier {
        &self.identifier
    }

    /// Location from where a consumer group begins to consume messages
    ///
    /// Note that it is not guaranteed that this will be honored (e.g. when the group already exists)!
    pub fn start(&self) -> &QueueLocation {
        &self.start
    }
}

impl Default for ConsumerGroupDescriptor {
    /// Uses [`ConsumerGroupIdentifier::Notifications`] and [`QueueLocation::Head`] so no published notification is missed
    fn default() -> Self {
        Self {
            identifier: ConsumerGroupIdentifier::Notifications,
            start: QueueLocation::Head,
        }
    }
}

/// Unique identifier of a consumer within a [`ConsumerGroup`](ConsumerGroupDescriptor)
pub type ConsumerIdentifier = String;

/// Failures of the consumer group session
///
/// None of these are recoverable by the session itself, the member has to rejoin the group.
#[derive(Debug, Error)]
pub enum GroupProtocolError {
    /// Communication with the coordination backend failed
    #[error("consumer group session failed")]
    Session(#[source] BoxedError),
    /// Another member took over a partition which was believed to be owned
    #[error("ownership of partition {0} has been lost")]
    LeaseLost(Partition),
    /// The member is no longer part of the group
    #[error("consumer group membership has been closed")]
    Closed,
}

/// Entry point into a consumer group
#[async_trait]
pub trait GroupCoordinator {
    /// Membership handle type returned when joining
    type Membership: GroupMembership + Send;

    /// Joins the group as the given consumer, triggering a rebalance of all members
    async fn join(
        &self,
        queue: &QueueDescriptor,
        group: &ConsumerGroupDescriptor,
        consumer: &str, // &ConsumerIdentifier
    ) -> Result<Self::Membership, GroupProtocolError>;
}

/// Participation of one consumer in a consumer group
///
/// A membership alternates between two phases. [`assign`](GroupMembership::assign) waits until all
/// partitions of the current generation are exclusively held and returns them. The caller then processes
/// these partitions until [`revoked`](GroupMembership::revoked) resolves, at which point it has to stop
/// processing every one of them before calling `assign` again. This is the barrier that prevents two
/// members from claiming the same partition during a rebalance.
#[async_trait]
pub trait GroupMembership {
    /// Releases the partitions of the previous generation and acquires the ones of the current generation
    async fn assign(&mut self) -> Result<Assignment, GroupProtocolError>;

    /// Keeps the membership alive and resolves once the current assignment has been revoked
    async fn revoked(&mut self) -> Result<(), GroupProtocolError>;

    /// Releases all partitions and leaves the group, triggering a rebalance of the remaining members
    async fn leave(&mut self) -> Result<(), GroupProtocolError>;
}
