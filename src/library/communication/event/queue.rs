use super::{Delivery, Partition};
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use serde::Deserialize;

/// Describes a partitioned notification queue and its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDescriptor {
    key: String,
    partitions: u32,
    limit: usize,
}

impl QueueDescriptor {
    /// Creates a new instance from raw parts
    ///
    /// A queue always has at least one partition.
    pub fn new(key: String, partitions: u32, limit: usize) -> Self {
        Self {
            key,
            partitions: partitions.max(1),
            limit,
        }
    }

    /// Value which may be used by queue implementations to identify a queue
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Key identifying one partition of the queue
    pub fn partition_key(&self, partition: Partition) -> String {
        format!("{}.{}", self.key, partition)
    }

    /// Number of partitions the queue is split into
    ///
    /// Every publisher and consumer of a queue has to agree on this value, changing it
    /// moves keys to different partitions and thus breaks the per-key ordering.
    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    /// Maximum number of notifications to be retained in each partition
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Partition to which notifications with the given key are published
    pub fn partition_for(&self, key: &str) -> Partition {
        Partition::for_key(key, self.partitions)
    }
}

/// Location within the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueLocation {
    /// Start of the queue (not necessarily the first notification as a queue is limited in length)
    Head,
    /// End of the queue (exclusive of the last message)
    Tail,
}

/// Entry retrieved from a [`Queue`](QueueDescriptor) providing a raw payload
#[async_trait]
pub trait RawQueueEntry {
    /// Payload of the item
    fn payload(&self) -> &[u8];

    /// Partition and offset the item was read from
    fn delivery(&self) -> Delivery;

    /// Acknowledge the item as processed, committing its offset for the group
    async fn acknowledge(&mut self) -> EmptyResult;
}

/// Useful functions for [`QueueEntry`] implementations with default implementations
pub trait QueueEntry: RawQueueEntry {
    /// Attempts to parse the wire-format payload into a given data structure
    fn parse_payload<'a, T>(&'a self) -> Result<T, BoxedError>
    where
        T: Deserialize<'a>;
}
