use super::{ConsumerGroupDescriptor, Partition, QueueDescriptor, QueueEntry};
use crate::library::BoxedError;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Allows consumption of single queue partitions on behalf of a [consumer group](ConsumerGroupDescriptor)
#[async_trait]
pub trait QueueProvider {
    /// Type of [`QueueEntry`] returned by the provider
    type Entry: QueueEntry + Send + Sync;

    /// Subscribes to a partition of the given queue on behalf of a [`ConsumerGroup`](ConsumerGroupDescriptor),
    /// creating the group if it does not exist.
    ///
    /// The stream first yields entries that have been delivered to the group before but were never
    /// acknowledged, followed by new entries in partition order. It waits indefinitely for new entries
    /// and only ends after yielding an error. Callers must hold the partition exclusively while consuming it.
    async fn consume(
        &self,
        queue: &QueueDescriptor,
        group: &ConsumerGroupDescriptor,
        partition: Partition,
        batch_size: usize,
    ) -> Result<BoxStream<'static, Result<Self::Entry, BoxedError>>, BoxedError>;
}
