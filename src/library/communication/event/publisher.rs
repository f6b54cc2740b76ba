use super::{Notification, Partition, QueueDescriptor};
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;

/// Structure which allows publishing of serialized data into a queue partition
#[async_trait]
pub trait RawNotificationPublisher {
    /// Appends an opaque payload to a partition of a [`Queue`](QueueDescriptor)
    async fn publish_raw(
        &self,
        data: &[u8],
        descriptor: &QueueDescriptor,
        partition: Partition,
    ) -> EmptyResult;
}

/// Publisher for [`Notifications`](Notification)
#[async_trait]
pub trait NotificationPublisher {
    /// Publishes a [`Notification`] to its default queue and returns the partition it was appended to
    async fn publish<N: Notification + Send + Sync>(
        &self,
        notification: &N,
    ) -> Result<Partition, BoxedError> {
        self.publish_to(&N::queue(), notification).await
    }

    /// Publishes a [`Notification`] to the given queue and returns the partition it was appended to
    ///
    /// The partition is derived from [`Notification::partition_key`].
    async fn publish_to<N: Notification + Send + Sync>(
        &self,
        queue: &QueueDescriptor,
        notification: &N,
    ) -> Result<Partition, BoxedError>;
}
