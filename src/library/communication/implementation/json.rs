//! Serialization and deserialization provided by [`serde_json`] using marker traits
//!
//! This module allows implementors of traits that allow raw access to underlying messaging systems
//! to provide the higher-level traits relying on serialization. It does so by providing a number of
//! marker traits which, when implemented, provide default implementations of the higher-level traits
//! by translating between lower-level serialized data and higher-level strongly typed data by using
//! [`serde_json`].

use super::super::event::{
    Notification, NotificationPublisher, Partition, QueueDescriptor, QueueEntry,
    RawNotificationPublisher, RawQueueEntry,
};
use crate::library::BoxedError;
use async_trait::async_trait;
use serde::Deserialize;

/// Marker trait providing a default [`NotificationPublisher`] implementation based on [`serde_json`]
pub trait JsonNotificationPublisher: RawNotificationPublisher + Send + Sync {}

#[async_trait]
impl<P> NotificationPublisher for P
where
    P: JsonNotificationPublisher,
{
    /// Serializes the notification using [`serde_json::to_vec`] and appends it to the partition of its key
    async fn publish_to<N: Notification + Send + Sync>(
        &self,
        queue: &QueueDescriptor,
        notification: &N,
    ) -> Result<Partition, BoxedError> {
        let data = serde_json::to_vec(notification)?;
        let partition = queue.partition_for(&notification.partition_key());

        self.publish_raw(&data, queue, partition).await?;

        Ok(partition)
    }
}

/// Marker trait providing a default [`QueueEntry`] implementation based on [`serde_json`]
pub trait JsonQueueEntry: RawQueueEntry {}

impl<E> QueueEntry for E
where
    E: JsonQueueEntry,
{
    /// Parses the payload using [`serde_json::from_slice`]
    fn parse_payload<'a, T>(&'a self) -> Result<T, BoxedError>
    where
        T: Deserialize<'a>,
    {
        serde_json::from_slice(self.payload()).map_err(Into::into)
    }
}
