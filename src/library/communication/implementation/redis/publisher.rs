use super::super::super::event::{Partition, QueueDescriptor, RawNotificationPublisher};
use super::super::json::JsonNotificationPublisher;
use super::{RedisConnectionVariant, RedisFactory};
use super::{STREAM_ID_NEW, STREAM_PAYLOAD_KEY};
use crate::library::EmptyResult;
use async_trait::async_trait;
use redis::streams::StreamMaxlen;
use redis::AsyncCommands;

/// [`NotificationPublisher`](super::super::super::event::NotificationPublisher) implementation using [`XADD`](https://redis.io/commands/xadd)
///
/// Each partition is a separate stream which is trimmed approximately to the queue limit.
#[derive(Clone)]
pub struct RedisPublisher<F: RedisFactory> {
    factory: F,
}

impl<F> RedisPublisher<F>
where
    F: RedisFactory,
{
    /// Creates a new instance from a connection factory
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

impl<F> JsonNotificationPublisher for RedisPublisher<F> where F: RedisFactory + Send + Sync {}

#[async_trait]
impl<F> RawNotificationPublisher for RedisPublisher<F>
where
    F: RedisFactory + Send + Sync,
{
    async fn publish_raw(
        &self,
        data: &[u8],
        descriptor: &QueueDescriptor,
        partition: Partition,
    ) -> EmptyResult {
        let limit = StreamMaxlen::Approx(descriptor.limit());
        let key = descriptor.partition_key(partition);

        let mut con = self
            .factory
            .connection(RedisConnectionVariant::Multiplexed)
            .await?;

        con.xadd_maxlen::<_, _, _, _, ()>(key, limit, STREAM_ID_NEW, &[(STREAM_PAYLOAD_KEY, data)])
            .await?;

        Ok(())
    }
}
