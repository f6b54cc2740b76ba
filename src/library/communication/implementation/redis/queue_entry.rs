use super::super::json::JsonQueueEntry;
use super::{RedisConnection, RedisQueueError, STREAM_PAYLOAD_KEY};
use crate::library::communication::event::{Delivery, Offset, Partition, RawQueueEntry};
use crate::library::BoxedError;
use async_trait::async_trait;
use redis::streams::StreamId;
use redis::AsyncCommands;

/// Redis based implementation of the [`QueueEntry`](crate::library::communication::event::QueueEntry) trait
///
/// Acknowledging an entry removes it from the pending entries list of the consumer group.
pub struct RedisQueueEntry {
    con: RedisConnection,
    id: String,
    key: String,
    group: String,
    payload: Vec<u8>,
    delivery: Delivery,
}

impl RedisQueueEntry {
    pub(super) fn new(
        con: RedisConnection,
        entry: StreamId,
        key: String,
        group: String,
        partition: Partition,
    ) -> Result<Self, RedisQueueError> {
        // Entries without payload fail to parse and are skipped like any other malformed entry
        let payload: Vec<u8> = entry.get(STREAM_PAYLOAD_KEY).unwrap_or_default();

        let offset: Offset = entry.id.parse()?;

        Ok(Self {
            con,
            id: entry.id,
            key,
            group,
            payload,
            delivery: Delivery::new(partition, offset),
        })
    }
}

#[async_trait]
impl RawQueueEntry for RedisQueueEntry {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn delivery(&self) -> Delivery {
        self.delivery
    }

    async fn acknowledge(&mut self) -> Result<(), BoxedError> {
        self.con
            .xack::<_, _, _, ()>(&self.key, &self.group, &[&self.id])
            .await?;

        Ok(())
    }
}

impl JsonQueueEntry for RedisQueueEntry {}
