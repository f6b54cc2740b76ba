use super::super::super::event::{
    ConsumerGroupDescriptor, Partition, QueueDescriptor, QueueLocation, QueueProvider,
};
use super::{
    RedisConnection, RedisConnectionVariant, RedisFactory, RedisQueueEntry, STREAM_ID_ADDITIONS,
    STREAM_ID_HEAD, STREAM_ID_TAIL,
};
use crate::library::BoxedError;
use async_trait::async_trait;
use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use redis::aio::ConnectionLike;
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tracing::{debug, error};

/// Queue provider implementation using [Redis Streams](https://redis.io/topics/streams-intro)
///
/// The redis consumer name is derived from the partition instead of the consuming process. This way,
/// entries left pending by a crashed or rebalanced owner are delivered to whichever member claims
/// the partition next.
pub struct RedisQueueProvider<F: RedisFactory + Send + Sync> {
    factory: F,
}

impl<F: RedisFactory + Send + Sync> RedisQueueProvider<F> {
    /// Creates a new instance with a given [`RedisFactory`]
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl<F> QueueProvider for RedisQueueProvider<F>
where
    F: RedisFactory + Clone + Send + Sync + 'static,
{
    type Entry = RedisQueueEntry;

    /// Consumes a redis stream data structure using the following steps:
    ///
    /// 1. Create the stream and/or consumer group if it does not exist
    /// 2. Start streaming entries from the PEL until the queue head is reached
    /// 3. Wait for and stream new entries in a blocking manner
    async fn consume(
        &self,
        queue: &QueueDescriptor,
        group: &ConsumerGroupDescriptor,
        partition: Partition,
        batch_size: usize,
    ) -> Result<BoxStream<'static, Result<Self::Entry, BoxedError>>, BoxedError> {
        let key = queue.partition_key(partition);
        let group_name = group.identifier().to_string();
        let consumer = format!("partition-{}", partition);

        // Create a redis connection for the blocking XREADGROUP command
        let mut con = self
            .factory
            .connection(RedisConnectionVariant::Owned)
            .await?;

        // Create the group if it does not exist
        create_consumer_group(&mut con, &key, group).await;

        let read_options = StreamReadOptions::default()
            .group(&group_name, &consumer)
            .count(batch_size)
            .block(0);

        debug!(%key, group = %group_name, %consumer, "Subscribing to stream");

        // Create a consumer for reading from the stream
        let entry_stream = xread_stream(con, read_options, key.clone());

        // Create an auxiliary stream that infinitely creates handles to a shared redis connection
        // It will be used to associate a connection with the QueueItems in order to acknowledge them
        let ack_con_stream = shared_redis_stream(self.factory.clone());

        // Combine the two streams and assemble the QueueItem from all the parts
        let stream = entry_stream
            .zip(ack_con_stream)
            .map(move |(entry, con)| -> Result<RedisQueueEntry, BoxedError> {
                let entry = entry?;
                let ack_con = con?;
                let entry =
                    RedisQueueEntry::new(ack_con, entry, key.clone(), group_name.clone(), partition)?;

                Ok(entry)
            })
            .boxed();

        Ok(stream)
    }
}

async fn create_consumer_group<C: ConnectionLike + Send>(
    con: &mut C,
    key: &str,
    group: &ConsumerGroupDescriptor,
) {
    let start_id = match group.start() {
        QueueLocation::Head => STREAM_ID_HEAD,
        QueueLocation::Tail => STREAM_ID_TAIL,
    };

    // Fails with BUSYGROUP if the group already exists
    con.xgroup_create_mkstream::<_, _, _, ()>(key, group.identifier().to_string(), start_id)
        .await
        .ok();
}

fn shared_redis_stream<F>(factory: F) -> BoxStream<'static, Result<RedisConnection, BoxedError>>
where
    F: RedisFactory + Send + Sync + 'static,
{
    stream::unfold(factory, |factory| async move {
        let con = factory
            .connection(RedisConnectionVariant::Multiplexed)
            .await;

        Some((con, factory))
    })
    .boxed()
}

type ReadState = (RedisConnection, StreamReadOptions, String);

/// Streams entries of a consumer group, yielding at most one error after which the stream ends
fn xread_stream(
    con: RedisConnection,
    options: StreamReadOptions,
    key: String,
) -> BoxStream<'static, Result<StreamId, BoxedError>> {
    let initial: Option<ReadState> = Some((con, options, STREAM_ID_HEAD.to_string()));

    let stream = stream::unfold(initial, move |state| {
        let key = key.to_owned();

        async move {
            let (mut con, options, id) = state?;

            let result = con
                .xread_options::<_, _, StreamReadReply>(&[&key], &[&id], &options)
                .await;

            match result {
                Ok(mut reply) => match reply.keys.pop() {
                    Some(stream) => {
                        // If we are already operating on "latest" then continue doing so
                        if id == STREAM_ID_ADDITIONS {
                            Some((Ok(stream.ids), Some((con, options, id))))
                        }
                        // If we are processing pending messages after a crash and have more, run through them
                        else if let Some(next_id) =
                            stream.ids.last().map(|entry| entry.id.to_owned())
                        {
                            Some((Ok(stream.ids), Some((con, options, next_id))))
                        }
                        // If we have finished processing pending messages after a crash, move to "latest"
                        else {
                            let next = (con, options, STREAM_ID_ADDITIONS.to_string());
                            Some((Ok(stream.ids), Some(next)))
                        }
                    }
                    None => Some((Ok(Vec::new()), Some((con, options, id)))),
                },
                Err(e) => {
                    error!(%key, error = ?e, "Encountered error reading from redis stream");
                    Some((Err(e.into()), None))
                }
            }
        }
    });

    // It is possible to stream in batches (receiving multiple entries from the redis)
    // by setting the options.count value >1. The resulting stream will still yield
    // one at a time to make it easier to use.
    stream
        .flat_map(|result| match result {
            Ok(batch) => stream::iter(batch).map(Ok).boxed(),
            Err(e) => stream::once(async { Err(e) }).boxed(),
        })
        .boxed()
}
