use crate::library::communication::event::{
    ConsumerGroupDescriptor, Delivery, Offset, Partition, QueueDescriptor, QueueLocation,
    QueueProvider, RawNotificationPublisher, RawQueueEntry,
};
use crate::library::communication::implementation::json::{
    JsonNotificationPublisher, JsonQueueEntry,
};
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

type CursorKey = (String, String);

#[derive(Default)]
struct GroupCursor {
    start: usize,
    acknowledged: BTreeSet<usize>,
}

#[derive(Default)]
struct LogState {
    partitions: HashMap<String, Vec<Vec<u8>>>,
    cursors: HashMap<CursorKey, GroupCursor>,
    version: u64,
    fail_publishing: bool,
    fail_deliveries: bool,
}

/// In-memory partitioned log acting as both publisher and queue provider
///
/// Entries are numbered sequentially per partition. Consumer groups track acknowledged entries
/// individually and every new subscription starts with the oldest unacknowledged entry, which
/// mirrors the redelivery of pending entries.
#[derive(Clone)]
pub struct MockLog {
    state: Arc<Mutex<LogState>>,
    changes: Arc<(watch::Sender<u64>, watch::Receiver<u64>)>,
}

impl Default for MockLog {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(LogState::default())),
            changes: Arc::new(watch::channel(0)),
        }
    }
}

impl MockLog {
    pub fn fail_publishing(&self, fail: bool) {
        self.state.lock().unwrap().fail_publishing = fail;
    }

    pub fn fail_deliveries(&self, fail: bool) {
        self.state.lock().unwrap().fail_deliveries = fail;
    }

    pub fn payloads(&self, queue: &QueueDescriptor, partition: Partition) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .partitions
            .get(&queue.partition_key(partition))
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self, queue: &QueueDescriptor, partition: Partition) -> usize {
        self.payloads(queue, partition).len()
    }

    /// Number of entries across all partitions of the queue
    pub fn total(&self, queue: &QueueDescriptor) -> usize {
        Partition::all(queue.partitions())
            .map(|partition| self.len(queue, partition))
            .sum()
    }

    /// Number of entries acknowledged by any group in the given partition
    pub fn committed(&self, queue: &QueueDescriptor, partition: Partition) -> usize {
        let key = queue.partition_key(partition);

        self.state
            .lock()
            .unwrap()
            .cursors
            .iter()
            .filter(|((_, stream), _)| *stream == key)
            .map(|(_, cursor)| cursor.acknowledged.len())
            .sum()
    }

    fn notify(&self, state: &mut LogState) {
        state.version += 1;
        self.changes.0.send(state.version).ok();
    }

    fn acknowledge(&self, cursor: &CursorKey, index: usize) {
        let mut state = self.state.lock().unwrap();

        state
            .cursors
            .entry(cursor.clone())
            .or_default()
            .acknowledged
            .insert(index);

        self.notify(&mut state);
    }

    /// Retrieves the first unacknowledged entry at or after `next`
    fn next_entry(&self, cursor: &CursorKey, next: usize) -> Option<(usize, Vec<u8>)> {
        let state = self.state.lock().unwrap();
        let entries = state.partitions.get(&cursor.1)?;
        let acknowledged = state.cursors.get(cursor).map(|c| &c.acknowledged);

        (next..entries.len())
            .find(|index| !acknowledged.map_or(false, |a| a.contains(index)))
            .map(|index| (index, entries[index].clone()))
    }
}

#[async_trait]
impl RawNotificationPublisher for MockLog {
    async fn publish_raw(
        &self,
        data: &[u8],
        descriptor: &QueueDescriptor,
        partition: Partition,
    ) -> EmptyResult {
        let mut state = self.state.lock().unwrap();

        if state.fail_publishing {
            return Err("log unavailable".into());
        }

        state
            .partitions
            .entry(descriptor.partition_key(partition))
            .or_default()
            .push(data.to_vec());

        self.notify(&mut state);

        Ok(())
    }
}

impl JsonNotificationPublisher for MockLog {}

pub struct MockQueueEntry {
    log: MockLog,
    cursor: CursorKey,
    index: usize,
    payload: Vec<u8>,
    delivery: Delivery,
}

#[async_trait]
impl RawQueueEntry for MockQueueEntry {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn delivery(&self) -> Delivery {
        self.delivery
    }

    async fn acknowledge(&mut self) -> EmptyResult {
        self.log.acknowledge(&self.cursor, self.index);
        Ok(())
    }
}

impl JsonQueueEntry for MockQueueEntry {}

#[async_trait]
impl QueueProvider for MockLog {
    type Entry = MockQueueEntry;

    async fn consume(
        &self,
        queue: &QueueDescriptor,
        group: &ConsumerGroupDescriptor,
        partition: Partition,
        _batch_size: usize,
    ) -> Result<BoxStream<'static, Result<Self::Entry, BoxedError>>, BoxedError> {
        let cursor: CursorKey = (
            group.identifier().to_string(),
            queue.partition_key(partition),
        );

        let start = {
            let mut state = self.state.lock().unwrap();

            if state.fail_deliveries {
                let error: BoxedError = "log unreachable".into();
                return Ok(stream::once(async { Err(error) }).boxed());
            }

            let length = state.partitions.get(&cursor.1).map_or(0, Vec::len);
            state
                .cursors
                .entry(cursor.clone())
                .or_insert_with(|| GroupCursor {
                    start: match group.start() {
                        QueueLocation::Head => 0,
                        QueueLocation::Tail => length,
                    },
                    acknowledged: BTreeSet::new(),
                })
                .start
        };

        let log = self.clone();
        let changes = self.changes.1.clone();

        let stream = stream::unfold(
            (log, cursor, start, changes),
            move |(log, cursor, next, mut changes)| async move {
                loop {
                    changes.borrow_and_update();

                    if let Some((index, payload)) = log.next_entry(&cursor, next) {
                        let entry = MockQueueEntry {
                            log: log.clone(),
                            cursor: cursor.clone(),
                            index,
                            payload,
                            delivery: Delivery::new(partition, Offset::sequential(index as u64)),
                        };

                        return Some((Ok(entry), (log, cursor, index + 1, changes)));
                    }

                    if changes.changed().await.is_err() {
                        return None;
                    }
                }
            },
        );

        Ok(stream.boxed())
    }
}
