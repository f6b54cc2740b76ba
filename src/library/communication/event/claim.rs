use super::{
    ConsumerGroupDescriptor, Consumer, Delivery, Partition, QueueDescriptor, QueueEntry,
    QueueProvider, RawQueueEntry,
};
use crate::library::BoxedError;
use futures::StreamExt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info_span, trace, warn, Instrument};

const DEFAULT_BATCH_SIZE: usize = 10;

/// Lifecycle of a single partition within a [`ClaimProcessor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimState {
    /// Partition is not being processed
    Idle,
    /// Partition is owned and notifications are being pulled
    Claimed(Partition),
    /// Ownership has been revoked, in-flight processing is being finished
    Draining(Partition),
}

/// Reasons why a [`ClaimProcessor`] stopped before its claim was revoked
#[derive(Debug, Error)]
pub enum ClaimError {
    /// Subscribing to the partition failed
    #[error("unable to subscribe to partition {0}")]
    Subscribe(Partition, #[source] BoxedError),
    /// Receiving from the partition failed or the partition stream ended
    #[error("unable to receive from partition {0}")]
    Delivery(Partition, #[source] BoxedError),
    /// The consumer failed to apply a notification
    #[error("unable to apply notification {0}")]
    Apply(Delivery, #[source] BoxedError),
    /// Committing the offset of a processed notification failed
    #[error("unable to commit notification {0}")]
    Commit(Delivery, #[source] BoxedError),
    /// The processing task panicked or was cancelled
    #[error("processor of partition {0} aborted")]
    Aborted(Partition, #[source] JoinError),
}

/// Statistics of one [`ClaimProcessor`] run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClaimReport {
    /// Notifications applied and committed
    pub processed: usize,
    /// Malformed entries which were committed without being applied
    pub skipped: usize,
}

/// Pulls, applies, and commits the notifications of one owned partition in order
///
/// Each entry is acknowledged only after the consumer applied it successfully. Entries which can not
/// be deserialized are logged, acknowledged, and skipped so they neither reach the consumer nor block
/// the partition. Any other failure ends the run with a [`ClaimError`].
pub struct ClaimProcessor<C, Q> {
    consumer: Arc<C>,
    provider: Arc<Q>,
    queue: QueueDescriptor,
    group: ConsumerGroupDescriptor,
    partition: Partition,
    state: ClaimState,
    report: ClaimReport,
}

impl<C, Q> ClaimProcessor<C, Q>
where
    C: Consumer + Send + Sync + 'static,
    C::Notification: Send + Sync,
    Q: QueueProvider + Send + Sync + 'static,
{
    /// Creates a new processor for a partition which has been granted to the caller
    pub fn new(
        consumer: Arc<C>,
        provider: Arc<Q>,
        queue: QueueDescriptor,
        group: ConsumerGroupDescriptor,
        partition: Partition,
    ) -> Self {
        Self {
            consumer,
            provider,
            queue,
            group,
            partition,
            state: ClaimState::Idle,
            report: ClaimReport::default(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ClaimState {
        self.state
    }

    /// Processes the partition until the `revoke` signal fires or the sending half is dropped
    ///
    /// The revocation is only observed between entries, an entry that is being applied is always
    /// committed before the processor returns.
    pub async fn run(
        mut self,
        mut revoke: oneshot::Receiver<()>,
    ) -> Result<ClaimReport, ClaimError> {
        self.transition(ClaimState::Claimed(self.partition));
        let result = self.process(&mut revoke).await;
        self.transition(ClaimState::Draining(self.partition));
        self.transition(ClaimState::Idle);

        result.map(|_| self.report)
    }

    async fn process(&mut self, revoke: &mut oneshot::Receiver<()>) -> Result<(), ClaimError> {
        let partition = self.partition;
        let mut stream = self
            .provider
            .consume(&self.queue, &self.group, partition, DEFAULT_BATCH_SIZE)
            .await
            .map_err(|e| ClaimError::Subscribe(partition, e))?;

        loop {
            let item = tokio::select! {
                biased;
                _ = &mut *revoke => return Ok(()),
                item = stream.next() => item,
            };

            let mut entry = match item {
                Some(Ok(entry)) => entry,
                Some(Err(e)) => return Err(ClaimError::Delivery(partition, e)),
                None => {
                    return Err(ClaimError::Delivery(
                        partition,
                        "partition stream ended unexpectedly".into(),
                    ))
                }
            };

            let delivery = entry.delivery();

            match entry.parse_payload::<C::Notification>() {
                Ok(notification) => {
                    self.consumer
                        .consume(notification, &delivery)
                        .await
                        .map_err(|e| ClaimError::Apply(delivery, e))?;

                    entry
                        .acknowledge()
                        .await
                        .map_err(|e| ClaimError::Commit(delivery, e))?;

                    trace!(%delivery, "Notification processed");
                    self.report.processed += 1;
                }
                Err(e) => {
                    warn!(%delivery, error = %e, "Skipping malformed notification");

                    entry
                        .acknowledge()
                        .await
                        .map_err(|e| ClaimError::Commit(delivery, e))?;

                    self.report.skipped += 1;
                }
            }
        }
    }

    fn transition(&mut self, next: ClaimState) {
        debug!(from = ?self.state, to = ?next, "Claim state changed");
        self.state = next;
    }
}

/// Background task running a [`ClaimProcessor`]
///
/// Resolves with the result of the processor once it has stopped.
pub struct ClaimHandle {
    partition: Partition,
    revoke: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<ClaimReport, ClaimError>>,
}

impl ClaimHandle {
    /// Spawns the processor onto the runtime
    pub fn spawn<C, Q>(processor: ClaimProcessor<C, Q>) -> Self
    where
        C: Consumer + Send + Sync + 'static,
        C::Notification: Send + Sync,
        Q: QueueProvider + Send + Sync + 'static,
    {
        let partition = processor.partition;
        let (revoke, receiver) = oneshot::channel();
        let span = info_span!("claim", %partition);
        let task = tokio::spawn(processor.run(receiver).instrument(span));

        Self {
            partition,
            revoke: Some(revoke),
            task,
        }
    }

    /// Partition processed by the task
    pub fn partition(&self) -> Partition {
        self.partition
    }

    /// Signals the processor to stop pulling new entries
    pub fn revoke(&mut self) {
        if let Some(revoke) = self.revoke.take() {
            revoke.send(()).ok();
        }
    }

    /// Revokes the claim and waits until in-flight processing has finished
    pub async fn drain(mut self) -> Result<ClaimReport, ClaimError> {
        self.revoke();
        self.await
    }
}

impl Future for ClaimHandle {
    type Output = Result<ClaimReport, ClaimError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let partition = self.partition;

        Pin::new(&mut self.task).poll(cx).map(|result| match result {
            Ok(result) => result,
            Err(e) => Err(ClaimError::Aborted(partition, e)),
        })
    }
}
