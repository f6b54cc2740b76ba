use super::{
    ClaimError, ClaimHandle, ClaimProcessor, ConsumerGroupDescriptor, Delivery, GroupCoordinator,
    GroupMembership, Notification, QueueDescriptor, QueueProvider,
};
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use futures::future::{self, select_all};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Entity which may consume and process [`Notifications`](Notification)
#[async_trait]
pub trait Consumer {
    /// Notification to consume
    type Notification: Notification;

    /// Processes an event notification and returns whether it succeeded or failed
    ///
    /// The same notification may be handed over more than once (e.g. after a crash before its
    /// offset was committed), the [`Delivery`] identifies its position in the log.
    async fn consume(&self, notification: Self::Notification, delivery: &Delivery) -> EmptyResult;
}

enum Interruption {
    Rebalance,
    Shutdown,
    Failure(BoxedError),
}

/// Helper functions to aid the consumption of messages
#[async_trait]
pub trait ConsumerExt {
    /// Joins a consumer group and processes every partition granted to this consumer
    ///
    /// For each assigned partition a [`ClaimProcessor`] is spawned. When the group rebalances, all
    /// processors are drained before the new assignment is requested. Once `shutdown` resolves, the
    /// processors are drained and the group is left, which is the regular way of returning. Failures of
    /// the group session or any processor are returned as an error after draining the remaining processors.
    async fn consume_group<Q, G, S>(
        self: Arc<Self>,
        provider: Arc<Q>,
        coordinator: &G,
        queue: &QueueDescriptor,
        group: &ConsumerGroupDescriptor,
        consumer: &str, // &ConsumerIdentifier
        shutdown: S,
    ) -> EmptyResult
    where
        Q: QueueProvider + Send + Sync + 'static,
        G: GroupCoordinator + Send + Sync,
        S: Future<Output = ()> + Send;
}

#[async_trait]
impl<C> ConsumerExt for C
where
    C: Consumer + Send + Sync + 'static,
    C::Notification: Send + Sync,
{
    async fn consume_group<Q, G, S>(
        self: Arc<Self>,
        provider: Arc<Q>,
        coordinator: &G,
        queue: &QueueDescriptor,
        group: &ConsumerGroupDescriptor,
        consumer: &str, // &ConsumerIdentifier
        shutdown: S,
    ) -> EmptyResult
    where
        Q: QueueProvider + Send + Sync + 'static,
        G: GroupCoordinator + Send + Sync,
        S: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        let mut membership = coordinator.join(queue, group, consumer).await?;
        info!(consumer, group = %group.identifier(), "Joined consumer group");

        loop {
            let assignment = match membership.assign().await {
                Ok(assignment) => assignment,
                Err(e) => {
                    leave(&mut membership).await;
                    return Err(e.into());
                }
            };

            info!(
                generation = assignment.generation,
                partitions = ?assignment.partitions,
                "Received partition assignment"
            );

            let mut claims: Vec<ClaimHandle> = assignment
                .partitions
                .iter()
                .map(|partition| {
                    ClaimHandle::spawn(ClaimProcessor::new(
                        self.clone(),
                        provider.clone(),
                        queue.clone(),
                        group.clone(),
                        *partition,
                    ))
                })
                .collect();

            let (mut interruption, stopped) = {
                let finished = async {
                    if claims.is_empty() {
                        future::pending().await
                    } else {
                        let (result, index, _) = select_all(claims.iter_mut()).await;
                        (result, index)
                    }
                };

                tokio::select! {
                    revoked = membership.revoked() => match revoked {
                        Ok(_) => (Interruption::Rebalance, None),
                        Err(e) => (Interruption::Failure(e.into()), None),
                    },
                    _ = &mut shutdown => (Interruption::Shutdown, None),
                    (result, index) = finished => (Interruption::Rebalance, Some((index, result))),
                }
            };

            if let Some((index, result)) = stopped {
                // Completed handles must not be polled again
                let partition = claims.swap_remove(index).partition();

                interruption = match result {
                    Ok(report) => {
                        warn!(%partition, ?report, "Claim processor stopped unexpectedly");
                        Interruption::Rebalance
                    }
                    Err(e) => Interruption::Failure(e.into()),
                };
            }

            drain(claims).await;

            match interruption {
                Interruption::Rebalance => debug!("Assignment revoked"),
                Interruption::Shutdown => {
                    leave(&mut membership).await;
                    info!(consumer, "Left consumer group");
                    return Ok(());
                }
                Interruption::Failure(e) => {
                    error!(error = %e, "Consumer group session failed");
                    leave(&mut membership).await;
                    return Err(e);
                }
            }
        }
    }
}

async fn drain(claims: Vec<ClaimHandle>) {
    for claim in claims {
        let partition = claim.partition();

        match claim.drain().await {
            Ok(report) => debug!(%partition, ?report, "Claim drained"),
            Err(ClaimError::Aborted(_, e)) => warn!(%partition, error = %e, "Claim aborted"),
            Err(e) => warn!(%partition, error = %e, "Claim failed while draining"),
        }
    }
}

async fn leave<M: GroupMembership>(membership: &mut M) {
    if let Err(e) = membership.leave().await {
        warn!(error = %e, "Unable to leave consumer group cleanly");
    }
}
