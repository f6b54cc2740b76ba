use super::RedisCommunicationFactory;
use crate::library::communication::event::{
    ConsumerExt, ConsumerGroupDescriptor, QueueDescriptor,
};
use crate::library::communication::CommunicationFactory;
use crate::library::helpers::Backoff;
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use futures::FutureExt;
use jatsl::{Job, JobManager};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Structure which can be instantiated with a [`CommunicationFactory`]
pub trait Service<F: CommunicationFactory + Send + Sync> {
    /// Name of the service displayed in log messages
    const NAME: &'static str;
    /// Instance type which will be instantiated
    type Instance: Send + Sync;
    /// Configuration type passed to the service
    type Config: Send + Sync;

    /// Creates a new instance which could be of a different type
    fn instantiate(factory: &F, config: &Self::Config) -> Self::Instance;
}

/// Keeps a consumer in its group, rejoining with an exponential backoff whenever the session fails
///
/// A session which stayed alive for at least `healthy_after` resets the backoff, thus only
/// failures in quick succession exhaust it. Once exhausted, the last error is returned.
#[derive(Debug, Clone)]
pub struct Supervisor {
    backoff: Backoff,
    healthy_after: Duration,
}

impl Supervisor {
    /// Creates a new instance from raw parts
    pub fn new(backoff: Backoff, healthy_after: Duration) -> Self {
        Self {
            backoff,
            healthy_after,
        }
    }

    /// Consumes the queue as a member of the given group until `shutdown` resolves
    pub async fn supervise<C, F, S>(
        &self,
        consumer: Arc<C>,
        factory: &F,
        queue: &QueueDescriptor,
        group: &ConsumerGroupDescriptor,
        id: &str, // &ConsumerIdentifier
        shutdown: S,
    ) -> EmptyResult
    where
        C: ConsumerExt + Send + Sync + 'static,
        F: CommunicationFactory + Send + Sync,
        S: Future<Output = ()> + Send,
    {
        let shutdown = shutdown.shared();
        let provider = Arc::new(factory.queue_provider());
        let coordinator = factory.group_coordinator();
        let mut backoff = self.backoff.clone();

        loop {
            let started = Instant::now();

            let error: BoxedError = match consumer
                .clone()
                .consume_group(
                    provider.clone(),
                    &coordinator,
                    queue,
                    group,
                    id,
                    shutdown.clone(),
                )
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            if started.elapsed() >= self.healthy_after {
                backoff.reset();
            }

            let delay = match backoff.next() {
                Some(delay) => delay,
                None => {
                    error!(error = %error, attempts = backoff.attempts(), "Giving up on consumer group");
                    return Err(error);
                }
            };

            warn!(error = %error, ?delay, attempt = backoff.attempts(), "Rejoining consumer group");

            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown.clone() => return Ok(()),
            }
        }
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(Backoff::default(), Duration::from_secs(30))
    }
}

/// Runner for [`Service`] implementations where [`Service::Instance`] is conforming to the [`ConsumerExt`] trait
pub struct ServiceRunner<S: Service<RedisCommunicationFactory>> {
    redis_url: String,
    queue: QueueDescriptor,
    group: ConsumerGroupDescriptor,
    consumer: String,
    heartbeat_interval: Duration,
    session_timeout: Duration,
    config: <S as Service<RedisCommunicationFactory>>::Config,
}

impl<S> ServiceRunner<S>
where
    S: Service<RedisCommunicationFactory>,
    S::Instance: ConsumerExt + Send + Sync + 'static,
{
    /// Creates a new runner job which will connect to the given redis server and use the provided consumer group and name
    pub fn new(
        redis_url: String,
        queue: QueueDescriptor,
        group: ConsumerGroupDescriptor,
        consumer: String,
        config: <S as Service<RedisCommunicationFactory>>::Config,
    ) -> Self {
        Self {
            redis_url,
            queue,
            group,
            consumer,
            heartbeat_interval: Duration::from_secs(1),
            session_timeout: Duration::from_secs(10),
            config,
        }
    }

    /// Overrides the default group session timings
    pub fn with_session(mut self, heartbeat_interval: Duration, session_timeout: Duration) -> Self {
        self.heartbeat_interval = heartbeat_interval;
        self.session_timeout = session_timeout;
        self
    }
}

#[async_trait]
impl<S> Job for ServiceRunner<S>
where
    S: Service<RedisCommunicationFactory> + Send + Sync,
    S::Instance: ConsumerExt + Send + Sync + 'static,
{
    const NAME: &'static str = "ServiceRunner";

    fn name(&self) -> String {
        format!("{}({})", Self::NAME, S::NAME)
    }

    async fn execute(&self, manager: JobManager) -> EmptyResult {
        let factory = RedisCommunicationFactory::new(
            &self.redis_url,
            self.heartbeat_interval,
            self.session_timeout,
        )?;
        let service = Arc::new(S::instantiate(&factory, &self.config));

        manager.ready().await;
        info!(service = S::NAME, consumer = %self.consumer, "Consuming queue");

        Supervisor::default()
            .supervise(
                service,
                &factory,
                &self.queue,
                &self.group,
                &self.consumer,
                manager.termination_signal(),
            )
            .await
    }
}
