use super::resource::{connect_multiplexed, connect_owned};
use crate::library::communication::implementation::redis::{
    RedisConnection, RedisConnectionVariant, RedisFactory, RedisGroupCoordinator, RedisPublisher,
    RedisQueueProvider,
};
use crate::library::communication::CommunicationFactory;
use crate::library::BoxedError;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, enabled, Level};

/// [`RedisFactory`] implementation which shares one multiplexed connection between all its clones
#[derive(Clone)]
pub struct SharedRedisFactory {
    client: Client,
    shared: Arc<Mutex<Option<MultiplexedConnection>>>,
}

impl SharedRedisFactory {
    /// Creates a new factory opening connections to the given URL
    pub fn new(url: &str) -> Result<Self, BoxedError> {
        Ok(Self {
            client: Client::open(url)?,
            shared: Arc::new(Mutex::new(None)),
        })
    }
}

#[async_trait]
impl RedisFactory for SharedRedisFactory {
    async fn connection(
        &self,
        variant: RedisConnectionVariant,
    ) -> Result<RedisConnection, BoxedError> {
        let logging = enabled!(Level::TRACE);

        let connection = match variant {
            RedisConnectionVariant::Owned => RedisConnection::new(connect_owned(&self.client).await),
            RedisConnectionVariant::Multiplexed => {
                let mut shared = self.shared.lock().await;

                let con = match &*shared {
                    Some(con) => con.clone(),
                    None => {
                        debug!("Instantiating shared redis connection");
                        let con = connect_multiplexed(&self.client).await;
                        *shared = Some(con.clone());
                        con
                    }
                };

                RedisConnection::new(con)
            }
        };

        Ok(connection.with_logging(logging))
    }
}

/// Communication factory based on [`SharedRedisFactory`]
pub struct RedisCommunicationFactory {
    factory: SharedRedisFactory,
    heartbeat_interval: Duration,
    session_timeout: Duration,
}

impl RedisCommunicationFactory {
    /// Creates a new instance which connects to the given URL
    ///
    /// Members of consumer groups created through this factory send a heartbeat every `heartbeat_interval`
    /// and are evicted from their group if they miss heartbeats for longer than `session_timeout`.
    pub fn new(
        url: &str,
        heartbeat_interval: Duration,
        session_timeout: Duration,
    ) -> Result<Self, BoxedError> {
        Ok(Self {
            factory: SharedRedisFactory::new(url)?,
            heartbeat_interval,
            session_timeout,
        })
    }
}

impl CommunicationFactory for RedisCommunicationFactory {
    type QueueProvider = RedisQueueProvider<SharedRedisFactory>;
    type NotificationPublisher = RedisPublisher<SharedRedisFactory>;
    type GroupCoordinator = RedisGroupCoordinator<SharedRedisFactory>;

    fn queue_provider(&self) -> Self::QueueProvider {
        Self::QueueProvider::new(self.factory.clone())
    }

    fn notification_publisher(&self) -> Self::NotificationPublisher {
        Self::NotificationPublisher::new(self.factory.clone())
    }

    fn group_coordinator(&self) -> Self::GroupCoordinator {
        Self::GroupCoordinator::new(
            self.factory.clone(),
            self.heartbeat_interval,
            self.session_timeout,
        )
    }
}
