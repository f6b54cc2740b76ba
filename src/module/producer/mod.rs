//! Accepts notifications over HTTP and publishes them onto the partitioned topic

mod options;
mod publisher;
mod server;

pub use options::Options;
pub use publisher::{Accepted, Publisher, SendError};

use crate::domain::UserDirectory;
use crate::harness::{Heart, Module, SharedRedisFactory};
use crate::library::communication::implementation::redis::RedisPublisher;
use crate::library::BoxedError;
use async_trait::async_trait;
use jatsl::{schedule, JobScheduler};
use server::ServerJob;
use tracing::{debug, instrument};

/// Module implementation
pub struct Producer {
    options: Options,
}

impl Producer {
    /// Creates a new instance from raw parts
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Module for Producer {
    #[instrument(skip(self, scheduler))]
    async fn run(&mut self, scheduler: &JobScheduler) -> Result<Option<Heart>, BoxedError> {
        let factory = SharedRedisFactory::new(&self.options.redis.url)?;
        let publisher = Publisher::new(
            RedisPublisher::new(factory),
            UserDirectory::default(),
            self.options.topic.descriptor(),
        );

        let server = ServerJob::new(self.options.port, publisher);

        debug!("Scheduling send endpoint");
        schedule!(scheduler, { server });

        Ok(Some(Heart::without_heart_stone()))
    }
}
