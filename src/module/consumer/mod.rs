//! Joins the consumer group of the notification topic and serves the inboxes materialized from it
//!
//! Each instance only holds the inboxes of recipients whose partitions it currently owns, clients
//! have to query the instance responsible for the partition of the user they are interested in.

mod options;
mod query;
mod server;
mod service;
mod store;

pub use options::Options;
pub use query::{QueryResult, QueryService};
pub use service::NotificationConsumer;
pub use store::{NotificationStore, StoreError};

use crate::harness::{Heart, Module, ServiceRunner};
use crate::library::communication::event::ConsumerGroupDescriptor;
use crate::library::BoxedError;
use async_trait::async_trait;
use jatsl::{schedule, JobScheduler};
use server::ServerJob;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Module implementation
pub struct Consumer {
    options: Options,
}

impl Consumer {
    /// Creates a new instance from raw parts
    pub fn new(options: Options) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Module for Consumer {
    #[instrument(skip(self, scheduler), fields(id = %self.options.id))]
    async fn run(&mut self, scheduler: &JobScheduler) -> Result<Option<Heart>, BoxedError> {
        let store = Arc::new(NotificationStore::default());
        let group =
            ConsumerGroupDescriptor::new(self.options.group.clone().into(), self.options.start);

        let runner = ServiceRunner::<NotificationConsumer>::new(
            self.options.redis.url.clone(),
            self.options.topic.descriptor(),
            group,
            self.options.id.clone(),
            store.clone(),
        )
        .with_session(self.options.heartbeat_interval, self.options.session_timeout);

        let server = ServerJob::new(self.options.port, QueryService::new(store));

        debug!("Scheduling group consumer and query endpoint");
        schedule!(scheduler, { runner, server });

        Ok(Some(Heart::without_heart_stone()))
    }
}
