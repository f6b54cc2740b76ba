use super::store::NotificationStore;
use crate::domain::NotificationEnvelope;
use crate::harness::Service;
use crate::library::communication::event::{Consumer, Delivery};
use crate::library::communication::CommunicationFactory;
use crate::library::EmptyResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Materializes consumed envelopes into the inboxes of their recipients
pub struct NotificationConsumer {
    store: Arc<NotificationStore>,
}

impl NotificationConsumer {
    /// Creates a new instance writing into the given store
    pub fn new(store: Arc<NotificationStore>) -> Self {
        Self { store }
    }
}

impl<F> Service<F> for NotificationConsumer
where
    F: CommunicationFactory + Send + Sync,
{
    const NAME: &'static str = "NotificationConsumer";
    type Instance = NotificationConsumer;
    type Config = Arc<NotificationStore>;

    fn instantiate(_factory: &F, store: &Self::Config) -> Self::Instance {
        Self::new(store.clone())
    }
}

#[async_trait]
impl Consumer for NotificationConsumer {
    type Notification = NotificationEnvelope;

    #[instrument(skip(self, notification, delivery), fields(recipient = notification.to.id, %delivery))]
    async fn consume(&self, notification: NotificationEnvelope, delivery: &Delivery) -> EmptyResult {
        // The recipient is read from the payload, the partition key is derived from the very same field
        let recipient = notification.to.id;

        if self.store.record_delivery(recipient, notification, delivery) {
            debug!("Notification recorded");
        } else {
            debug!("Ignoring redelivered notification");
        }

        Ok(())
    }
}
