use crate::library::communication::event::{Consumer, Delivery, Notification, QueueDescriptor};
use crate::library::EmptyResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{sleep, timeout};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MockNotification {
    pub key: String,
    pub value: String,
}

impl MockNotification {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_owned(),
            value: value.to_owned(),
        }
    }
}

impl Notification for MockNotification {
    fn queue() -> QueueDescriptor {
        QueueDescriptor::new("mock".into(), 4, 100)
    }

    fn partition_key(&self) -> String {
        self.key.clone()
    }
}

/// Consumer recording the values of all notifications it has been handed
#[derive(Default)]
pub struct MockConsumer {
    consumed: Mutex<Vec<(MockNotification, Delivery)>>,
    failure: Mutex<Option<String>>,
}

impl MockConsumer {
    /// Rejects every following notification with the given message
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_owned());
    }

    pub fn values(&self) -> Vec<String> {
        self.consumed
            .lock()
            .unwrap()
            .iter()
            .map(|(notification, _)| notification.value.clone())
            .collect()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.consumed
            .lock()
            .unwrap()
            .iter()
            .map(|(_, delivery)| *delivery)
            .collect()
    }

    /// Waits until at least `count` notifications have been consumed
    pub async fn wait_for(&self, count: usize) {
        timeout(Duration::from_secs(5), async {
            while self.consumed.lock().unwrap().len() < count {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("consumer did not receive the expected number of notifications");
    }
}

#[async_trait]
impl Consumer for MockConsumer {
    type Notification = MockNotification;

    async fn consume(&self, notification: MockNotification, delivery: &Delivery) -> EmptyResult {
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(message.into());
        }

        self.consumed
            .lock()
            .unwrap()
            .push((notification, *delivery));

        Ok(())
    }
}
