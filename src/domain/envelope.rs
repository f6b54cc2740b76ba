use super::{User, DEFAULT_PARTITIONS, DEFAULT_RETENTION};
use crate::constants::DEFAULT_TOPIC;
use crate::library::communication::event::{Notification, QueueDescriptor};
use serde::{Deserialize, Serialize};

/// Notification sent from one user to another
///
/// Envelopes are published to a partition derived from the recipient, so all envelopes addressed
/// to the same user are delivered in the order they were sent. They carry no timestamp or sequence
/// number; their position in the partition defines their order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationEnvelope {
    /// User who sent the notification
    pub from: User,
    /// User receiving the notification
    pub to: User,
    /// Text body
    pub message: String,
}

impl NotificationEnvelope {
    /// Creates a new instance from raw parts
    pub fn new(from: User, to: User, message: String) -> Self {
        Self { from, to, message }
    }

    /// Key of the inbox this envelope belongs to
    pub fn recipient_key(&self) -> String {
        self.to.id.to_string()
    }
}

impl Notification for NotificationEnvelope {
    fn queue() -> QueueDescriptor {
        QueueDescriptor::new(DEFAULT_TOPIC.into(), DEFAULT_PARTITIONS, DEFAULT_RETENTION)
    }

    /// Derived from the recipient so the partition always agrees with the payload
    fn partition_key(&self) -> String {
        self.recipient_key()
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;

    fn envelope(from: u64, to: u64) -> NotificationEnvelope {
        NotificationEnvelope::new(User::new(from, "a"), User::new(to, "b"), "hi".into())
    }

    #[test]
    fn partition_by_recipient() {
        let queue = NotificationEnvelope::queue();

        assert_eq!(envelope(1, 2).partition_key(), "2");
        assert_eq!(
            queue.partition_for(&envelope(1, 2).partition_key()),
            queue.partition_for(&envelope(3, 2).partition_key())
        );
    }

    #[test]
    fn serialize_to_wire_format() {
        let json = serde_json::to_value(envelope(1, 2)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "from": { "id": 1, "name": "a" },
                "to": { "id": 2, "name": "b" },
                "message": "hi"
            })
        );
    }
}
