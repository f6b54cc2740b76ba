use crate::domain::{NotificationEnvelope, UserDirectory, UserIdentifier};
use crate::library::communication::event::{NotificationPublisher, Partition, QueueDescriptor};
use crate::library::BoxedError;
use thiserror::Error;
use tracing::{debug, instrument};

/// Receipt for a notification which has been appended to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    /// Partition the notification has been written to
    pub partition: Partition,
}

/// Reasons why a notification could not be sent
#[derive(Debug, Error)]
pub enum SendError {
    /// Either the sender or the recipient is not known
    #[error("user {0} not found")]
    UserNotFound(UserIdentifier),
    /// The log rejected the notification or could not be reached
    #[error("failed to publish notification")]
    PublishFailed(#[source] BoxedError),
}

/// Turns send requests into envelopes on the notification queue
///
/// Envelopes are keyed by their recipient. Failures are handed to the caller as-is, there are no retries.
pub struct Publisher<P> {
    publisher: P,
    directory: UserDirectory,
    queue: QueueDescriptor,
}

impl<P> Publisher<P>
where
    P: NotificationPublisher + Send + Sync,
{
    /// Creates a new instance from raw parts
    pub fn new(publisher: P, directory: UserDirectory, queue: QueueDescriptor) -> Self {
        Self {
            publisher,
            directory,
            queue,
        }
    }

    /// Resolves both users and publishes a notification from one to the other
    #[instrument(skip(self, message))]
    pub async fn send(
        &self,
        from: UserIdentifier,
        to: UserIdentifier,
        message: String,
    ) -> Result<Accepted, SendError> {
        let sender = self
            .directory
            .find(from)
            .ok_or(SendError::UserNotFound(from))?;

        let recipient = self
            .directory
            .find(to)
            .ok_or(SendError::UserNotFound(to))?;

        let envelope = NotificationEnvelope::new(sender.clone(), recipient.clone(), message);

        let partition = self
            .publisher
            .publish_to(&self.queue, &envelope)
            .await
            .map_err(SendError::PublishFailed)?;

        debug!(%partition, "Notification published");

        Ok(Accepted { partition })
    }
}
