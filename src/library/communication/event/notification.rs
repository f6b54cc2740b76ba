use super::QueueDescriptor;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Entity to notify other services about an event that took place
pub trait Notification: Serialize + DeserializeOwned + PartialEq + Debug {
    /// Default queue on which this implementation can be sent and received
    fn queue() -> QueueDescriptor;

    /// Key from which the partition is derived
    ///
    /// Notifications returning the same key are delivered in the order they have been published.
    fn partition_key(&self) -> String;
}
