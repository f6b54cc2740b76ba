//! Constants shared between modules

/// Port on which the producer accepts send requests
pub const PORT_PRODUCER: &str = "8080";

/// Port on which the consumer serves notification queries
pub const PORT_CONSUMER: &str = "8081";

/// Default name of the topic notifications are relayed on
pub const DEFAULT_TOPIC: &str = "notifications";

/// Default name of the consumer group materializing inboxes
pub const DEFAULT_CONSUMER_GROUP: &str = "notifications-group";
