use super::RedisConnection;
use crate::library::BoxedError;
use async_trait::async_trait;

/// Variant for redis connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedisConnectionVariant {
    /// Individual connection that allows for blocking commands without disturbing other users.
    /// Indicates that the consumer is operating long-running, blocking operations on the connection
    /// (e.g. waiting for new stream entries).
    Owned,
    /// Connection that can be shared between multiple users and generally does not permit blocking commands
    Multiplexed,
}

/// Factory for redis connections of different [types](RedisConnectionVariant)
#[async_trait]
pub trait RedisFactory {
    /// Establishes a new connection or clones a shared one
    async fn connection(&self, variant: RedisConnectionVariant)
        -> Result<RedisConnection, BoxedError>;
}
