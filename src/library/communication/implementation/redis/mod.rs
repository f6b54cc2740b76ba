//! Trait implementations using [`redis`](::redis)
//!
//! Every partition of a queue is a separate stream which is consumed through a redis consumer group.
//! As redis has no concept of partition ownership, the [`RedisGroupCoordinator`] builds it on top
//! of plain keys and leases.

const STREAM_PAYLOAD_KEY: &str = "payload";
const STREAM_ID_NEW: &str = "*";
const STREAM_ID_HEAD: &str = "0";
const STREAM_ID_TAIL: &str = "$";
const STREAM_ID_ADDITIONS: &str = ">";

use thiserror::Error;

mod connection;
mod coordinator;
mod factory;
mod publisher;
mod queue_entry;
mod queue_provider;

pub use connection::*;
pub use coordinator::*;
pub use factory::*;
pub use publisher::*;
pub use queue_entry::*;
pub use queue_provider::*;

#[derive(Debug, Error)]
enum RedisQueueError {
    #[error("queue entry has an invalid id")]
    InvalidId(#[from] crate::library::communication::event::InvalidOffsetError),
}
