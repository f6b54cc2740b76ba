//! Structures to communicate between services through a partitioned, durable log
//!
//! Producers publish [`Notifications`](event::Notification) onto a queue which is split into
//! a fixed number of partitions. The partition is derived from a key carried by the notification
//! itself, thus all notifications sharing a key are strictly ordered relative to each other.
//!
//! Consumers join a consumer group and are handed a disjoint set of partitions by a
//! [`GroupCoordinator`](event::GroupCoordinator). For each partition they own, a
//! [`ClaimProcessor`](event::ClaimProcessor) pulls, applies, and acknowledges notifications
//! in order. For more details and a more in-depth explanation, consult the [`event`] module.

mod communication_factory;
mod error;

pub mod event;
pub mod implementation;

pub use communication_factory::CommunicationFactory;
pub use error::ErrorChain;
