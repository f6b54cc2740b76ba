//! Various options usable by modules
//!
//! The structs in this module allow other modules to flatten them into
//! their own options struct. This allows for a unified yet non-cluttered
//! option set.

use crate::constants::DEFAULT_TOPIC;
use crate::library::communication::event::QueueDescriptor;
use structopt::StructOpt;

/// Options for connecting to the Redis server
#[derive(Debug, StructOpt)]
pub struct RedisOptions {
    /// Redis database server URL
    #[structopt(
        short = "r",
        long = "redis",
        env = "REDIS",
        global = true,
        default_value = "redis://localhost:6379/",
        value_name = "url"
    )]
    pub url: String,
}

/// Options describing the partitioned topic notifications are relayed on
///
/// Producers and consumers of one topic have to agree on all of these!
#[derive(Debug, StructOpt)]
pub struct TopicOptions {
    /// Name of the topic
    #[structopt(long, env, default_value = DEFAULT_TOPIC, value_name = "name")]
    pub topic: String,

    /// Number of partitions the topic is split into.
    /// Changing it for an existing topic breaks the ordering of notifications per recipient.
    #[structopt(long, env, default_value = "8")]
    pub partitions: u32,

    /// Approximate number of notifications retained in each partition
    #[structopt(long, env, default_value = "100000", value_name = "entries")]
    pub retention: usize,
}

impl TopicOptions {
    /// Queue described by these options
    pub fn descriptor(&self) -> QueueDescriptor {
        QueueDescriptor::new(self.topic.clone(), self.partitions, self.retention)
    }
}
