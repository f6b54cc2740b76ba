use crate::constants;
use crate::library::communication::event::QueueLocation;
use crate::library::helpers::parse_seconds;
use crate::module::options::{RedisOptions, TopicOptions};
use std::time::Duration;
use structopt::StructOpt;

fn parse_location(src: &str) -> Result<QueueLocation, String> {
    match src {
        "head" => Ok(QueueLocation::Head),
        "tail" => Ok(QueueLocation::Tail),
        other => Err(format!("unknown queue location '{}', expected head or tail", other)),
    }
}

/// Options for the consumer module
#[derive(Debug, StructOpt)]
pub struct Options {
    /// Unique and stable identifier for this instance.
    /// It is used to identify the member within its consumer group,
    /// thus no two running instances may share it!
    #[structopt(env)]
    pub id: String,

    /// Consumer group to join, all members of a group share the partitions of the topic
    #[structopt(long, env, default_value = constants::DEFAULT_CONSUMER_GROUP, value_name = "name")]
    pub group: String,

    /// Location from which a newly created group starts consuming (head or tail)
    #[structopt(long, env, default_value = "head", parse(try_from_str = parse_location))]
    pub start: QueueLocation,

    /// Interval in seconds at which group membership and partition leases are refreshed
    #[structopt(long, env, default_value = "1", parse(try_from_str = parse_seconds), value_name = "seconds")]
    pub heartbeat_interval: Duration,

    /// Duration in seconds after which members that missed their heartbeats are evicted
    #[structopt(long, env, default_value = "10", parse(try_from_str = parse_seconds), value_name = "seconds")]
    pub session_timeout: Duration,

    /// Port on which the query endpoint is served
    #[structopt(short, long, env, default_value = constants::PORT_CONSUMER)]
    pub port: u16,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub redis: RedisOptions,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub topic: TopicOptions,
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_queue_locations() {
        assert_eq!(parse_location("head"), Ok(QueueLocation::Head));
        assert_eq!(parse_location("tail"), Ok(QueueLocation::Tail));
        assert!(parse_location("middle").is_err());
    }

    #[test]
    fn apply_defaults() {
        let options = Options::from_iter_safe(&["consumer", "member-a"]).unwrap();

        assert_eq!(options.id, "member-a");
        assert_eq!(options.group, "notifications-group");
        assert_eq!(options.start, QueueLocation::Head);
        assert_eq!(options.heartbeat_interval, Duration::from_secs(1));
        assert_eq!(options.session_timeout, Duration::from_secs(10));
        assert_eq!(options.port, 8081);
    }
}
