use crate::constants;
use crate::module::options::{RedisOptions, TopicOptions};
use structopt::StructOpt;

/// Options for the producer module
#[derive(Debug, StructOpt)]
pub struct Options {
    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub redis: RedisOptions,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub topic: TopicOptions,

    /// Port on which the send endpoint is served
    #[structopt(short, long, env, default_value = constants::PORT_PRODUCER)]
    pub port: u16,
}
