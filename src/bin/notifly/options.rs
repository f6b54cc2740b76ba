use std::str::FromStr;
use structopt::StructOpt;

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Text,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, StructOpt)]
#[structopt(about = "Relays notifications between users through a partitioned log.")]
pub struct MainOptions {
    /// Log level, scopable to different modules
    ///
    /// Levels: trace, debug, info, warn, error
    #[structopt(
        short,
        long,
        global = true,
        default_value = "info,hyper=warn,warp=warn",
        env = "RUST_LOG",
        value_name = "level"
    )]
    pub log: String,

    /// Format of log output (text, compact, or json)
    #[structopt(long, global = true, env, default_value = "text", value_name = "format")]
    pub log_format: LogFormat,

    /// Enable status reporting server which can be used as a readiness probe
    #[structopt(long, global = true, env, value_name = "port")]
    pub status_server: Option<u16>,

    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Accepts notifications and publishes them onto the topic
    Producer(notifly::module::producer::Options),
    /// Consumes the topic as a group member and serves user inboxes
    Consumer(notifly::module::consumer::Options),
}
