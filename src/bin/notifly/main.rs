use anyhow::Result;
use notifly::harness::ModuleRunner;
use notifly::module::consumer::Consumer;
use notifly::module::producer::Producer;
use options::{Command, LogFormat};
use structopt::StructOpt;
use tracing::info;

mod options;

#[tokio::main]
async fn main() -> Result<()> {
    let (command, runner) = init();

    let reason = match command {
        Command::Producer(options) => runner.run(Producer::new(options)).await,
        Command::Consumer(options) => runner.run(Consumer::new(options)).await,
    };

    if reason.is_failure() {
        return Err(reason.into());
    }

    Ok(())
}

fn init() -> (Command, ModuleRunner) {
    let options = options::MainOptions::from_args();

    let formatter = tracing_subscriber::fmt().with_env_filter(options.log);

    match options.log_format {
        LogFormat::Text => formatter.init(),
        LogFormat::Compact => formatter.compact().init(),
        LogFormat::Json => formatter.json().init(),
    };

    info!("Notifly {}", env!("CARGO_PKG_VERSION"));

    (options.command, ModuleRunner::new(options.status_server))
}
