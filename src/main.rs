use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use livetree::config::Config;
use livetree::demo::DemoApp;
use livetree::logging::init_tracing;
use livetree::server::AppServer;

#[derive(Debug, Parser)]
#[command(name = "livetree", version, about = "Serve the livetree demo application")]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the bind address (host:port)
    #[arg(long)]
    bind: Option<String>,

    /// Override the log filter, e.g. "debug" or "livetree=trace"
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
        config.validate()?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_tracing(&config.logging.level);

    let mut server = AppServer::new(config, Arc::new(DemoApp));
    let addr = server.try_bind().await?;
    tracing::info!("Open http://{} in a browser", addr);
    server.run().await?;
    Ok(())
}
