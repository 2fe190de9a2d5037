use clap::Parser;
use crmdesk::cli::{run_command, ui, App, Cli};
use crmdesk::config::Config;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(url) = &cli.api_url {
        config = config.with_api_url(url)?;
    }
    init_tracing(config.log_json);

    let app = App::new(config)?;
    if let Err(e) = run_command(&app, cli.command).await {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

/// Logs go to stderr so they never mix with command output.
fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
