use anyhow::Result;
use clap::Parser;
use meetbrief::cli::{handle_notify_command, handle_update_command, Cli, CliCommand};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("meetbrief {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(CliCommand::Update(args)) => handle_update_command(args).await,
        Some(CliCommand::Notify) | None => handle_notify_command().await,
    }
}
