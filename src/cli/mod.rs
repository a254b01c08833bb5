use crate::app;
use crate::config::Config;
use crate::update::{UpdateConfig, UpdateEngine};
use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "meetbrief")]
#[command(about = "Posts today's Zoom meetings to a Slack channel", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Fetch today's meetings and post the briefing (the default)
    Notify,
    /// Check for a newer revision of the tool or install it
    Update(UpdateCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct UpdateCliArgs {
    /// Only check for a newer revision, do not download/install
    #[arg(long)]
    pub check: bool,
    /// Override the source repository URL
    #[arg(long)]
    pub repo: Option<String>,
    /// Override the install directory (default: the executable's directory)
    #[arg(long)]
    pub install_dir: Option<PathBuf>,
}

pub async fn handle_notify_command() -> Result<()> {
    let config = Config::from_env()?;
    app::run(&config).await
}

pub async fn handle_update_command(args: UpdateCliArgs) -> Result<()> {
    let config = UpdateConfig::detect(args.repo, args.install_dir)?;
    let engine = UpdateEngine::new(config)?;

    if args.check {
        let report = engine.check().await?;
        if report.has_update() {
            println!("Update available: {} -> {}", report.current, report.latest);
            println!("Latest change: {}", report.subject);
            println!("Run `meetbrief update` to install it.");
        } else {
            println!("Already up to date ({}).", report.current);
        }
        return Ok(());
    }

    let report = engine.install().await?;
    if report.has_update() {
        println!("Updated {} -> {}.", report.current, report.latest);
    } else {
        println!("Already up to date ({}).", report.current);
    }
    Ok(())
}
