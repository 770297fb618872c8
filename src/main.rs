//! beacon - mirrors coding-agent activity onto Discord Rich Presence

use anyhow::Result;
use beacon::config::Config;
use beacon::shell;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "beacon")]
#[command(about = "Mirrors coding-agent activity onto Discord Rich Presence")]
#[command(version)]
struct Cli {
    /// Project directory whose name is shown in the status
    #[arg(default_value = ".")]
    project_dir: PathBuf,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Application client id (overrides the config file)
    #[arg(long)]
    client_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };
    if cli.client_id.is_some() {
        config.presence.client_id = cli.client_id;
    }

    let project_dir = cli
        .project_dir
        .canonicalize()
        .unwrap_or(cli.project_dir);

    shell::run(&project_dir, config).await
}
