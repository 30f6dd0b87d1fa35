use clap::Parser;
use judge_runner::RunnerConfig;
use judge_runner_server::{create_app, run_server};
use std::{net::SocketAddr, path::PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to listen on
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    addr: SocketAddr,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of concurrent executions, overrides the config file
    #[arg(short, long)]
    max_concurrent: Option<usize>,

    /// Directory for per-request workspaces, overrides the config file
    #[arg(long)]
    workspace_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::default(),
    };
    if let Some(max_concurrent) = args.max_concurrent {
        config.max_concurrent_executions = max_concurrent;
    }
    if let Some(workspace_root) = args.workspace_root {
        config.workspace_root = workspace_root;
    }
    info!(
        workspace_root = %config.workspace_root.display(),
        max_concurrent = config.max_concurrent_executions,
        "Loaded configuration"
    );

    let app = create_app(config)?;
    run_server(app, args.addr).await?;

    Ok(())
}
