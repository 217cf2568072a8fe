//! Label service binary.
//!
//! Standalone HTTP service applying label commands from GitHub webhooks.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use label_bot::{config::Config, server, Configuration, GitHubClient, LabelBot};

/// Label bot - applies `/kind`, `/priority` and `/sig` label commands.
#[derive(Parser)]
#[command(name = "label-bot")]
#[command(about = "Comment-driven label reconciliation for GitHub")]
#[command(version)]
struct Cli {
    /// HTTP server port
    #[arg(long, env = "LABEL_BOT_PORT")]
    port: Option<u16>,

    /// Path of the repository label configuration (YAML)
    #[arg(long, env = "LABEL_BOT_CONFIG")]
    config: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL")]
    github_api_url: Option<String>,

    /// Emit logs as JSON (also `LOG_FORMAT=json`)
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let json_logs = cli.json_logs || std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json");
    tracing_subscriber::registry()
        .with(json_logs.then(|| fmt::layer().json()))
        .with((!json_logs).then(fmt::layer))
        .with(EnvFilter::from_default_env().add_directive("label_bot=info".parse()?))
        .init();

    info!("Starting label service...");

    let mut config = Config::default();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(path) = cli.config {
        config.plugin_config_path = path;
    }
    if let Some(url) = cli.github_api_url {
        config.github_api_url = url;
    }

    let configuration = Configuration::load(&config.plugin_config_path)
        .with_context(|| format!("Failed to load {}", config.plugin_config_path))?;
    if configuration.items().is_empty() {
        warn!("No valid label config items - every event will be rejected");
    }

    let token = config
        .github_token
        .as_deref()
        .context("GITHUB_TOKEN is required")?;
    let client = GitHubClient::with_base_url(token, &config.github_api_url)
        .context("Failed to create GitHub client")?;
    info!(api_url = %config.github_api_url, "GitHub API client configured");

    if config.webhook_secret.is_none() {
        warn!("No GITHUB_WEBHOOK_SECRET configured - webhook signatures will not be verified");
    }

    let state = server::AppState {
        bot: LabelBot::new(Arc::new(client), Arc::new(configuration)),
        webhook_secret: config.webhook_secret.clone(),
    };
    let app = server::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(port = config.port, "Label service listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
