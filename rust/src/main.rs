#![cfg_attr(
    all(target_os = "windows", not(debug_assertions)),
    windows_subsystem = "windows"
)]

#[cfg(target_os = "windows")]
mod windows_app;

use ai_site_builder::config_store::ConfigStore;
use ai_site_builder::generation::GeminiClient;
use ai_site_builder::path_utils::{get_base_dir, resolve_config_path};
use ai_site_builder::server::{AppServer, AppState};
use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

struct Args {
    config: Option<String>,
}

fn main() -> Result<()> {
    init_logging();

    let args = parse_args();
    let base_dir = get_base_dir();
    let config_path = resolve_config_path(args.config, &base_dir);

    let config = ConfigStore::new(config_path.clone())
        .with_context(|| format!("config error: {}", config_path.display()))?;
    let settings = config.generation();

    let api_key = env::var(&settings.api_key_env).unwrap_or_default();
    if api_key.trim().is_empty() {
        warn!(
            var = %settings.api_key_env,
            "API key is not set; generation requests will fail"
        );
    }

    let client = GeminiClient::new(api_key, &settings);
    info!(model = client.model(), config = %config_path.display(), "starting site builder");

    let state = Arc::new(AppState::new(Arc::new(client)));
    let server = AppServer::start(state, config.server_port())
        .context("failed to start site builder server")?;

    run_shell(server)
}

#[cfg(target_os = "windows")]
fn run_shell(server: AppServer) -> Result<()> {
    windows_app::run(server)
}

#[cfg(not(target_os = "windows"))]
fn run_shell(mut server: AppServer) -> Result<()> {
    info!(url = %server.url(), "open the builder in a browser; Ctrl+C to quit");
    println!("AI Site Builder running at {}", server.url());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build signal runtime")?;
    runtime
        .block_on(tokio::signal::ctrl_c())
        .context("failed to wait for Ctrl+C")?;

    info!("shutting down");
    server.stop();
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ai_site_builder=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn parse_args() -> Args {
    let mut config = None;
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(value) = args.next() {
                config = Some(value);
            }
        }
    }

    Args { config }
}
