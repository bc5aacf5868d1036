mod api;
mod config;
mod error;
mod plugins;
mod search;
mod tts;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::ApiState;
use crate::config::Config;
use crate::plugins::builtin::{FileAccessPlugin, SamplePlugin};
use crate::plugins::PluginRegistry;
use crate::tts::EdgeSynthesizer;

fn print_help() {
    println!(
        "\
vox-gateway v{}

HTTP gateway exposing pluggable capability handlers, web search and
streaming speech synthesis.

USAGE:
    vox-gateway [OPTIONS] [CONFIG_PATH]

ARGUMENTS:
    CONFIG_PATH    Path to TOML configuration file [default: config/gateway.toml]

OPTIONS:
    -h, --help       Print this help message and exit
    -V, --version    Print version and exit

ENVIRONMENT VARIABLES:
    Variables are referenced in the config file via ${{VAR_NAME}} syntax.

    RUST_LOG          Log level filter for tracing
                      (e.g. debug, vox_gateway=debug,warn)
    TAVILY_API_KEY    API key for Tavily web search
                      (from https://tavily.com)

EXAMPLES:
    vox-gateway                            # uses config/gateway.toml
    vox-gateway /etc/vox/gateway.toml      # custom config path
    RUST_LOG=debug vox-gateway             # with debug logging",
        env!("CARGO_PKG_VERSION"),
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --help / --version before anything else
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("vox-gateway v{}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {}
        }
    }

    // Initialize logging (RUST_LOG=debug for debug mode)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vox_gateway=info")),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/gateway.toml".to_string());

    info!("Loading configuration from {config_path}");
    let config = Config::load(&config_path)?;

    // The sandbox root must exist before it can be canonicalized.
    std::fs::create_dir_all(&config.sandbox.root).with_context(|| {
        format!("creating sandbox root {}", config.sandbox.root.display())
    })?;

    let mut plugins = PluginRegistry::new();
    plugins.register(Arc::new(SamplePlugin::new()));
    plugins.register(Arc::new(
        FileAccessPlugin::new(&config.sandbox.root).with_context(|| {
            format!("opening sandbox root {}", config.sandbox.root.display())
        })?,
    ));
    info!(
        "Plugins: {} registered ({})",
        plugins.len(),
        plugins.names().join(", ")
    );

    let search = search::from_config(&config.search)?;
    info!("Search provider: {}", search.provider_name());
    info!("Synthesis voice: {}", config.tts.voice);

    let state = ApiState {
        plugins: Arc::new(plugins),
        search,
        synthesizer: Arc::new(EdgeSynthesizer::new()),
        voice: config.tts.voice.clone(),
    };

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, api::build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received, exiting");
        })
        .await?;

    Ok(())
}
