// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use framebridge::config;
use framebridge::engine;
use framebridge::proxy;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "framebridge", about = "OpenAI-compatible front for a framed binary chat upstream")]
struct Cli {
    /// Path to the framebridge.yaml config file
    #[arg(long, default_value = "framebridge.yaml", env = "FRAMEBRIDGE_CONFIG")]
    config: String,

    /// Port to listen on
    #[arg(long, default_value_t = 3000, env = "PORT")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "FRAMEBRIDGE_HOST")]
    host: IpAddr,

    /// Upstream checksum used when the config file sets none
    #[arg(long, env = "CURSOR_CHECKSUM")]
    checksum: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let addr = SocketAddr::new(cli.host, cli.port);
    tracing::info!(%addr, "framebridge starting");

    let source = config::FileSource {
        path: std::path::PathBuf::from(&cli.config),
    };
    let mut config = match config::load_config(&source) {
        Ok(c) => c,
        Err(e) if e.is_not_found() => {
            tracing::warn!(path = %cli.config, "config file not found, using built-in defaults");
            config::Config::default()
        }
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    config.identity = config.identity.with_checksum_fallback(cli.checksum);
    let config = Arc::new(config);

    tracing::info!(
        upstream = %config.upstream.url,
        timeout_ms = ?config.upstream.timeout_ms,
        no_stream_prefixes = ?config.models.no_stream_prefixes,
        config_hash = %config.config_hash,
        checksum_pinned = config.identity.checksum.is_some(),
        "config loaded"
    );

    let no_stream_prefixes = config.models.no_stream_prefixes.clone();
    let upstream: Arc<dyn proxy::UpstreamClient> = Arc::new(engine::build_engine_client(config));

    let app = proxy::build_router(upstream, no_stream_prefixes);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind to address");

    tracing::info!(%addr, "framebridge listening");

    axum::serve(listener, app)
        .await
        .expect("server error");
}
