// Building Register Lookup - Web Server
// Address search and registry lookups over HTTP, plus the HTML form

use anyhow::{Context, Result};
use building_register::{
    logging,
    server::{router, AppState},
    AppConfig, Services,
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "building-register-server", version, about = "Building registry lookup server")]
struct Args {
    /// TOML config file (defaults to building-register.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address, overrides the config file
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Port, overrides the config file
    #[arg(long, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let _guard = logging::init_logging(&config.log_dir, "building-register-server", &config.log_level, true)?;

    println!("🌐 Building Register Lookup - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if config.juso_key().is_none() {
        tracing::warn!("JUSO_API_KEY is not set; address searches will fail");
    }
    if config.service_key().is_none() {
        tracing::warn!("BUILDING_API_SERVICE_KEY is not set; registry lookups will fail");
    }

    let app = router(AppState::new(Services::from_config(&config)));

    let addr = config.server_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    println!("\n🚀 Server running on http://{addr}");
    println!("   API: http://{addr}/building-register");
    println!("   UI:  http://{addr}");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
