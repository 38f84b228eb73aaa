// Battery EA Revenue Dashboard - Web Server
// Serves the dashboard page and its JSON API with Axum

use anyhow::{Context, Result};
use battery_ea_dashboard::server::{router, AppState};
use battery_ea_dashboard::{init_tracing, Dashboard, DataArgs, SessionRegistry};
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Web dashboard for battery day-ahead EA revenues")]
struct Cli {
    #[command(flatten)]
    data: DataArgs,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = cli.data.resolve()?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // fatal: never serve a half-loaded dashboard
    let dashboard = Dashboard::load(&config)?;
    let sessions = SessionRegistry::from_settings(&config.server)?;
    let app = router(AppState::new(dashboard, sessions));

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(%addr, "dashboard listening");
    println!("\n🚀 Dashboard running on http://localhost:{}", config.server.port);
    println!("   API: http://localhost:{}/api/options", config.server.port);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
