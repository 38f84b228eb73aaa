// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use clap::{Parser, Subcommand};

// Use library instead of local modules
use battery_ea_dashboard::{init_tracing, Dashboard, DataArgs};

#[derive(Parser, Debug)]
#[command(author, version, about = "Battery day-ahead EA revenues across European bidding zones")]
struct Cli {
    #[command(flatten)]
    data: DataArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive terminal dashboard (default)
    Tui,
    /// Print what the dataset and geometry contain
    Summary {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = cli.data.resolve()?;
    let dashboard = Dashboard::load(&config)?;

    match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => run_ui_mode(dashboard)?,
        Command::Summary { json } => run_summary(&dashboard, json)?,
    }

    Ok(())
}

fn run_summary(dashboard: &Dashboard, json: bool) -> Result<()> {
    let summary = dashboard.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("📊 Battery day-ahead EA revenues");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Records:          {}", summary.dataset.record_count);
    println!("Zones:            {}", summary.dataset.zones.len());
    println!("Years:            {:?}", summary.dataset.years);
    println!("Capacities [h]:   {:?}", summary.dataset.battery_capacities);
    println!("Cycle limits:     {:?}", summary.dataset.daily_cycle_limits);
    println!(
        "Geometry:         {} zones (as of {})",
        summary.zones_with_geometry, summary.geometry_reference_date
    );
    if !summary.zones_without_geometry.is_empty() {
        println!("Not on the map:   {}", summary.zones_without_geometry.join(", "));
    }
    if summary.dataset.duplicate_keys > 0 {
        println!("Duplicate keys:   {} (first match wins)", summary.dataset.duplicate_keys);
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(dashboard: Dashboard) -> Result<()> {
    let mut app = ui::App::new(dashboard);
    ui::run_ui(&mut app)
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_dashboard: Dashboard) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the web UI: cargo run --bin battery-ea-server --features server");
    std::process::exit(1);
}
