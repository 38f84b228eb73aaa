// Battery EA Revenue Dashboard - Core Library
// Exposes the data store, chart builders and animation controller for the
// terminal dashboard, the web server, and tests

pub mod data;
pub mod geometry;
pub mod config;
pub mod choropleth;
pub mod bubble;
pub mod animation;
pub mod dashboard;
pub mod session;
pub mod cli;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use data::{DataStore, DatasetSummary, RevenueRecord, RoundingMode, REQUIRED_COLUMNS};
pub use geometry::{GeoJsonFileProvider, GeometryProvider, ZoneGeometry};
pub use config::{
    AnimationSettings, ChartSettings, ControlSettings, DashboardConfig, DataSettings, ServerSettings,
};
pub use choropleth::{ChoroplethBuilder, ChoroplethFigure, ZoneValue};
pub use bubble::{BubbleChartBuilder, BubbleFigure, BubblePoint};
pub use animation::{AnimationController, AnimationFrame, AnimationState, PlayState, YearRange};
pub use dashboard::{ControlOptions, Dashboard, DashboardSummary};
pub use session::SessionRegistry;
pub use cli::DataArgs;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the `tracing` subscriber used by both binaries.
///
/// `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // a second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
