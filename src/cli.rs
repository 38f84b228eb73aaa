use crate::config::DashboardConfig;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

/// Flags shared by both binaries; they override the config file
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    /// TOML config file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Revenue/spread CSV
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Zone GeoJSON FeatureCollection
    #[arg(long)]
    pub geometry: Option<PathBuf>,
}

impl DataArgs {
    pub fn resolve(&self) -> Result<DashboardConfig> {
        let mut config = DashboardConfig::load_or_default(self.config.as_deref())?;
        if let Some(data) = &self.data {
            config.data.revenues_csv = data.clone();
        }
        if let Some(geometry) = &self.geometry {
            config.data.geometry = geometry.clone();
        }
        Ok(config)
    }
}
