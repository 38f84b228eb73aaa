// 🧩 Dashboard
// Single-initialization wiring: data store + geometry + chart builders

use crate::animation::{AnimationController, YearRange};
use crate::bubble::BubbleChartBuilder;
use crate::choropleth::ChoroplethBuilder;
use crate::config::DashboardConfig;
use crate::data::{DataStore, DatasetSummary};
use crate::geometry::{GeoJsonFileProvider, GeometryProvider, ZoneGeometry};
use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Everything the front ends need, built once at startup and read-only
/// afterwards. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Dashboard {
    store: Arc<DataStore>,
    geometry: Arc<ZoneGeometry>,
    choropleth: ChoroplethBuilder,
    bubble: BubbleChartBuilder,
    years: YearRange,
    options: ControlOptions,
    reference_date: NaiveDate,
}

/// Control values and defaults advertised to the UI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlOptions {
    pub battery_capacities: Vec<u32>,
    pub daily_cycle_limits: Vec<u32>,
    pub slider_years: Vec<i32>,
    pub animation_years: Vec<i32>,
    pub interval_ms: u64,
    pub default_year: i32,
    pub default_battery_capacity: u32,
    pub default_daily_cycle_limit: u32,
}

/// Dataset summary plus what the geometry join resolved
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    #[serde(flatten)]
    pub dataset: DatasetSummary,
    pub zones_with_geometry: usize,
    pub zones_without_geometry: Vec<String>,
    pub geometry_reference_date: NaiveDate,
}

impl Dashboard {
    /// Load the CSV and zone geometry named in `config`. Any failure here is
    /// fatal: the dashboard never starts half-loaded.
    pub fn load(config: &DashboardConfig) -> Result<Self> {
        let store = DataStore::load_csv(&config.data.revenues_csv)?;
        let provider = GeoJsonFileProvider::new(&config.data.geometry, &config.data.zone_property);
        Self::with_provider(config, store, &provider)
    }

    pub fn with_provider(
        config: &DashboardConfig,
        store: DataStore,
        provider: &dyn GeometryProvider,
    ) -> Result<Self> {
        let geometry = provider.load_zones(&store.zone_names(), config.data.reference_date)?;
        Self::from_parts(config, store, geometry)
    }

    pub fn from_parts(config: &DashboardConfig, store: DataStore, geometry: ZoneGeometry) -> Result<Self> {
        config.validate()?;
        let years = config.animation.year_range(&store)?;

        let options = ControlOptions {
            battery_capacities: config.controls.battery_capacities.clone(),
            daily_cycle_limits: config.controls.daily_cycle_limits.clone(),
            slider_years: config.controls.slider_years(),
            animation_years: years.years().to_vec(),
            interval_ms: config.animation.interval_ms,
            default_year: years.first(),
            default_battery_capacity: config.controls.battery_capacities[0],
            default_daily_cycle_limit: config.controls.daily_cycle_limits[0],
        };

        let store = Arc::new(store);
        let geometry = Arc::new(geometry);

        info!(
            records = store.len(),
            zones_with_geometry = geometry.len(),
            years = ?years.years(),
            "dashboard ready"
        );

        Ok(Dashboard {
            choropleth: ChoroplethBuilder::new(store.clone(), geometry.clone(), config.chart.clone()),
            bubble: BubbleChartBuilder::new(store.clone(), config.chart.clone()),
            store,
            geometry,
            years,
            options,
            reference_date: config.data.reference_date,
        })
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn choropleth(&self) -> &ChoroplethBuilder {
        &self.choropleth
    }

    pub fn bubble(&self) -> &BubbleChartBuilder {
        &self.bubble
    }

    pub fn options(&self) -> &ControlOptions {
        &self.options
    }

    pub fn years(&self) -> &YearRange {
        &self.years
    }

    /// Fresh paused controller over the configured year range
    pub fn new_controller(&self) -> AnimationController {
        AnimationController::new(self.years.clone())
    }

    pub fn resumed_controller(&self, playing: bool) -> AnimationController {
        AnimationController::resumed(self.years.clone(), playing)
    }

    pub fn summary(&self) -> DashboardSummary {
        let dataset = self.store.summary();
        let zones_without_geometry = dataset
            .zones
            .iter()
            .filter(|z| !self.geometry.contains(z))
            .cloned()
            .collect();

        DashboardSummary {
            zones_with_geometry: self.geometry.len(),
            zones_without_geometry,
            geometry_reference_date: self.reference_date,
            dataset,
        }
    }
}
