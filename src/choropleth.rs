// 🌍 Choropleth Builder
// Revenue per bidding zone for one (year, capacity, cycle limit) slice

use crate::config::ChartSettings;
use crate::data::DataStore;
use crate::geometry::ZoneGeometry;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub const MAP_HEIGHT: u32 = 650;
pub const MAP_WIDTH: u32 = 750;
const COLORBAR_X: f64 = 0.9;

/// Revenue shown for one zone; `None` when the slice has no record for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneValue {
    pub zone: String,
    pub revenue: Option<f64>,
}

/// Built map for one slice. Serialises to a Plotly figure via [`to_plotly`].
///
/// [`to_plotly`]: ChoroplethFigure::to_plotly
#[derive(Debug, Clone, PartialEq)]
pub struct ChoroplethFigure {
    pub year: i32,
    pub battery_capacity: u32,
    pub daily_cycle_limit: u32,
    pub zones: Vec<ZoneValue>,
    geojson: Arc<Value>,
    settings: ChartSettings,
}

impl ChoroplethFigure {
    pub fn value_for(&self, zone: &str) -> Option<f64> {
        self.zones
            .iter()
            .find(|z| z.zone == zone)
            .and_then(|z| z.revenue)
    }

    /// Zones that will actually be colored
    pub fn colored_zone_count(&self) -> usize {
        self.zones.iter().filter(|z| z.revenue.is_some()).count()
    }

    pub fn to_plotly(&self) -> Value {
        let locations: Vec<&str> = self.zones.iter().map(|z| z.zone.as_str()).collect();
        let z: Vec<Option<f64>> = self.zones.iter().map(|z| z.revenue).collect();

        json!({
            "data": [{
                "type": "choropleth",
                "geojson": self.geojson.as_ref(),
                "featureidkey": "id",
                "locations": locations,
                "z": z,
                "coloraxis": "coloraxis",
                "hovertemplate": "zoneName=%{location}<br>Revenue [€/MW/year]=%{z}<extra></extra>",
            }],
            "layout": {
                "geo": {
                    "projection": { "type": "mercator" },
                    "fitbounds": "locations",
                    "visible": false,
                },
                "coloraxis": {
                    "cmin": 0.0,
                    "cmax": self.settings.color_max,
                    "colorscale": self.settings.plotly_colorscale(),
                    "colorbar": { "title": { "text": "Revenue [€/MW/year]" }, "x": COLORBAR_X },
                },
                "height": MAP_HEIGHT,
                "width": MAP_WIDTH,
                "margin": { "t": 10, "b": 10 },
            },
        })
    }
}

/// Builds choropleth figures from the shared store and zone geometry.
///
/// The GeoJSON FeatureCollection is built once here and shared by every
/// figure.
#[derive(Debug, Clone)]
pub struct ChoroplethBuilder {
    store: Arc<DataStore>,
    geometry: Arc<ZoneGeometry>,
    features: Arc<Value>,
    settings: ChartSettings,
}

impl ChoroplethBuilder {
    pub fn new(store: Arc<DataStore>, geometry: Arc<ZoneGeometry>, settings: ChartSettings) -> Self {
        let features = Arc::new(geometry.to_feature_collection());
        ChoroplethBuilder {
            store,
            geometry,
            features,
            settings,
        }
    }

    /// Left-join every known zone geometry with the matching slice.
    ///
    /// A year or parameter pair with no data is not an error: every zone
    /// comes back with `revenue: None`.
    pub fn build(&self, year: i32, battery_capacity: u32, daily_cycle_limit: u32) -> ChoroplethFigure {
        let slice = self.store.slice_for_year(year, battery_capacity, daily_cycle_limit);

        let mut by_zone: HashMap<&str, f64> = HashMap::new();
        for record in &slice {
            // first match wins on duplicate keys
            by_zone
                .entry(record.zone_name.as_str())
                .or_insert(record.revenue_per_mw_year);
        }

        let zones: Vec<ZoneValue> = self
            .geometry
            .zones()
            .map(|zone| ZoneValue {
                zone: zone.to_string(),
                revenue: by_zone
                    .get(zone)
                    .map(|revenue| self.settings.rounding.round_cents(*revenue)),
            })
            .collect();

        debug!(
            year,
            battery_capacity,
            daily_cycle_limit,
            matched = slice.len(),
            zones = zones.len(),
            "choropleth built"
        );

        ChoroplethFigure {
            year,
            battery_capacity,
            daily_cycle_limit,
            zones,
            geojson: self.features.clone(),
            settings: self.settings.clone(),
        }
    }
}
