// 🫧 Bubble Chart Builder
// Revenue (color) and average daily spread (size) per zone per year

use crate::config::ChartSettings;
use crate::data::DataStore;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

pub const BUBBLE_HEIGHT: u32 = 830;
pub const BUBBLE_WIDTH: u32 = 1060;

// Display labels
pub const ZONE_LABEL: &str = "Zone";
pub const YEAR_LABEL: &str = "Year";
pub const REVENUE_LABEL: &str = "Revenue [€/MW/year]";
pub const SPREAD_LABEL: &str = "Average daily spread [€]";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BubblePoint {
    #[serde(rename = "Zone")]
    pub zone: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Revenue [€/MW/year]")]
    pub revenue: f64,
    #[serde(rename = "Average daily spread [€]")]
    pub average_daily_spread: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BubbleFigure {
    pub battery_capacity: u32,
    pub daily_cycle_limit: u32,
    /// Zone descending, then year ascending
    pub points: Vec<BubblePoint>,
    settings: ChartSettings,
}

impl BubbleFigure {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Zones in plotting order (descending), without repeats
    pub fn zones(&self) -> Vec<&str> {
        let mut zones: Vec<&str> = self.points.iter().map(|p| p.zone.as_str()).collect();
        zones.dedup();
        zones
    }

    pub fn to_plotly(&self) -> Value {
        let x: Vec<i32> = self.points.iter().map(|p| p.year).collect();
        let y: Vec<&str> = self.points.iter().map(|p| p.zone.as_str()).collect();
        let color: Vec<f64> = self.points.iter().map(|p| p.revenue).collect();
        let size: Vec<f64> = self.points.iter().map(|p| p.average_daily_spread).collect();

        json!({
            "data": [{
                "type": "scatter",
                "mode": "markers",
                "x": x,
                "y": y,
                "marker": {
                    "color": color,
                    "coloraxis": "coloraxis",
                    "size": size,
                    "sizemode": "area",
                    "sizeref": self.settings.bubble_sizeref,
                    "line": { "width": 0 },
                },
                "hovertemplate": format!(
                    "{ZONE_LABEL}=%{{y}}<br>{YEAR_LABEL}=%{{x}}<br>{REVENUE_LABEL}=%{{marker.color}}<br>{SPREAD_LABEL}=%{{marker.size}}<extra></extra>"
                ),
                "showlegend": false,
            }],
            "layout": {
                "paper_bgcolor": "white",
                "plot_bgcolor": "white",
                "height": BUBBLE_HEIGHT,
                "width": BUBBLE_WIDTH,
                "showlegend": false,
                "coloraxis": {
                    "cmin": 0.0,
                    "cmax": self.settings.color_max,
                    "colorscale": self.settings.plotly_colorscale(),
                    "colorbar": { "title": { "text": REVENUE_LABEL } },
                },
                "xaxis": { "title": { "text": YEAR_LABEL }, "dtick": 1 },
                "yaxis": {
                    "title": { "text": "Bidding Zone" },
                    "type": "category",
                    "showgrid": true,
                    "gridwidth": 1,
                    "gridcolor": "LightGray",
                },
            },
        })
    }
}

/// Builds the all-years bubble chart for a (capacity, cycle limit) pair.
#[derive(Debug, Clone)]
pub struct BubbleChartBuilder {
    store: Arc<DataStore>,
    settings: ChartSettings,
}

impl BubbleChartBuilder {
    pub fn new(store: Arc<DataStore>, settings: ChartSettings) -> Self {
        BubbleChartBuilder { store, settings }
    }

    /// One point per matching record. An empty slice yields an empty chart.
    pub fn build(&self, battery_capacity: u32, daily_cycle_limit: u32) -> BubbleFigure {
        let mut points: Vec<BubblePoint> = self
            .store
            .slice_all_years(battery_capacity, daily_cycle_limit)
            .into_iter()
            .map(|r| BubblePoint {
                revenue: self.settings.rounding.round_cents(r.revenue_per_mw_year),
                zone: r.zone_name,
                year: r.year,
                average_daily_spread: r.average_daily_spread,
            })
            .collect();

        // stable, so duplicate keys keep file order
        points.sort_by(|a, b| b.zone.cmp(&a.zone).then(a.year.cmp(&b.year)));

        debug!(
            battery_capacity,
            daily_cycle_limit,
            points = points.len(),
            "bubble chart built"
        );

        BubbleFigure {
            battery_capacity,
            daily_cycle_limit,
            points,
            settings: self.settings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests::record;

    fn builder() -> BubbleChartBuilder {
        let store = DataStore::from_records(vec![
            record("AT", 2017, 1, 1, 40000.0, 10.0),
            record("SE3", 2016, 1, 1, 30000.126, 8.0),
            record("DE", 2020, 1, 1, 50000.004, 12.3),
            record("DE", 2016, 1, 1, 45000.0, 11.0),
            record("DE", 2020, 2, 1, 90000.0, 12.3),
            record("FR", 2018, 1, 3, 70000.0, 15.0),
        ]);
        BubbleChartBuilder::new(Arc::new(store), ChartSettings::default())
    }

    #[test]
    fn test_points_sorted_by_zone_descending() {
        let figure = builder().build(1, 1);

        let keys: Vec<(&str, i32)> = figure.points.iter().map(|p| (p.zone.as_str(), p.year)).collect();
        assert_eq!(
            keys,
            vec![("SE3", 2016), ("DE", 2016), ("DE", 2020), ("AT", 2017)]
        );
        assert_eq!(figure.zones(), vec!["SE3", "DE", "AT"]);
    }

    #[test]
    fn test_no_point_for_absent_combination() {
        let figure = builder().build(1, 3);
        assert_eq!(figure.points.len(), 1);
        assert_eq!(figure.points[0].zone, "FR");

        assert!(builder().build(2, 3).is_empty());
    }

    #[test]
    fn test_revenue_rounded_spread_untouched() {
        let figure = builder().build(1, 1);
        let se3 = &figure.points[0];
        assert_eq!(se3.revenue, 30000.13);
        assert_eq!(se3.average_daily_spread, 8.0);
    }

    #[test]
    fn test_display_labels() {
        let figure = builder().build(1, 3);
        let row = serde_json::to_value(&figure.points[0]).unwrap();

        assert_eq!(row[ZONE_LABEL], "FR");
        assert_eq!(row[SPREAD_LABEL], 15.0);
        assert_eq!(row[REVENUE_LABEL], 70000.0);
    }

    #[test]
    fn test_plotly_figure_layout() {
        let figure = builder().build(1, 1).to_plotly();

        let trace = &figure["data"][0];
        assert_eq!(trace["type"], "scatter");
        assert_eq!(trace["x"], json!([2016, 2016, 2020, 2017]));
        assert_eq!(trace["y"], json!(["SE3", "DE", "DE", "AT"]));
        assert_eq!(trace["marker"]["sizeref"], 0.18);
        assert_eq!(trace["marker"]["sizemode"], "area");

        let layout = &figure["layout"];
        assert_eq!(layout["showlegend"], false);
        assert_eq!(layout["height"], 830);
        assert_eq!(layout["width"], 1060);
        assert_eq!(layout["xaxis"]["dtick"], 1);
        assert_eq!(layout["coloraxis"]["cmax"], 160000.0);
        assert_eq!(layout["yaxis"]["title"]["text"], "Bidding Zone");
    }

    #[test]
    fn test_empty_chart_still_renders() {
        let figure = builder().build(2, 3).to_plotly();
        assert_eq!(figure["data"][0]["x"], json!([]));
        assert_eq!(figure["layout"]["width"], 1060);
    }
}
