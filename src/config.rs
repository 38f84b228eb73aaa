// ⚙️ Dashboard Configuration
// TOML file with serde defaults; every key is optional

use crate::animation::YearRange;
use crate::data::{DataStore, RoundingMode};
use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Plotly's Inferno sequential scale, evenly spaced
const INFERNO: [&str; 10] = [
    "#000004", "#1b0c41", "#4a0c6b", "#781c6d", "#a52c60", "#cf4446", "#ed6925", "#fb9b06",
    "#f7d13d", "#fcffa4",
];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub animation: AnimationSettings,
    #[serde(default)]
    pub controls: ControlSettings,
    #[serde(default)]
    pub chart: ChartSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataSettings {
    #[serde(default = "default_revenues_csv")]
    pub revenues_csv: PathBuf,
    #[serde(default = "default_geometry")]
    pub geometry: PathBuf,
    /// GeoJSON feature property holding the zone name
    #[serde(default = "default_zone_property")]
    pub zone_property: String,
    #[serde(default = "default_reference_date")]
    pub reference_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Animation sessions idle longer than this are dropped
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
    /// Upper bound on live sessions; the least recently seen one is evicted
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnimationSettings {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_first_year")]
    pub first_year: i32,
    #[serde(default = "default_last_year")]
    pub last_year: i32,
    /// Cycle through the years present in the dataset instead
    #[serde(default)]
    pub years_from_data: bool,
}

/// Values offered by the input controls
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlSettings {
    #[serde(default = "default_battery_capacities")]
    pub battery_capacities: Vec<u32>,
    #[serde(default = "default_daily_cycle_limits")]
    pub daily_cycle_limits: Vec<u32>,
    #[serde(default = "default_slider_first_year")]
    pub slider_first_year: i32,
    #[serde(default = "default_slider_last_year")]
    pub slider_last_year: i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChartSettings {
    /// Upper end of the fixed color domain; the lower end is 0
    #[serde(default = "default_color_max")]
    pub color_max: f64,
    #[serde(default = "default_color_scale")]
    pub color_scale: String,
    #[serde(default = "default_bubble_sizeref")]
    pub bubble_sizeref: f64,
    #[serde(default)]
    pub rounding: RoundingMode,
}

fn default_revenues_csv() -> PathBuf {
    PathBuf::from("data/revenues_spreads.csv")
}

fn default_geometry() -> PathBuf {
    PathBuf::from("data/zones.geojson")
}

fn default_zone_property() -> String {
    "zoneName".to_owned()
}

fn default_reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn default_bind_address() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    8050
}

fn default_session_idle_secs() -> u64 {
    3600
}

fn default_max_sessions() -> usize {
    1000
}

fn default_interval_ms() -> u64 {
    3500
}

fn default_first_year() -> i32 {
    2016
}

fn default_last_year() -> i32 {
    2022
}

fn default_battery_capacities() -> Vec<u32> {
    vec![1, 2]
}

fn default_daily_cycle_limits() -> Vec<u32> {
    vec![1, 2, 3]
}

fn default_slider_first_year() -> i32 {
    2016
}

fn default_slider_last_year() -> i32 {
    2023
}

fn default_color_max() -> f64 {
    160_000.0
}

fn default_color_scale() -> String {
    "Inferno".to_owned()
}

fn default_bubble_sizeref() -> f64 {
    0.18
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            revenues_csv: default_revenues_csv(),
            geometry: default_geometry(),
            zone_property: default_zone_property(),
            reference_date: default_reference_date(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            session_idle_secs: default_session_idle_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            first_year: default_first_year(),
            last_year: default_last_year(),
            years_from_data: false,
        }
    }
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            battery_capacities: default_battery_capacities(),
            daily_cycle_limits: default_daily_cycle_limits(),
            slider_first_year: default_slider_first_year(),
            slider_last_year: default_slider_last_year(),
        }
    }
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            color_max: default_color_max(),
            color_scale: default_color_scale(),
            bubble_sizeref: default_bubble_sizeref(),
            rounding: RoundingMode::default(),
        }
    }
}

impl ChartSettings {
    /// Colorscale as plotly.js expects it. Inferno is not built into
    /// plotly.js, so it is expanded to explicit stops; other names pass
    /// through unchanged.
    pub fn plotly_colorscale(&self) -> Value {
        if self.color_scale.eq_ignore_ascii_case("inferno") {
            let last = (INFERNO.len() - 1) as f64;
            let stops: Vec<Value> = INFERNO
                .iter()
                .enumerate()
                .map(|(i, color)| json!([i as f64 / last, color]))
                .collect();
            Value::Array(stops)
        } else {
            Value::String(self.color_scale.clone())
        }
    }
}

impl ServerSettings {
    pub fn session_idle_ttl(&self) -> Result<Duration> {
        i64::try_from(self.session_idle_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .with_context(|| format!("server.session_idle_secs {} is out of range", self.session_idle_secs))
    }
}

impl AnimationSettings {
    /// The ordered years the animation cycles through
    pub fn year_range(&self, store: &DataStore) -> Result<YearRange> {
        if self.years_from_data {
            return YearRange::new(store.years()).context("dataset has no years to animate");
        }
        if self.first_year > self.last_year {
            bail!(
                "animation first_year {} is after last_year {}",
                self.first_year,
                self.last_year
            );
        }
        YearRange::new((self.first_year..=self.last_year).collect())
    }
}

impl ControlSettings {
    pub fn slider_years(&self) -> Vec<i32> {
        (self.slider_first_year..=self.slider_last_year).collect()
    }
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: DashboardConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.animation.interval_ms == 0 {
            bail!("animation.interval_ms must be positive");
        }
        self.server.session_idle_ttl()?;
        if self.server.max_sessions == 0 {
            bail!("server.max_sessions must be positive");
        }
        if self.chart.color_max <= 0.0 {
            bail!("chart.color_max must be positive");
        }
        if self.chart.bubble_sizeref <= 0.0 {
            bail!("chart.bubble_sizeref must be positive");
        }
        if self.controls.battery_capacities.is_empty() || self.controls.daily_cycle_limits.is_empty() {
            bail!("controls must offer at least one battery capacity and one cycle limit");
        }
        if self.controls.slider_first_year > self.controls.slider_last_year {
            bail!("controls.slider_first_year is after slider_last_year");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests::record;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = DashboardConfig::from_toml("").unwrap();

        assert_eq!(config.server.port, 8050);
        assert_eq!(config.animation.interval_ms, 3500);
        assert_eq!(config.chart.color_max, 160_000.0);
        assert_eq!(config.chart.rounding, RoundingMode::HalfEven);
        assert_eq!(config.data.reference_date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(config.controls.slider_years().len(), 8);
    }

    #[test]
    fn test_partial_override() {
        let config = DashboardConfig::from_toml(
            r#"
            [data]
            revenues_csv = "/srv/ea/revenues.csv"

            [animation]
            last_year = 2023

            [chart]
            rounding = "half_up"
            "#,
        )
        .unwrap();

        assert_eq!(config.data.revenues_csv, PathBuf::from("/srv/ea/revenues.csv"));
        assert_eq!(config.data.zone_property, "zoneName");
        assert_eq!(config.animation.first_year, 2016);
        assert_eq!(config.animation.last_year, 2023);
        assert_eq!(config.chart.rounding, RoundingMode::HalfUp);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(DashboardConfig::from_toml("[animation]\ninterval_ms = 0").is_err());
        assert!(DashboardConfig::from_toml("[chart]\nrounding = \"sideways\"").is_err());
        assert!(DashboardConfig::from_toml("[controls]\nbattery_capacities = []").is_err());
    }

    #[test]
    fn test_session_idle_secs_bounded() {
        let config = DashboardConfig::from_toml("[server]\nsession_idle_secs = 90").unwrap();
        assert_eq!(config.server.session_idle_ttl().unwrap(), Duration::seconds(90));

        let err = DashboardConfig::from_toml("[server]\nsession_idle_secs = 9300000000000000").unwrap_err();
        assert!(err.to_string().contains("session_idle_secs"));
        assert!(DashboardConfig::from_toml("[server]\nsession_idle_secs = 18446744073709551615").is_err());
        assert!(DashboardConfig::from_toml("[server]\nmax_sessions = 0").is_err());
    }

    #[test]
    fn test_default_year_range() {
        let range = AnimationSettings::default()
            .year_range(&DataStore::default())
            .unwrap();
        assert_eq!(range.years(), &[2016, 2017, 2018, 2019, 2020, 2021, 2022]);
    }

    #[test]
    fn test_year_range_from_data() {
        let store = DataStore::from_records(vec![
            record("DE", 2019, 1, 1, 1.0, 1.0),
            record("DE", 2017, 1, 1, 1.0, 1.0),
            record("FR", 2019, 1, 1, 1.0, 1.0),
        ]);
        let settings = AnimationSettings {
            years_from_data: true,
            ..AnimationSettings::default()
        };

        assert_eq!(settings.year_range(&store).unwrap().years(), &[2017, 2019]);
        assert!(settings.year_range(&DataStore::default()).is_err());
    }

    #[test]
    fn test_inverted_year_range_rejected() {
        let settings = AnimationSettings {
            first_year: 2022,
            last_year: 2016,
            ..AnimationSettings::default()
        };
        assert!(settings.year_range(&DataStore::default()).is_err());
    }

    #[test]
    fn test_inferno_expands_to_stops() {
        let scale = ChartSettings::default().plotly_colorscale();
        let stops = scale.as_array().unwrap();

        assert_eq!(stops.len(), 10);
        assert_eq!(stops[0], json!([0.0, "#000004"]));
        assert_eq!(stops[9], json!([1.0, "#fcffa4"]));

        let viridis = ChartSettings {
            color_scale: "Viridis".to_string(),
            ..ChartSettings::default()
        };
        assert_eq!(viridis.plotly_colorscale(), json!("Viridis"));
    }
}
