// 📊 Revenue Data Store
// Loads the pre-computed revenue/spread CSV once and serves read-only slices

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::{info, warn};

// ============================================================================
// RECORD
// ============================================================================

/// One row of the revenue dataset.
///
/// Header names follow the CSV produced by the revenue pipeline. Extra
/// columns (e.g. a leading dataframe index) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueRecord {
    #[serde(rename = "zoneName")]
    pub zone_name: String,

    #[serde(rename = "Year")]
    pub year: i32,

    /// Hours of storage (1 or 2)
    pub battery_capacity: u32,

    /// Max charge/discharge cycles per day (1, 2 or 3)
    pub daily_cycle_limit: u32,

    /// €/MW/year
    #[serde(rename = "Revenue [€/MW/year]")]
    pub revenue_per_mw_year: f64,

    /// €/MW
    pub average_daily_spread: f64,
}

impl RevenueRecord {
    pub fn matches(&self, battery_capacity: u32, daily_cycle_limit: u32) -> bool {
        self.battery_capacity == battery_capacity && self.daily_cycle_limit == daily_cycle_limit
    }

    pub fn matches_year(&self, year: i32, battery_capacity: u32, daily_cycle_limit: u32) -> bool {
        self.year == year && self.matches(battery_capacity, daily_cycle_limit)
    }

    fn key(&self) -> (&str, i32, u32, u32) {
        (
            &self.zone_name,
            self.year,
            self.battery_capacity,
            self.daily_cycle_limit,
        )
    }
}

/// Columns the loader refuses to start without.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "zoneName",
    "Year",
    "battery_capacity",
    "daily_cycle_limit",
    "Revenue [€/MW/year]",
    "average_daily_spread",
];

// ============================================================================
// ROUNDING
// ============================================================================

/// How revenue values are rounded to cents for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Ties go to the even neighbour (dataframe `round` behaviour)
    #[default]
    HalfEven,
    /// Ties go away from zero
    HalfUp,
}

impl RoundingMode {
    /// Round to 2 decimal places
    pub fn round_cents(&self, value: f64) -> f64 {
        let scaled = value * 100.0;
        let rounded = match self {
            RoundingMode::HalfEven => scaled.round_ties_even(),
            RoundingMode::HalfUp => scaled.round(),
        };
        rounded / 100.0
    }
}

// ============================================================================
// DATA STORE
// ============================================================================

/// Immutable in-memory table of revenue records.
///
/// Built once at startup and shared behind an `Arc`; nothing mutates it
/// afterwards. Slices handed to the chart builders are copies.
#[derive(Debug, Clone, Default)]
pub struct DataStore {
    records: Vec<RevenueRecord>,
}

/// Overview of what the store holds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub record_count: usize,
    pub zones: Vec<String>,
    pub years: Vec<i32>,
    pub battery_capacities: Vec<u32>,
    pub daily_cycle_limits: Vec<u32>,
    pub duplicate_keys: usize,
}

impl DataStore {
    pub fn from_records(records: Vec<RevenueRecord>) -> Self {
        let store = DataStore { records };
        let duplicates = store.duplicate_key_count();
        if duplicates > 0 {
            warn!(
                duplicates,
                "dataset has repeated (zone, year, capacity, cycle limit) keys; first match wins"
            );
        }
        store
    }

    /// Load the dataset from a CSV file, failing fast on a missing file,
    /// a missing column, or an unparsable value.
    pub fn load_csv(csv_path: &Path) -> Result<Self> {
        let rdr = csv::Reader::from_path(csv_path)
            .with_context(|| format!("Failed to open revenue CSV: {:?}", csv_path))?;
        let store = Self::from_reader(rdr)
            .with_context(|| format!("Failed to load revenue CSV: {:?}", csv_path))?;

        info!(
            path = %csv_path.display(),
            records = store.len(),
            zones = store.zone_names().len(),
            "revenue dataset loaded"
        );
        Ok(store)
    }

    pub fn from_reader<R: std::io::Read>(mut rdr: csv::Reader<R>) -> Result<Self> {
        let headers = rdr.headers().context("Failed to read CSV header")?.clone();
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .collect();
        if !missing.is_empty() {
            bail!("CSV is missing required column(s): {}", missing.join(", "));
        }

        let mut records = Vec::new();
        for (i, result) in rdr.deserialize().enumerate() {
            // header is line 1
            let record: RevenueRecord =
                result.with_context(|| format!("Malformed record on line {}", i + 2))?;
            records.push(record);
        }

        Ok(DataStore::from_records(records))
    }

    pub fn records(&self) -> &[RevenueRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records for one (year, capacity, cycle limit) triple, in file order
    pub fn slice_for_year(
        &self,
        year: i32,
        battery_capacity: u32,
        daily_cycle_limit: u32,
    ) -> Vec<RevenueRecord> {
        self.records
            .iter()
            .filter(|r| r.matches_year(year, battery_capacity, daily_cycle_limit))
            .cloned()
            .collect()
    }

    /// Records for one (capacity, cycle limit) pair across all years
    pub fn slice_all_years(&self, battery_capacity: u32, daily_cycle_limit: u32) -> Vec<RevenueRecord> {
        self.records
            .iter()
            .filter(|r| r.matches(battery_capacity, daily_cycle_limit))
            .cloned()
            .collect()
    }

    /// Distinct zone names, sorted
    pub fn zone_names(&self) -> Vec<String> {
        let zones: BTreeSet<&str> = self.records.iter().map(|r| r.zone_name.as_str()).collect();
        zones.into_iter().map(str::to_string).collect()
    }

    /// Distinct years, ascending
    pub fn years(&self) -> Vec<i32> {
        let years: BTreeSet<i32> = self.records.iter().map(|r| r.year).collect();
        years.into_iter().collect()
    }

    pub fn duplicate_key_count(&self) -> usize {
        let mut seen = HashSet::new();
        self.records.iter().filter(|r| !seen.insert(r.key())).count()
    }

    pub fn summary(&self) -> DatasetSummary {
        let capacities: BTreeSet<u32> = self.records.iter().map(|r| r.battery_capacity).collect();
        let cycles: BTreeSet<u32> = self.records.iter().map(|r| r.daily_cycle_limit).collect();

        DatasetSummary {
            record_count: self.records.len(),
            zones: self.zone_names(),
            years: self.years(),
            battery_capacities: capacities.into_iter().collect(),
            daily_cycle_limits: cycles.into_iter().collect(),
            duplicate_keys: self.duplicate_key_count(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) fn record(zone: &str, year: i32, cap: u32, cycles: u32, revenue: f64, spread: f64) -> RevenueRecord {
        RevenueRecord {
            zone_name: zone.to_string(),
            year,
            battery_capacity: cap,
            daily_cycle_limit: cycles,
            revenue_per_mw_year: revenue,
            average_daily_spread: spread,
        }
    }

    const SAMPLE_CSV: &str = "\
,zoneName,Year,battery_capacity,daily_cycle_limit,Revenue [€/MW/year],average_daily_spread
0,DE,2020,1,1,50000.004,12.3
1,FR,2020,1,1,61000.5,14.1
2,DE,2021,1,1,72000.0,20.0
3,DE,2020,2,1,81000.0,13.0
";

    #[test]
    fn test_load_csv_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_CSV.as_bytes()).unwrap();

        let store = DataStore::load_csv(file.path()).unwrap();

        assert_eq!(store.len(), 4);
        assert_eq!(store.records()[0], record("DE", 2020, 1, 1, 50000.004, 12.3));
        assert_eq!(store.zone_names(), vec!["DE", "FR"]);
        assert_eq!(store.years(), vec![2020, 2021]);
    }

    #[test]
    fn test_column_order_not_significant() {
        let csv_text = "\
average_daily_spread,Revenue [€/MW/year],daily_cycle_limit,battery_capacity,Year,zoneName
9.5,1000.0,3,2,2019,NL
";
        let store = DataStore::from_reader(csv::Reader::from_reader(csv_text.as_bytes())).unwrap();
        assert_eq!(store.records()[0], record("NL", 2019, 2, 3, 1000.0, 9.5));
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let csv_text = "zoneName,Year,battery_capacity,daily_cycle_limit,average_daily_spread\nDE,2020,1,1,3.0\n";
        let err = DataStore::from_reader(csv::Reader::from_reader(csv_text.as_bytes())).unwrap_err();
        assert!(err.to_string().contains("Revenue [€/MW/year]"));
    }

    #[test]
    fn test_malformed_value_names_line() {
        let csv_text = "\
zoneName,Year,battery_capacity,daily_cycle_limit,Revenue [€/MW/year],average_daily_spread
DE,2020,1,1,100.0,1.0
DE,twenty,1,1,100.0,1.0
";
        let err = DataStore::from_reader(csv::Reader::from_reader(csv_text.as_bytes())).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = DataStore::load_csv(Path::new("/nonexistent/revenues_spreads.csv"));
        assert!(result.is_err());
    }

    #[test]
    fn test_slices_do_not_touch_store() {
        let store = DataStore::from_records(vec![
            record("DE", 2020, 1, 1, 123.4567, 1.0),
            record("DE", 2020, 2, 1, 5.0, 1.0),
            record("FR", 2021, 1, 1, 6.0, 1.0),
        ]);

        let slice = store.slice_for_year(2020, 1, 1);
        assert_eq!(slice.len(), 1);
        assert_eq!(store.slice_all_years(1, 1).len(), 2);
        assert!(store.slice_for_year(2030, 1, 1).is_empty());
        assert_eq!(store.records()[0].revenue_per_mw_year, 123.4567);
    }

    #[test]
    fn test_summary_counts_duplicates() {
        let store = DataStore::from_records(vec![
            record("DE", 2020, 1, 1, 1.0, 1.0),
            record("DE", 2020, 1, 1, 2.0, 1.0),
            record("FR", 2020, 2, 3, 3.0, 1.0),
        ]);
        let summary = store.summary();

        assert_eq!(summary.record_count, 3);
        assert_eq!(summary.duplicate_keys, 1);
        assert_eq!(summary.battery_capacities, vec![1, 2]);
        assert_eq!(summary.daily_cycle_limits, vec![1, 3]);
    }

    #[test]
    fn test_rounding_to_cents() {
        assert_eq!(RoundingMode::HalfEven.round_cents(123.4567), 123.46);
        assert_eq!(RoundingMode::HalfUp.round_cents(123.4567), 123.46);
        assert_eq!(RoundingMode::HalfEven.round_cents(50000.004), 50000.0);
    }

    #[test]
    fn test_rounding_tie_cases() {
        // 123.455 scales to 12345.5: both modes land on the even, upper cent
        assert_eq!(RoundingMode::HalfEven.round_cents(123.455), 123.46);
        assert_eq!(RoundingMode::HalfUp.round_cents(123.455), 123.46);

        // 123.445 scales to 12344.5: the modes disagree
        assert_eq!(RoundingMode::HalfEven.round_cents(123.445), 123.44);
        assert_eq!(RoundingMode::HalfUp.round_cents(123.445), 123.45);
    }
}
