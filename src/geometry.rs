// 🗺️ Zone Geometry
// Bidding zone polygons, resolved once at startup and joined against the data

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ============================================================================
// ZONE GEOMETRY
// ============================================================================

/// zone name → GeoJSON geometry object, ordered by zone name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneGeometry {
    shapes: BTreeMap<String, Value>,
}

impl ZoneGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, zone: impl Into<String>, geometry: Value) {
        self.shapes.insert(zone.into(), geometry);
    }

    pub fn get(&self, zone: &str) -> Option<&Value> {
        self.shapes.get(zone)
    }

    pub fn contains(&self, zone: &str) -> bool {
        self.shapes.contains_key(zone)
    }

    pub fn zones(&self) -> impl Iterator<Item = &str> {
        self.shapes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// GeoJSON FeatureCollection with the zone name as feature id.
    ///
    /// Plotly matches `locations` against `featureidkey: "id"`.
    pub fn to_feature_collection(&self) -> Value {
        let features: Vec<Value> = self
            .shapes
            .iter()
            .map(|(zone, geometry)| {
                json!({
                    "type": "Feature",
                    "id": zone,
                    "properties": { "zoneName": zone },
                    "geometry": geometry,
                })
            })
            .collect();

        json!({ "type": "FeatureCollection", "features": features })
    }
}

// ============================================================================
// PROVIDERS
// ============================================================================

/// Resolves polygons for a set of zones as they were on `reference_date`.
pub trait GeometryProvider: Send + Sync {
    fn load_zones(&self, zones: &[String], reference_date: NaiveDate) -> Result<ZoneGeometry>;
}

/// Reads zone shapes from a GeoJSON FeatureCollection on disk.
///
/// The file is a single snapshot, so `reference_date` is only reported.
#[derive(Debug, Clone)]
pub struct GeoJsonFileProvider {
    path: PathBuf,
    zone_property: String,
}

impl GeoJsonFileProvider {
    pub fn new(path: impl Into<PathBuf>, zone_property: impl Into<String>) -> Self {
        GeoJsonFileProvider {
            path: path.into(),
            zone_property: zone_property.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Zone name from `zone_property`, else the feature id
    fn feature_zone<'a>(&self, feature: &'a Value) -> Option<&'a str> {
        let id = || feature.get("id").and_then(Value::as_str);
        match feature.get("properties").and_then(|p| p.get(&self.zone_property)) {
            Some(Value::String(zone)) => Some(zone.as_str()),
            Some(other) => {
                warn!(
                    property = %self.zone_property,
                    value = %other,
                    "zone property is not a string; falling back to feature id"
                );
                id()
            }
            None => id(),
        }
    }

    pub fn parse(&self, content: &str, zones: &[String]) -> Result<ZoneGeometry> {
        let doc: Value = serde_json::from_str(content).context("Failed to parse GeoJSON")?;

        if doc.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
            bail!("GeoJSON root must be a FeatureCollection");
        }
        let features = doc
            .get("features")
            .and_then(Value::as_array)
            .context("GeoJSON FeatureCollection has no features array")?;

        let mut geometry = ZoneGeometry::new();
        for feature in features {
            let Some(zone) = self.feature_zone(feature) else {
                warn!("feature has no zone name; skipping");
                continue;
            };
            if !zones.iter().any(|z| z == zone) || geometry.contains(zone) {
                continue;
            }
            match feature.get("geometry") {
                Some(shape) if !shape.is_null() => geometry.insert(zone, shape.clone()),
                _ => warn!(zone, "feature has no geometry; skipping"),
            }
        }

        for zone in zones.iter().filter(|z| !geometry.contains(z)) {
            warn!(zone = %zone, "no geometry for zone; it will not appear on the map");
        }

        Ok(geometry)
    }
}

impl GeometryProvider for GeoJsonFileProvider {
    fn load_zones(&self, zones: &[String], reference_date: NaiveDate) -> Result<ZoneGeometry> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read zone geometry file: {:?}", self.path))?;
        let geometry = self
            .parse(&content, zones)
            .with_context(|| format!("Failed to load zone geometry: {:?}", self.path))?;

        info!(
            path = %self.path.display(),
            %reference_date,
            requested = zones.len(),
            resolved = geometry.len(),
            "zone geometry loaded"
        );
        Ok(geometry)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) fn square(x: f64, y: f64) -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[x, y], [x + 1.0, y], [x + 1.0, y + 1.0], [x, y + 1.0], [x, y]]]
        })
    }

    fn collection() -> String {
        json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "zoneName": "DE" }, "geometry": square(10.0, 50.0) },
                { "type": "Feature", "properties": { "zoneName": "FR" }, "geometry": square(2.0, 46.0) },
                { "type": "Feature", "properties": { "zoneName": "IT-North" }, "geometry": null },
                { "type": "Feature", "id": "NL", "properties": {}, "geometry": square(5.0, 52.0) }
            ]
        })
        .to_string()
    }

    fn zones(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_selects_requested_zones() {
        let provider = GeoJsonFileProvider::new("zones.geojson", "zoneName");
        let geometry = provider.parse(&collection(), &zones(&["DE", "NL"])).unwrap();

        assert_eq!(geometry.zones().collect::<Vec<_>>(), vec!["DE", "NL"]);
        assert_eq!(geometry.get("DE"), Some(&square(10.0, 50.0)));
    }

    #[test]
    fn test_missing_zone_and_null_geometry_are_dropped() {
        let provider = GeoJsonFileProvider::new("zones.geojson", "zoneName");
        let geometry = provider
            .parse(&collection(), &zones(&["DE", "IT-North", "PL"]))
            .unwrap();

        assert_eq!(geometry.len(), 1);
        assert!(!geometry.contains("IT-North"));
        assert!(!geometry.contains("PL"));
    }

    #[test]
    fn test_non_string_zone_property_falls_back_to_id() {
        let content = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "id": "BE", "properties": { "zoneName": 42 }, "geometry": square(4.0, 50.0) },
                { "type": "Feature", "properties": { "zoneName": ["AT"] }, "geometry": square(14.0, 47.0) }
            ]
        })
        .to_string();

        let provider = GeoJsonFileProvider::new("zones.geojson", "zoneName");
        let geometry = provider.parse(&content, &zones(&["BE", "AT"])).unwrap();

        assert_eq!(geometry.zones().collect::<Vec<_>>(), vec!["BE"]);
    }

    #[test]
    fn test_rejects_non_collection() {
        let provider = GeoJsonFileProvider::new("zones.geojson", "zoneName");
        let err = provider
            .parse(r#"{"type": "Feature"}"#, &zones(&["DE"]))
            .unwrap_err();
        assert!(err.to_string().contains("FeatureCollection"));
    }

    #[test]
    fn test_load_zones_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(collection().as_bytes()).unwrap();

        let provider = GeoJsonFileProvider::new(file.path(), "zoneName");
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let geometry = provider.load_zones(&zones(&["FR"]), date).unwrap();

        assert_eq!(geometry.len(), 1);
    }

    #[test]
    fn test_feature_collection_uses_zone_as_id() {
        let mut geometry = ZoneGeometry::new();
        geometry.insert("SE3", square(15.0, 58.0));

        let fc = geometry.to_feature_collection();
        assert_eq!(fc["type"], "FeatureCollection");
        assert_eq!(fc["features"][0]["id"], "SE3");
        assert_eq!(fc["features"][0]["geometry"], square(15.0, 58.0));
    }
}
