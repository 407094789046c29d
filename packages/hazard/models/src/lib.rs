#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Hazard record types, coordinates, and the severity palette.
//!
//! Hazards are owned by the backend store; everything in this crate treats
//! them as read-only input. Raw rows arrive as [`HazardRecord`] (every
//! field optional, exactly as the store returns them) and are validated
//! into [`Hazard`] before they reach the map. Rows without a usable
//! identifier or position are rejected with [`MalformedRecord`] and simply
//! left off the map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker colors indexed by `clamp(severity, 0, 5)`.
pub const SEVERITY_PALETTE: [&str; 6] = [
    "#2ecc71", "#27ae60", "#f1c40f", "#e67e22", "#e74c3c", "#c0392b",
];

/// Highest severity with its own palette entry.
pub const MAX_SEVERITY: u8 = 5;

/// Returns the palette color for a severity value.
///
/// Values outside `0..=5` clamp to the nearest palette entry.
#[must_use]
pub fn severity_color(severity: i64) -> &'static str {
    let idx = usize::try_from(severity.clamp(0, i64::from(MAX_SEVERITY))).unwrap_or(0);
    SEVERITY_PALETTE[idx]
}

/// A geographic position in WGS84 degrees, `(lat, lon)` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Coordinate {
    /// Creates a coordinate from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether both components are finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Returns the `[lon, lat]` pair used by `GeoJSON` and the survey
    /// service.
    #[must_use]
    pub const fn lon_lat(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Builds the smallest box containing two opposite corners, in either
    /// order.
    #[must_use]
    pub fn from_corners(a: Coordinate, b: Coordinate) -> Self {
        Self {
            west: a.lon.min(b.lon),
            south: a.lat.min(b.lat),
            east: a.lon.max(b.lon),
            north: a.lat.max(b.lat),
        }
    }

    /// A square box of `half_extent` degrees on each side of `center`.
    #[must_use]
    pub const fn around(center: Coordinate, half_extent: f64) -> Self {
        Self {
            west: center.lon - half_extent,
            south: center.lat - half_extent,
            east: center.lon + half_extent,
            north: center.lat + half_extent,
        }
    }

    /// South-west corner.
    #[must_use]
    pub const fn south_west(&self) -> Coordinate {
        Coordinate::new(self.south, self.west)
    }

    /// South-east corner.
    #[must_use]
    pub const fn south_east(&self) -> Coordinate {
        Coordinate::new(self.south, self.east)
    }

    /// North-east corner.
    #[must_use]
    pub const fn north_east(&self) -> Coordinate {
        Coordinate::new(self.north, self.east)
    }

    /// North-west corner.
    #[must_use]
    pub const fn north_west(&self) -> Coordinate {
        Coordinate::new(self.north, self.west)
    }

    /// Whether `point` lies inside the box (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: Coordinate) -> bool {
        (self.south..=self.north).contains(&point.lat)
            && (self.west..=self.east).contains(&point.lon)
    }
}

/// Projected repair cost as reported by the analysis model.
///
/// The model emits either a plain number of dollars or free text such as
/// `"$200-$400"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepairCost {
    /// Dollar amount.
    Amount(f64),
    /// Free-form estimate.
    Text(String),
}

impl std::fmt::Display for RepairCost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Amount(amount) => write!(f, "${amount:.0}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// A hazard row exactly as returned by the store, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardRecord {
    /// Store identifier, a string or a number depending on the table.
    pub id: Option<serde_json::Value>,
    /// Latitude (WGS84).
    pub lat: Option<f64>,
    /// Longitude (WGS84).
    pub lng: Option<f64>,
    /// Hazard type label.
    pub hazard_type: Option<String>,
    /// Older rows carry the type under `type`.
    #[serde(rename = "type")]
    pub legacy_type: Option<String>,
    /// Severity, possibly fractional.
    pub severity: Option<f64>,
    /// Report origin.
    pub source: Option<String>,
    /// Workflow status.
    pub status: Option<String>,
    /// Insert time.
    pub created_at: Option<DateTime<Utc>>,
    /// Image URLs.
    pub images: Option<Vec<String>>,
    /// Analysis description.
    pub description: Option<String>,
    /// Street address.
    pub location: Option<String>,
    /// Surroundings noted by the analysis model.
    pub location_context: Option<String>,
    /// Projected repair cost.
    pub projected_repair_cost: Option<RepairCost>,
    /// Projected worsening timeframe.
    pub projected_worsening: Option<String>,
    /// How the hazard is expected to worsen.
    pub future_worsening_description: Option<String>,
}

/// A validated hazard report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    /// Store identifier (UUID for current rows).
    pub id: String,
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lon: f64,
    /// Hazard type label, e.g. `"pothole"`.
    pub hazard_type: Option<String>,
    /// Severity, nominally `0..=5`.
    pub severity: Option<i64>,
    /// Where the report came from (`"public"`, `"survey"`, ...).
    pub source: Option<String>,
    /// Workflow status.
    pub status: Option<String>,
    /// When the report was stored.
    pub created_at: Option<DateTime<Utc>>,
    /// Image URLs, first one is the primary photo.
    pub images: Vec<String>,
    /// Free-text description from the analysis model.
    pub description: Option<String>,
    /// Reverse-geocoded street address.
    pub location: Option<String>,
    /// Surroundings noted by the analysis model.
    pub location_context: Option<String>,
    /// Projected repair cost.
    pub projected_repair_cost: Option<RepairCost>,
    /// Projected worsening timeframe.
    pub projected_worsening: Option<String>,
    /// How the hazard is expected to worsen.
    pub future_worsening_description: Option<String>,
}

impl Hazard {
    /// Position of the hazard.
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }

    /// Severity used for styling; missing severity renders as 0.
    #[must_use]
    pub fn display_severity(&self) -> i64 {
        self.severity.unwrap_or(0)
    }

    /// Parses a single JSON row into a validated hazard.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedRecord`] if the row does not deserialize or lacks
    /// a usable id or position.
    pub fn from_json(value: serde_json::Value) -> Result<Self, MalformedRecord> {
        let record: HazardRecord =
            serde_json::from_value(value).map_err(|e| MalformedRecord::Shape {
                message: e.to_string(),
            })?;
        Self::try_from(record)
    }
}

impl TryFrom<HazardRecord> for Hazard {
    type Error = MalformedRecord;

    fn try_from(record: HazardRecord) -> Result<Self, Self::Error> {
        let id = match record.id {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => return Err(MalformedRecord::MissingField { field: "id" }),
        };

        let lat = record
            .lat
            .filter(|v| v.is_finite())
            .ok_or(MalformedRecord::MissingField { field: "lat" })?;
        let lon = record
            .lng
            .filter(|v| v.is_finite())
            .ok_or(MalformedRecord::MissingField { field: "lng" })?;

        #[allow(clippy::cast_possible_truncation)]
        let severity = record
            .severity
            .filter(|v| v.is_finite())
            .map(|v| v.round() as i64);

        Ok(Self {
            id,
            lat,
            lon,
            hazard_type: record
                .hazard_type
                .filter(|t| !t.is_empty())
                .or(record.legacy_type),
            severity,
            source: record.source,
            status: record.status,
            created_at: record.created_at,
            images: record.images.unwrap_or_default(),
            description: record.description,
            location: record.location,
            location_context: record.location_context,
            projected_repair_cost: record.projected_repair_cost,
            projected_worsening: record.projected_worsening,
            future_worsening_description: record.future_worsening_description,
        })
    }
}

/// A store row that cannot be rendered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedRecord {
    /// A required field is absent or not a finite number.
    #[error("missing or invalid field `{field}`")]
    MissingField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The row is not an object of the expected shape.
    #[error("unexpected record shape: {message}")]
    Shape {
        /// Deserializer message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_color_clamps_to_palette() {
        assert_eq!(severity_color(-3), "#2ecc71");
        assert_eq!(severity_color(0), "#2ecc71");
        assert_eq!(severity_color(2), "#f1c40f");
        assert_eq!(severity_color(5), "#c0392b");
        assert_eq!(severity_color(10), "#c0392b");
    }

    #[test]
    fn parses_store_row() {
        let row = serde_json::json!({
            "id": "6f1c2c0e-1111-4444-8888-000000000001",
            "lat": 40.35,
            "lng": -74.66,
            "hazard_type": "pothole",
            "severity": 4,
            "source": "public",
            "status": "open",
            "created_at": "2025-03-01T12:30:00+00:00",
            "images": ["https://img.example/1.jpg"],
            "projected_repair_cost": 350
        });
        let hazard = Hazard::from_json(row).unwrap();
        assert_eq!(hazard.hazard_type.as_deref(), Some("pothole"));
        assert_eq!(hazard.severity, Some(4));
        assert_eq!(hazard.images.len(), 1);
        assert_eq!(
            hazard.projected_repair_cost,
            Some(RepairCost::Amount(350.0))
        );
        assert_eq!(hazard.coordinate(), Coordinate::new(40.35, -74.66));
    }

    #[test]
    fn legacy_type_field_is_used_as_fallback() {
        let row = serde_json::json!({"id": 7, "lat": 1.0, "lng": 2.0, "type": "crack"});
        let hazard = Hazard::from_json(row).unwrap();
        assert_eq!(hazard.id, "7");
        assert_eq!(hazard.hazard_type.as_deref(), Some("crack"));

        let row = serde_json::json!({
            "id": 8, "lat": 1.0, "lng": 2.0, "hazard_type": "", "type": "debris"
        });
        let hazard = Hazard::from_json(row).unwrap();
        assert_eq!(hazard.hazard_type.as_deref(), Some("debris"));
    }

    #[test]
    fn rejects_rows_without_position() {
        let row = serde_json::json!({"id": "a", "lat": 1.0});
        assert_eq!(
            Hazard::from_json(row),
            Err(MalformedRecord::MissingField { field: "lng" })
        );
    }

    #[test]
    fn rejects_non_object_rows() {
        assert!(matches!(
            Hazard::from_json(serde_json::json!("nope")),
            Err(MalformedRecord::Shape { .. })
        ));
    }

    #[test]
    fn bounding_box_from_corners_is_order_independent() {
        let a = Coordinate::new(40.40, -74.60);
        let b = Coordinate::new(40.30, -74.70);
        let bbox = BoundingBox::from_corners(a, b);
        assert_eq!(bbox, BoundingBox::new(-74.70, 40.30, -74.60, 40.40));
        assert_eq!(bbox.south_west(), Coordinate::new(40.30, -74.70));
        assert!(bbox.contains(Coordinate::new(40.35, -74.65)));
        assert!(!bbox.contains(Coordinate::new(40.45, -74.65)));
    }

    #[test]
    fn repair_cost_text_roundtrips_display() {
        let cost: RepairCost = serde_json::from_value(serde_json::json!("$200-$400")).unwrap();
        assert_eq!(cost.to_string(), "$200-$400");
        assert_eq!(RepairCost::Amount(1234.4).to_string(), "$1234");
    }
}
