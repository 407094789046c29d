//! Marker layer construction.
//!
//! Each hazard is drawn as a short highlight along its nearest road when
//! road data is available, otherwise as a circle marker at its position.

use hazard_map_geometry::{HighlightSegment, RoadNetwork, snap_to_network};
use hazard_map_hazard_models::{Coordinate, Hazard, severity_color};
use serde::Serialize;

/// Circle marker radius in pixels.
pub const MARKER_RADIUS: u8 = 6;

/// Stroke style shared by markers and highlights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathStyle {
    /// Stroke and fill color.
    pub color: &'static str,
    /// Stroke width in pixels.
    pub weight: u8,
    /// Stroke opacity.
    pub opacity: f64,
}

impl PathStyle {
    /// Style of a point marker for `severity`.
    #[must_use]
    pub fn marker(severity: i64) -> Self {
        Self {
            color: severity_color(severity),
            weight: 2,
            opacity: 0.9,
        }
    }

    /// Style of a road highlight for `severity`.
    #[must_use]
    pub fn highlight(severity: i64) -> Self {
        Self {
            color: severity_color(severity),
            weight: 6,
            opacity: 0.9,
        }
    }
}

/// One drawable item in the hazard layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderItem {
    /// Two-point stretch of road.
    Highlight {
        /// Hazard this item stands for.
        hazard_id: String,
        /// Segment to draw.
        segment: HighlightSegment,
        /// Stroke style.
        style: PathStyle,
    },
    /// Circle marker fallback.
    Point {
        /// Hazard this item stands for.
        hazard_id: String,
        /// Marker position.
        at: Coordinate,
        /// Marker radius in pixels.
        radius: u8,
        /// Stroke style.
        style: PathStyle,
    },
}

impl RenderItem {
    /// The hazard this item stands for.
    #[must_use]
    pub fn hazard_id(&self) -> &str {
        match self {
            Self::Highlight { hazard_id, .. } | Self::Point { hazard_id, .. } => hazard_id,
        }
    }

    /// Whether this is a road highlight.
    #[must_use]
    pub const fn is_highlight(&self) -> bool {
        matches!(self, Self::Highlight { .. })
    }
}

/// Builds the layer for `hazards` over `network`.
///
/// An empty network yields point markers for every hazard.
#[must_use]
pub fn build_layer(hazards: &[Hazard], network: &RoadNetwork) -> Vec<RenderItem> {
    hazards
        .iter()
        .map(|hazard| {
            let severity = hazard.display_severity();
            match snap_to_network(hazard.coordinate(), network) {
                Some(segment) => RenderItem::Highlight {
                    hazard_id: hazard.id.clone(),
                    segment,
                    style: PathStyle::highlight(severity),
                },
                None => RenderItem::Point {
                    hazard_id: hazard.id.clone(),
                    at: hazard.coordinate(),
                    radius: MARKER_RADIUS,
                    style: PathStyle::marker(severity),
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use hazard_map_geometry::RoadSegmentChain;

    use super::*;

    fn hazard(id: &str, lat: f64, lon: f64, severity: Option<i64>) -> Hazard {
        Hazard::from_json(serde_json::json!({
            "id": id,
            "lat": lat,
            "lng": lon,
            "severity": severity,
        }))
        .unwrap()
    }

    #[test]
    fn empty_network_falls_back_to_points() {
        let layer = build_layer(
            &[hazard("a", 40.0, -74.0, Some(4))],
            &RoadNetwork::empty(),
        );
        assert_eq!(
            layer,
            vec![RenderItem::Point {
                hazard_id: "a".to_string(),
                at: Coordinate::new(40.0, -74.0),
                radius: 6,
                style: PathStyle {
                    color: "#e74c3c",
                    weight: 2,
                    opacity: 0.9,
                },
            }]
        );
    }

    #[test]
    fn hazards_snap_to_roads_with_severity_color() {
        let road = RoadSegmentChain::new(vec![
            Coordinate::new(40.0, -74.0),
            Coordinate::new(40.0, -73.9),
        ])
        .unwrap();
        let network = RoadNetwork::new(vec![road]);

        let layer = build_layer(
            &[
                hazard("a", 40.001, -73.95, Some(9)),
                hazard("b", 40.002, -73.98, None),
            ],
            &network,
        );

        assert!(layer.iter().all(RenderItem::is_highlight));
        let RenderItem::Highlight { style, .. } = &layer[0] else {
            panic!("expected highlight");
        };
        assert_eq!(style.color, "#c0392b");
        assert_eq!(style.weight, 6);
        let RenderItem::Highlight { style, .. } = &layer[1] else {
            panic!("expected highlight");
        };
        assert_eq!(style.color, "#2ecc71");
        assert_eq!(layer[1].hazard_id(), "b");
    }
}
