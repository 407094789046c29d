//! Closed selection rings.
//!
//! Internally every point is a `(lat, lon)` [`Coordinate`]. At the
//! boundary (survey requests, `GeoJSON`) rings are emitted as
//! `[lon, lat]` pairs, which is the order those consumers expect.

use geo::{Area, BoundingRect, Coord, LineString, Polygon};
use hazard_map_hazard_models::{BoundingBox, Coordinate};
use serde::{Deserialize, Serialize};

use crate::{MIN_POLYGON_VERTICES, SelectionError};

/// Rings enclosing less than this many square degrees are degenerate.
const MIN_AREA_DEG2: f64 = 1e-12;

/// A closed ring: first point equals last, at least four points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<[f64; 2]>", into = "Vec<[f64; 2]>")]
pub struct SelectionPolygon {
    ring: Vec<Coordinate>,
}

impl SelectionPolygon {
    /// The five-point ring `[sw, se, ne, nw, sw]` of a box.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::Degenerate`] if the box has no area.
    pub fn from_box(bounds: &BoundingBox) -> Result<Self, SelectionError> {
        let sw = bounds.south_west();
        Self::closed(vec![
            sw,
            bounds.south_east(),
            bounds.north_east(),
            bounds.north_west(),
            sw,
        ])
    }

    /// Closes `vertices` by repeating the first one.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::NotEnoughVertices`] for fewer than three
    /// vertices and [`SelectionError::Degenerate`] if they enclose no area.
    pub fn from_vertices(mut vertices: Vec<Coordinate>) -> Result<Self, SelectionError> {
        if vertices.len() < MIN_POLYGON_VERTICES {
            return Err(SelectionError::NotEnoughVertices {
                count: vertices.len(),
            });
        }
        vertices.push(vertices[0]);
        Self::closed(vertices)
    }

    /// Accepts an already-closed `[lon, lat]` ring.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::InvalidRing`] if the ring is open, too
    /// short, or holds non-finite values, and
    /// [`SelectionError::Degenerate`] if it encloses no area.
    pub fn from_lon_lat_ring(ring: &[[f64; 2]]) -> Result<Self, SelectionError> {
        let points: Vec<Coordinate> = ring
            .iter()
            .map(|&[lon, lat]| Coordinate::new(lat, lon))
            .collect();

        if points.len() < MIN_POLYGON_VERTICES + 1 {
            return Err(SelectionError::InvalidRing {
                message: format!("expected at least 4 points, got {}", points.len()),
            });
        }
        if !points.iter().all(Coordinate::is_finite) {
            return Err(SelectionError::InvalidRing {
                message: "non-finite coordinate".to_string(),
            });
        }
        if points.first() != points.last() {
            return Err(SelectionError::InvalidRing {
                message: "first and last points differ".to_string(),
            });
        }

        Self::closed(points)
    }

    fn closed(ring: Vec<Coordinate>) -> Result<Self, SelectionError> {
        let polygon = Self { ring };
        if polygon.to_polygon().unsigned_area() > MIN_AREA_DEG2 {
            Ok(polygon)
        } else {
            Err(SelectionError::Degenerate)
        }
    }

    /// Ring points in `(lat, lon)` form, closing point included.
    #[must_use]
    pub fn points(&self) -> &[Coordinate] {
        &self.ring
    }

    /// Ring points as `[lon, lat]` pairs, closing point included.
    #[must_use]
    pub fn ring(&self) -> Vec<[f64; 2]> {
        self.ring.iter().map(Coordinate::lon_lat).collect()
    }

    /// The ring as a `geo` polygon with `x = lon`, `y = lat`.
    #[must_use]
    pub fn to_polygon(&self) -> Polygon<f64> {
        let exterior: LineString<f64> = self
            .ring
            .iter()
            .map(|c| Coord { x: c.lon, y: c.lat })
            .collect();
        Polygon::new(exterior, Vec::new())
    }

    /// Axis-aligned envelope of the ring.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        self.to_polygon().bounding_rect().map_or_else(
            || BoundingBox::around(self.ring[0], 0.0),
            |rect| BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y),
        )
    }

    /// `GeoJSON` `Polygon` geometry with a single exterior ring.
    #[must_use]
    pub fn to_geojson(&self) -> geojson::Geometry {
        let exterior = self.ring().into_iter().map(|p| p.to_vec()).collect();
        geojson::Geometry::new(geojson::Value::Polygon(vec![exterior]))
    }
}

impl TryFrom<Vec<[f64; 2]>> for SelectionPolygon {
    type Error = SelectionError;

    fn try_from(ring: Vec<[f64; 2]>) -> Result<Self, Self::Error> {
        Self::from_lon_lat_ring(&ring)
    }
}

impl From<SelectionPolygon> for Vec<[f64; 2]> {
    fn from(polygon: SelectionPolygon) -> Self {
        polygon.ring()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_ring_is_sw_se_ne_nw_sw() {
        let bbox = BoundingBox::new(-74.70, 40.30, -74.60, 40.40);
        let polygon = SelectionPolygon::from_box(&bbox).unwrap();
        assert_eq!(
            polygon.ring(),
            vec![
                [-74.70, 40.30],
                [-74.60, 40.30],
                [-74.60, 40.40],
                [-74.70, 40.40],
                [-74.70, 40.30],
            ]
        );
        assert_eq!(polygon.bounding_box(), bbox);
    }

    #[test]
    fn zero_area_box_is_degenerate() {
        let bbox = BoundingBox::new(-74.70, 40.30, -74.70, 40.40);
        assert_eq!(
            SelectionPolygon::from_box(&bbox),
            Err(SelectionError::Degenerate)
        );
    }

    #[test]
    fn vertices_are_closed() {
        let polygon = SelectionPolygon::from_vertices(vec![
            Coordinate::new(40.30, -74.70),
            Coordinate::new(40.35, -74.60),
            Coordinate::new(40.40, -74.68),
        ])
        .unwrap();
        let ring = polygon.ring();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());
        assert_eq!(
            polygon.bounding_box(),
            BoundingBox::new(-74.70, 40.30, -74.60, 40.40)
        );
    }

    #[test]
    fn two_vertices_are_rejected() {
        let err = SelectionPolygon::from_vertices(vec![
            Coordinate::new(40.30, -74.70),
            Coordinate::new(40.35, -74.60),
        ])
        .unwrap_err();
        assert_eq!(err, SelectionError::NotEnoughVertices { count: 2 });
        assert_eq!(err.to_string(), "Add at least 3 points.");
    }

    #[test]
    fn collinear_vertices_are_degenerate() {
        let err = SelectionPolygon::from_vertices(vec![
            Coordinate::new(40.0, -74.0),
            Coordinate::new(40.5, -73.5),
            Coordinate::new(41.0, -73.0),
        ])
        .unwrap_err();
        assert_eq!(err, SelectionError::Degenerate);
    }

    #[test]
    fn open_rings_are_rejected() {
        let ring = [[-74.7, 40.3], [-74.6, 40.3], [-74.6, 40.4], [-74.7, 40.4]];
        assert!(matches!(
            SelectionPolygon::from_lon_lat_ring(&ring),
            Err(SelectionError::InvalidRing { .. })
        ));
    }

    #[test]
    fn serializes_as_lon_lat_ring_and_geojson() {
        let polygon =
            SelectionPolygon::from_box(&BoundingBox::new(-74.70, 40.30, -74.60, 40.40)).unwrap();

        let json = serde_json::to_value(&polygon).unwrap();
        assert_eq!(json[1], serde_json::json!([-74.60, 40.30]));
        let back: SelectionPolygon = serde_json::from_value(json).unwrap();
        assert_eq!(back, polygon);

        let geometry = serde_json::to_value(polygon.to_geojson()).unwrap();
        assert_eq!(geometry["type"], "Polygon");
        assert_eq!(geometry["coordinates"][0][2], serde_json::json!([-74.60, 40.40]));
    }
}
