//! Overpass API client for road ways.
//!
//! Issues one `way["highway"]` query per viewport, recursing down to the
//! member nodes, and resolves each way's node ids to coordinates. Ways
//! whose nodes cannot be resolved down to at least two points are dropped.
//!
//! See <https://wiki.openstreetmap.org/wiki/Overpass_API/Overpass_QL>

use std::collections::BTreeMap;

use async_trait::async_trait;
use hazard_map_geometry::{RoadNetwork, RoadSegmentChain};
use hazard_map_hazard_models::{BoundingBox, Coordinate};

use crate::{RoadNetworkError, RoadNetworkSource};

/// Public Overpass interpreter endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Tag selector matching every tagged road.
pub const DEFAULT_WAY_SELECTOR: &str = r#"["highway"]"#;

/// Server-side query timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u32 = 25;

/// Fetches road networks from an Overpass interpreter.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    client: reqwest::Client,
    endpoint: String,
    way_selector: String,
    timeout_secs: u32,
}

impl OverpassClient {
    /// Creates a client against `endpoint` with the default road selector.
    #[must_use]
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            way_selector: DEFAULT_WAY_SELECTOR.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Replaces the tag selector (e.g. `["highway"~"primary|secondary"]`).
    #[must_use]
    pub fn with_way_selector(mut self, selector: impl Into<String>) -> Self {
        self.way_selector = selector.into();
        self
    }

    /// Replaces the server-side query timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, timeout_secs: u32) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Builds the Overpass QL query for `bounds`.
    ///
    /// Overpass expects `(south, west, north, east)` ordering.
    #[must_use]
    pub fn build_query(&self, bounds: &BoundingBox) -> String {
        format!(
            "[out:json][timeout:{}];way{}({},{},{},{});(._;>;);out body;",
            self.timeout_secs,
            self.way_selector,
            bounds.south,
            bounds.west,
            bounds.north,
            bounds.east,
        )
    }
}

#[async_trait]
impl RoadNetworkSource for OverpassClient {
    async fn fetch(&self, bounds: BoundingBox) -> Result<RoadNetwork, RoadNetworkError> {
        let query = self.build_query(&bounds);
        log::debug!("Overpass query: {query}");

        let resp = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query.as_str())])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RoadNetworkError::Status {
                status: resp.status().as_u16(),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Parses an Overpass JSON response into road chains.
///
/// Nodes missing a finite `lat`/`lon` are ignored, as are way references to
/// nodes that were not returned. Ways carrying an inline `geometry` array
/// (`out geom` responses) use it directly.
///
/// # Errors
///
/// Returns [`RoadNetworkError::Parse`] if the response has no `elements`
/// array.
pub fn parse_response(body: &serde_json::Value) -> Result<RoadNetwork, RoadNetworkError> {
    let elements = body["elements"]
        .as_array()
        .ok_or_else(|| RoadNetworkError::Parse {
            message: "Overpass response has no elements array".to_string(),
        })?;

    let mut nodes: BTreeMap<i64, Coordinate> = BTreeMap::new();
    for el in elements.iter().filter(|el| el["type"] == "node") {
        let (Some(id), Some(coord)) = (el["id"].as_i64(), parse_coordinate(el)) else {
            continue;
        };
        nodes.insert(id, coord);
    }

    let mut chains = Vec::new();
    let mut dropped = 0usize;

    for el in elements.iter().filter(|el| el["type"] == "way") {
        let points: Vec<Coordinate> = if let Some(geometry) = el["geometry"].as_array() {
            geometry.iter().filter_map(parse_coordinate).collect()
        } else {
            el["nodes"]
                .as_array()
                .map(|refs| {
                    refs.iter()
                        .filter_map(serde_json::Value::as_i64)
                        .filter_map(|id| nodes.get(&id).copied())
                        .collect()
                })
                .unwrap_or_default()
        };

        match RoadSegmentChain::new(points) {
            Some(chain) => chains.push(chain),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        log::debug!("Dropped {dropped} ways with fewer than 2 resolvable nodes");
    }

    Ok(RoadNetwork::new(chains))
}

fn parse_coordinate(value: &serde_json::Value) -> Option<Coordinate> {
    let coord = Coordinate::new(value["lat"].as_f64()?, value["lon"].as_f64()?);
    coord.is_finite().then_some(coord)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_south_west_north_east_query() {
        let client = OverpassClient::new(reqwest::Client::new(), DEFAULT_ENDPOINT);
        let q = client.build_query(&BoundingBox::new(-74.7, 40.3, -74.6, 40.4));
        assert_eq!(
            q,
            r#"[out:json][timeout:25];way["highway"](40.3,-74.7,40.4,-74.6);(._;>;);out body;"#
        );
    }

    #[test]
    fn resolves_ways_to_chains() {
        let body = serde_json::json!({
            "elements": [
                {"type": "way", "id": 10, "nodes": [1, 2, 3], "tags": {"highway": "residential"}},
                {"type": "node", "id": 1, "lat": 40.0, "lon": -74.0},
                {"type": "node", "id": 2, "lat": 40.1, "lon": -74.0},
                {"type": "node", "id": 3, "lat": 40.1, "lon": -74.1}
            ]
        });
        let network = parse_response(&body).unwrap();
        assert_eq!(network.len(), 1);
        assert_eq!(
            network.chains()[0].points(),
            &[
                Coordinate::new(40.0, -74.0),
                Coordinate::new(40.1, -74.0),
                Coordinate::new(40.1, -74.1),
            ]
        );
    }

    #[test]
    fn drops_unresolvable_nodes_and_short_ways() {
        let body = serde_json::json!({
            "elements": [
                {"type": "node", "id": 1, "lat": 40.0, "lon": -74.0},
                {"type": "node", "id": 2, "lat": 40.1, "lon": -74.0},
                {"type": "node", "id": 4},
                {"type": "way", "id": 10, "nodes": [1, 99, 2]},
                {"type": "way", "id": 11, "nodes": [1, 4]},
                {"type": "way", "id": 12, "nodes": [98, 99]}
            ]
        });
        let network = parse_response(&body).unwrap();
        assert_eq!(network.len(), 1);
        assert_eq!(network.chains()[0].points().len(), 2);
    }

    #[test]
    fn uses_inline_geometry() {
        let body = serde_json::json!({
            "elements": [
                {"type": "way", "id": 10, "geometry": [
                    {"lat": 40.0, "lon": -74.0},
                    {"lat": 40.2, "lon": -74.2}
                ]}
            ]
        });
        let network = parse_response(&body).unwrap();
        assert_eq!(network.segment_count(), 1);
    }

    #[test]
    fn missing_elements_is_a_parse_error() {
        let body = serde_json::json!({"remark": "runtime error"});
        assert!(matches!(
            parse_response(&body),
            Err(RoadNetworkError::Parse { .. })
        ));
    }
}
