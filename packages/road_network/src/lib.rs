#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Road-network fetching and caching for hazard snapping.
//!
//! [`overpass`] turns a viewport into an Overpass query and parses the
//! returned node/way graph into [`RoadNetwork`] chains. [`cache`] keeps the
//! fetched networks keyed by a quantized viewport so that re-renders and
//! small pans reuse data instead of hitting Overpass again.
//!
//! Failures never propagate to the map: a failed or empty fetch yields an
//! empty network and every hazard in that pass falls back to a point
//! marker.

pub mod cache;
pub mod overpass;

use async_trait::async_trait;
use hazard_map_geometry::RoadNetwork;
use hazard_map_hazard_models::BoundingBox;
use thiserror::Error;

pub use cache::{CacheSettings, RoadNetworkCache, ViewportKey};
pub use overpass::OverpassClient;

/// Anything that can produce the road network for a viewport.
#[async_trait]
pub trait RoadNetworkSource: Send + Sync {
    /// Fetches all road chains intersecting `bounds`.
    ///
    /// # Errors
    ///
    /// Returns [`RoadNetworkError`] if the request or response parsing
    /// fails.
    async fn fetch(&self, bounds: BoundingBox) -> Result<RoadNetwork, RoadNetworkError>;
}

/// Errors from road-network operations.
#[derive(Debug, Error)]
pub enum RoadNetworkError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Overpass returned HTTP {status}")]
    Status {
        /// Response status code.
        status: u16,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// The response contained no usable road chains.
    #[error("No road data for viewport")]
    Empty,
}
