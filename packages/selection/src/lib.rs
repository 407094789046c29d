#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Region selection for survey requests.
//!
//! The operator first picks an area type, then draws either a box (two
//! clicks with a live rectangle in between) or a freehand polygon (one
//! click per vertex, then "finish"). [`RegionSelector`] models this as a
//! tagged state machine; each state declares exactly which pointer
//! handlers it needs, and every transition reports which handlers to
//! install and remove.
//!
//! The result is a [`SelectionPolygon`]: a closed ring that is only ever
//! produced once it has enough points.

pub mod polygon;
pub mod selector;

use thiserror::Error;

pub use polygon::SelectionPolygon;
pub use selector::{
    AreaMode, HandlerChange, PointerHandler, Preview, RegionSelector, SelectorEvent,
    SelectorState,
};

/// Minimum distinct vertices of a drawn polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// A selection that cannot be turned into a polygon.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// A polygon was finished with too few vertices.
    #[error("Add at least 3 points.")]
    NotEnoughVertices {
        /// Vertices drawn so far.
        count: usize,
    },

    /// The drawn shape encloses no area.
    #[error("Selection has no area. Draw a larger region.")]
    Degenerate,

    /// A ring was not closed or had too few points.
    #[error("Invalid ring: {message}")]
    InvalidRing {
        /// What was wrong with the ring.
        message: String,
    },
}
