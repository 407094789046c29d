#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Point-to-road snapping for hazard highlight segments.
//!
//! A hazard is drawn as a short stretch of the nearest road rather than a
//! bare dot. [`snap_to_network`] finds the closest point on any segment of
//! a [`RoadNetwork`] and returns a [`HighlightSegment`] spanning a small
//! parameter window around it.
//!
//! Distances are computed in a local planar frame: longitude is scaled by
//! `cos(latitude)` of the query point and latitude is used as-is. This is
//! only accurate at city scale, which is all the dashboard ever shows.
//!
//! ## Two-stage lookup
//!
//! 1. **R-tree filter**: segments are indexed by their raw `[lon, lat]`
//!    envelopes. The raw-nearest segment bounds how far away (in raw
//!    degrees) the planar-nearest one can be.
//! 2. **Planar re-rank**: every segment inside that radius is measured in
//!    the query point's planar frame; ties keep the first segment in
//!    chain/point order.

use geo::{Coord, Line};
use hazard_map_hazard_models::Coordinate;
use rstar::{AABB, PointDistance, RTree, RTreeObject};
use serde::{Deserialize, Serialize};

/// Half-width of the highlight window in segment-parameter units.
pub const HIGHLIGHT_HALF_WINDOW: f64 = 0.1;

/// Relative slack on the candidate radius for float rounding.
const RADIUS_SLACK: f64 = 1e-9;

/// One contiguous road polyline ("way").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadSegmentChain {
    points: Vec<Coordinate>,
}

impl RoadSegmentChain {
    /// Builds a chain from ordered points.
    ///
    /// Returns `None` when fewer than two points are given, since such a
    /// chain has no segments.
    #[must_use]
    pub fn new(points: Vec<Coordinate>) -> Option<Self> {
        (points.len() >= 2).then_some(Self { points })
    }

    /// Ordered points of the chain.
    #[must_use]
    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    /// Iterates consecutive `(start, end)` point pairs.
    pub fn segments(&self) -> impl Iterator<Item = (Coordinate, Coordinate)> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }
}

/// A road segment in the spatial index, in raw `[lon, lat]` degrees.
#[derive(Debug, Clone)]
struct SegmentNode {
    chain: usize,
    segment: usize,
    line: Line<f64>,
}

impl SegmentNode {
    fn new(chain: usize, segment: usize, start: Coordinate, end: Coordinate) -> Self {
        Self {
            chain,
            segment,
            line: Line::new(to_coord(start), to_coord(end)),
        }
    }
}

impl RTreeObject for SegmentNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.line.start.x, self.line.start.y],
            [self.line.end.x, self.line.end.y],
        )
    }
}

impl PointDistance for SegmentNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        project_onto_line(Coord { x: point[0], y: point[1] }, self.line).1
    }
}

/// The road chains fetched for one viewport, with a segment index.
#[derive(Debug, Clone, Default)]
pub struct RoadNetwork {
    chains: Vec<RoadSegmentChain>,
    index: RTree<SegmentNode>,
}

impl PartialEq for RoadNetwork {
    fn eq(&self, other: &Self) -> bool {
        self.chains == other.chains
    }
}

impl RoadNetwork {
    /// Wraps a set of chains and indexes their segments.
    #[must_use]
    pub fn new(chains: Vec<RoadSegmentChain>) -> Self {
        let nodes = chains
            .iter()
            .enumerate()
            .flat_map(|(chain_idx, chain)| {
                chain
                    .segments()
                    .enumerate()
                    .map(move |(segment_idx, (start, end))| {
                        SegmentNode::new(chain_idx, segment_idx, start, end)
                    })
            })
            .collect();

        Self {
            chains,
            index: RTree::bulk_load(nodes),
        }
    }

    /// An empty network.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The chains in fetch order.
    #[must_use]
    pub fn chains(&self) -> &[RoadSegmentChain] {
        &self.chains
    }

    /// Whether the network has no chains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Number of chains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Total segment count over all chains.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.index.size()
    }
}

/// A two-point stretch of road to draw in place of a point marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightSegment {
    /// First endpoint.
    pub start: Coordinate,
    /// Second endpoint.
    pub end: Coordinate,
}

/// Where a point lands on the network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentMatch {
    /// Index of the chain in the network.
    pub chain: usize,
    /// Index of the segment within the chain (`points[segment]` to
    /// `points[segment + 1]`).
    pub segment: usize,
    /// Segment start in geographic coordinates.
    pub start: Coordinate,
    /// Segment end in geographic coordinates.
    pub end: Coordinate,
    /// Clamped projection parameter in `[0, 1]`.
    pub t: f64,
    /// Squared planar distance from the query point to the projection.
    pub distance_sq: f64,
}

impl SegmentMatch {
    /// The projected point on the segment.
    #[must_use]
    pub fn snapped_point(&self) -> Coordinate {
        lerp(self.start, self.end, self.t)
    }

    fn precedes(&self, other: &Self) -> bool {
        self.distance_sq < other.distance_sq
            || (self.distance_sq <= other.distance_sq
                && (self.chain, self.segment) < (other.chain, other.segment))
    }
}

const fn to_coord(c: Coordinate) -> Coord<f64> {
    Coord { x: c.lon, y: c.lat }
}

const fn to_coordinate(c: Coord<f64>) -> Coordinate {
    Coordinate::new(c.y, c.x)
}

/// Local planar frame centered on the query latitude.
#[derive(Debug, Clone, Copy)]
struct PlanarFrame {
    lon_scale: f64,
}

impl PlanarFrame {
    fn at(origin: Coordinate) -> Self {
        Self {
            lon_scale: origin.lat.to_radians().cos(),
        }
    }

    fn project(self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: c.x * self.lon_scale,
            y: c.y,
        }
    }

    fn project_line(self, line: Line<f64>) -> Line<f64> {
        Line::new(self.project(line.start), self.project(line.end))
    }

    /// Raw squared radius that must contain the planar-nearest segment when
    /// some segment lies at squared planar distance `planar_sq`.
    ///
    /// Scaling longitude by `lon_scale <= 1` shrinks distances by at most
    /// that factor, so `planar >= lon_scale * raw`.
    fn raw_radius_sq(self, planar_sq: f64) -> f64 {
        let scale_sq = self.lon_scale * self.lon_scale;
        if scale_sq > 0.0 {
            (planar_sq / scale_sq).mul_add(1.0 + RADIUS_SLACK, f64::EPSILON)
        } else {
            f64::INFINITY
        }
    }
}

/// Projects `p` onto the closed segment `line`, returning `(t, distance_sq)`.
fn project_onto_line(p: Coord<f64>, line: Line<f64>) -> (f64, f64) {
    let d = line.delta();
    let len_sq = d.x.mul_add(d.x, d.y * d.y);

    let t = if len_sq > 0.0 {
        let ap = p - line.start;
        (ap.x.mul_add(d.x, ap.y * d.y) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let offset = p - (line.start + d * t);
    (t, offset.x.mul_add(offset.x, offset.y * offset.y))
}

fn lerp(a: Coordinate, b: Coordinate, t: f64) -> Coordinate {
    Coordinate::new(t.mul_add(b.lat - a.lat, a.lat), t.mul_add(b.lon - a.lon, a.lon))
}

/// Finds the segment of `network` closest to `point`.
///
/// Ties keep the first segment in chain/point order. Returns `None` when the
/// network has no segments.
#[must_use]
pub fn nearest_segment(point: Coordinate, network: &RoadNetwork) -> Option<SegmentMatch> {
    let frame = PlanarFrame::at(point);
    let raw = to_coord(point);
    let p = frame.project(raw);

    let measure = |node: &SegmentNode| {
        let (t, distance_sq) = project_onto_line(p, frame.project_line(node.line));
        SegmentMatch {
            chain: node.chain,
            segment: node.segment,
            start: to_coordinate(node.line.start),
            end: to_coordinate(node.line.end),
            t,
            distance_sq,
        }
    };

    let seed = measure(network.index.nearest_neighbor(&[raw.x, raw.y])?);
    let radius_sq = frame.raw_radius_sq(seed.distance_sq);

    let best = network
        .index
        .locate_within_distance([raw.x, raw.y], radius_sq)
        .map(measure)
        .fold(seed, |best, candidate| {
            if candidate.precedes(&best) {
                candidate
            } else {
                best
            }
        });

    Some(best)
}

/// Snaps `point` onto the nearest road and returns the highlight segment
/// around the snapped position.
///
/// The window is `[t - 0.1, t + 0.1]` clamped to `[0, 1]`, interpolated
/// between the original geographic endpoints. `None` means there is no
/// road data and the caller should draw a point marker instead.
#[must_use]
pub fn snap_to_network(point: Coordinate, network: &RoadNetwork) -> Option<HighlightSegment> {
    let m = nearest_segment(point, network)?;

    let t0 = (m.t - HIGHLIGHT_HALF_WINDOW).max(0.0);
    let t1 = (m.t + HIGHLIGHT_HALF_WINDOW).min(1.0);

    Some(HighlightSegment {
        start: lerp(m.start, m.end, t0),
        end: lerp(m.start, m.end, t1),
    })
}
