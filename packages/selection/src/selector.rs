//! The region selection state machine.
//!
//! ```text
//! Idle -> AwaitingAreaType -> DrawingBox | DrawingPolygon -> SelectionReady
//! ```
//!
//! `Start` and `Cancel` are accepted everywhere. `Clear` drops whatever
//! has been drawn: in the drawing states it restarts the current drawing,
//! otherwise it returns to `Idle`. Pointer events are only delivered to
//! the states that list the matching [`PointerHandler`]; anything else is
//! ignored.

use hazard_map_hazard_models::{BoundingBox, Coordinate};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::{SelectionError, SelectionPolygon};

/// Instruction shown while drawing a box.
pub const BOX_INSTRUCTIONS: &str = "Click to start box, move mouse, click to finish.";

/// Instruction shown while drawing a polygon.
pub const POLYGON_INSTRUCTIONS: &str = "Click to add points. Click \"Finish Polygon\" when done.";

/// Shape the operator draws.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AreaMode {
    /// Axis-aligned rectangle from two clicks.
    Box,
    /// Freehand polygon, one click per vertex.
    Polygon,
}

/// Pointer input a state listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PointerHandler {
    /// Map clicks.
    Click,
    /// Pointer motion over the map.
    PointerMove,
    /// The "finish polygon" action.
    Finish,
}

/// Current selector state.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorState {
    /// Nothing selected, no flow running.
    Idle,
    /// Waiting for the operator to pick [`AreaMode`].
    AwaitingAreaType,
    /// Drawing a box.
    DrawingBox {
        /// Corner latched by the first click.
        anchor: Option<Coordinate>,
        /// Last pointer position after the anchor was set.
        cursor: Option<Coordinate>,
    },
    /// Drawing a polygon.
    DrawingPolygon {
        /// Vertices in click order.
        vertices: Vec<Coordinate>,
    },
    /// A closed polygon is available for submission.
    SelectionReady {
        /// How the polygon was drawn.
        mode: AreaMode,
        /// The finished ring.
        polygon: SelectionPolygon,
    },
}

impl SelectorState {
    /// Pointer handlers this state needs installed.
    #[must_use]
    pub const fn active_handlers(&self) -> &'static [PointerHandler] {
        match self {
            Self::Idle | Self::AwaitingAreaType | Self::SelectionReady { .. } => &[],
            Self::DrawingBox { .. } => &[PointerHandler::Click, PointerHandler::PointerMove],
            Self::DrawingPolygon { .. } => &[PointerHandler::Click, PointerHandler::Finish],
        }
    }

    const fn drawing(mode: AreaMode) -> Self {
        match mode {
            AreaMode::Box => Self::DrawingBox {
                anchor: None,
                cursor: None,
            },
            AreaMode::Polygon => Self::DrawingPolygon {
                vertices: Vec::new(),
            },
        }
    }
}

/// A UI event fed to the selector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectorEvent {
    /// Begin a new selection flow.
    Start,
    /// Pick the shape to draw.
    ChooseMode(AreaMode),
    /// Map click.
    Click(Coordinate),
    /// Pointer moved over the map.
    PointerMove(Coordinate),
    /// Finish the polygon being drawn.
    Finish,
    /// Drop drawn geometry.
    Clear,
    /// Abandon the flow.
    Cancel,
}

impl SelectorEvent {
    /// Handler required to receive this event, if any.
    const fn handler(self) -> Option<PointerHandler> {
        match self {
            Self::Click(_) => Some(PointerHandler::Click),
            Self::PointerMove(_) => Some(PointerHandler::PointerMove),
            Self::Finish => Some(PointerHandler::Finish),
            Self::Start | Self::ChooseMode(_) | Self::Clear | Self::Cancel => None,
        }
    }
}

/// Handlers to install and remove after a transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerChange {
    /// Handlers the new state needs that the old one did not have.
    pub install: Vec<PointerHandler>,
    /// Handlers the old state had that the new one does not need.
    pub remove: Vec<PointerHandler>,
}

impl HandlerChange {
    fn between(from: &[PointerHandler], to: &[PointerHandler]) -> Self {
        Self {
            install: to.iter().filter(|h| !from.contains(h)).copied().collect(),
            remove: from.iter().filter(|h| !to.contains(h)).copied().collect(),
        }
    }

    /// Whether nothing needs to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.install.is_empty() && self.remove.is_empty()
    }
}

/// Temporary geometry to draw while selecting.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    /// Live rectangle between the anchor and the pointer.
    Rectangle(BoundingBox),
    /// Open polyline through the vertices so far.
    Polyline(Vec<Coordinate>),
    /// The finished selection.
    Polygon(SelectionPolygon),
}

/// Drives box and polygon selection from UI events.
#[derive(Debug, Clone)]
pub struct RegionSelector {
    state: SelectorState,
}

impl Default for RegionSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionSelector {
    /// A selector in [`SelectorState::Idle`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SelectorState::Idle,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &SelectorState {
        &self.state
    }

    /// Pointer handlers the current state needs.
    #[must_use]
    pub const fn active_handlers(&self) -> &'static [PointerHandler] {
        self.state.active_handlers()
    }

    /// The finished polygon, only in [`SelectorState::SelectionReady`].
    #[must_use]
    pub const fn selection(&self) -> Option<&SelectionPolygon> {
        match &self.state {
            SelectorState::SelectionReady { polygon, .. } => Some(polygon),
            _ => None,
        }
    }

    /// Status line for the current state.
    #[must_use]
    pub const fn message(&self) -> Option<&'static str> {
        match &self.state {
            SelectorState::Idle | SelectorState::AwaitingAreaType => None,
            SelectorState::DrawingBox { .. } => Some(BOX_INSTRUCTIONS),
            SelectorState::DrawingPolygon { .. } => Some(POLYGON_INSTRUCTIONS),
            SelectorState::SelectionReady {
                mode: AreaMode::Box,
                ..
            } => Some("Box selected. Ready to start survey."),
            SelectorState::SelectionReady {
                mode: AreaMode::Polygon,
                ..
            } => Some("Polygon selected. Ready to start survey."),
        }
    }

    /// Geometry to draw for the current state.
    #[must_use]
    pub fn preview(&self) -> Option<Preview> {
        match &self.state {
            SelectorState::Idle | SelectorState::AwaitingAreaType => None,
            SelectorState::DrawingBox {
                anchor: Some(anchor),
                cursor: Some(cursor),
            } => Some(Preview::Rectangle(BoundingBox::from_corners(*anchor, *cursor))),
            SelectorState::DrawingBox { .. } => None,
            SelectorState::DrawingPolygon { vertices } if vertices.is_empty() => None,
            SelectorState::DrawingPolygon { vertices } => Some(Preview::Polyline(vertices.clone())),
            SelectorState::SelectionReady { polygon, .. } => Some(Preview::Polygon(polygon.clone())),
        }
    }

    /// Applies `event` and reports the handler changes it causes.
    ///
    /// Pointer events the current state does not listen to are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError`] when finishing a shape fails. The state
    /// is left unchanged so the operator can keep drawing.
    pub fn handle(&mut self, event: SelectorEvent) -> Result<HandlerChange, SelectionError> {
        if let Some(handler) = event.handler()
            && !self.active_handlers().contains(&handler)
        {
            log::trace!("Ignoring {event:?} in {:?}", self.state);
            return Ok(HandlerChange::default());
        }

        let before = self.active_handlers();
        let next = self.next_state(event)?;
        if let Some(next) = next {
            log::debug!("Selector {:?} -> {next:?} on {event:?}", self.state);
            self.state = next;
        }
        Ok(HandlerChange::between(before, self.active_handlers()))
    }

    /// Computes the successor state, or `None` to stay put.
    fn next_state(&mut self, event: SelectorEvent) -> Result<Option<SelectorState>, SelectionError> {
        let next = match (&mut self.state, event) {
            (_, SelectorEvent::Start) => Some(SelectorState::AwaitingAreaType),
            (_, SelectorEvent::Cancel) => Some(SelectorState::Idle),

            (SelectorState::AwaitingAreaType, SelectorEvent::ChooseMode(mode)) => {
                Some(SelectorState::drawing(mode))
            }

            (SelectorState::DrawingBox { anchor, cursor }, SelectorEvent::Click(at)) => {
                let latched = *anchor;
                match latched {
                    None => {
                        *anchor = Some(at);
                        *cursor = None;
                        None
                    }
                    Some(first) => {
                        let polygon =
                            SelectionPolygon::from_box(&BoundingBox::from_corners(first, at))?;
                        Some(SelectorState::SelectionReady {
                            mode: AreaMode::Box,
                            polygon,
                        })
                    }
                }
            }
            (SelectorState::DrawingBox { anchor, cursor }, SelectorEvent::PointerMove(at)) => {
                if anchor.is_some() {
                    *cursor = Some(at);
                }
                None
            }

            (SelectorState::DrawingPolygon { vertices }, SelectorEvent::Click(at)) => {
                vertices.push(at);
                None
            }
            (SelectorState::DrawingPolygon { vertices }, SelectorEvent::Finish) => {
                let polygon = SelectionPolygon::from_vertices(vertices.clone())?;
                Some(SelectorState::SelectionReady {
                    mode: AreaMode::Polygon,
                    polygon,
                })
            }

            (SelectorState::DrawingBox { .. }, SelectorEvent::Clear) => {
                Some(SelectorState::drawing(AreaMode::Box))
            }
            (SelectorState::DrawingPolygon { .. }, SelectorEvent::Clear) => {
                Some(SelectorState::drawing(AreaMode::Polygon))
            }
            (_, SelectorEvent::Clear) => Some(SelectorState::Idle),

            (state, event) => {
                log::trace!("Ignoring {event:?} in {state:?}");
                None
            }
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drawing(mode: AreaMode) -> RegionSelector {
        let mut selector = RegionSelector::new();
        selector.handle(SelectorEvent::Start).unwrap();
        selector.handle(SelectorEvent::ChooseMode(mode)).unwrap();
        selector
    }

    #[test]
    fn two_clicks_make_a_box_ring() {
        let mut selector = drawing(AreaMode::Box);
        selector
            .handle(SelectorEvent::Click(Coordinate::new(40.30, -74.70)))
            .unwrap();
        assert!(selector.selection().is_none());
        selector
            .handle(SelectorEvent::Click(Coordinate::new(40.40, -74.60)))
            .unwrap();

        let polygon = selector.selection().unwrap();
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
        assert_eq!(selector.message(), Some("Box selected. Ready to start survey."));
    }

    #[test]
    fn box_corners_may_be_clicked_in_any_order() {
        let mut selector = drawing(AreaMode::Box);
        selector
            .handle(SelectorEvent::Click(Coordinate::new(40.40, -74.60)))
            .unwrap();
        selector
            .handle(SelectorEvent::Click(Coordinate::new(40.30, -74.70)))
            .unwrap();
        assert_eq!(selector.selection().unwrap().ring()[0], [-74.70, 40.30]);
    }

    #[test]
    fn pointer_move_previews_rectangle_after_anchor() {
        let mut selector = drawing(AreaMode::Box);
        selector
            .handle(SelectorEvent::PointerMove(Coordinate::new(40.0, -74.0)))
            .unwrap();
        assert_eq!(selector.preview(), None);

        selector
            .handle(SelectorEvent::Click(Coordinate::new(40.30, -74.70)))
            .unwrap();
        selector
            .handle(SelectorEvent::PointerMove(Coordinate::new(40.35, -74.65)))
            .unwrap();
        assert_eq!(
            selector.preview(),
            Some(Preview::Rectangle(BoundingBox::new(
                -74.70, 40.30, -74.65, 40.35
            )))
        );
    }

    #[test]
    fn finishing_polygon_with_two_vertices_fails_and_keeps_drawing() {
        let mut selector = drawing(AreaMode::Polygon);
        selector
            .handle(SelectorEvent::Click(Coordinate::new(40.30, -74.70)))
            .unwrap();
        selector
            .handle(SelectorEvent::Click(Coordinate::new(40.35, -74.60)))
            .unwrap();

        let err = selector.handle(SelectorEvent::Finish).unwrap_err();
        assert_eq!(err.to_string(), "Add at least 3 points.");
        assert!(matches!(
            selector.state(),
            SelectorState::DrawingPolygon { vertices } if vertices.len() == 2
        ));

        selector
            .handle(SelectorEvent::Click(Coordinate::new(40.40, -74.68)))
            .unwrap();
        selector.handle(SelectorEvent::Finish).unwrap();

        let ring = selector.selection().unwrap().ring();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring[0], [-74.70, 40.30]);
        assert_eq!(ring[3], [-74.70, 40.30]);
        assert_eq!(
            selector.message(),
            Some("Polygon selected. Ready to start survey.")
        );
    }

    #[test]
    fn finish_without_clicks_fails() {
        let mut selector = drawing(AreaMode::Polygon);
        assert_eq!(
            selector.handle(SelectorEvent::Finish),
            Err(SelectionError::NotEnoughVertices { count: 0 })
        );
    }

    #[test]
    fn transitions_report_handler_changes() {
        let mut selector = RegionSelector::new();
        assert!(selector.active_handlers().is_empty());
        assert!(selector.handle(SelectorEvent::Start).unwrap().is_empty());

        let change = selector
            .handle(SelectorEvent::ChooseMode(AreaMode::Polygon))
            .unwrap();
        assert_eq!(
            change.install,
            vec![PointerHandler::Click, PointerHandler::Finish]
        );
        assert!(change.remove.is_empty());

        let change = selector.handle(SelectorEvent::Cancel).unwrap();
        assert_eq!(
            change.remove,
            vec![PointerHandler::Click, PointerHandler::Finish]
        );
        assert_eq!(selector.state(), &SelectorState::Idle);
    }

    #[test]
    fn pointer_events_are_ignored_outside_drawing_states() {
        let mut selector = RegionSelector::new();
        selector
            .handle(SelectorEvent::Click(Coordinate::new(40.0, -74.0)))
            .unwrap();
        selector.handle(SelectorEvent::Finish).unwrap();
        assert_eq!(selector.state(), &SelectorState::Idle);

        let mut selector = drawing(AreaMode::Box);
        selector.handle(SelectorEvent::Finish).unwrap();
        assert!(matches!(selector.state(), SelectorState::DrawingBox { .. }));
    }

    #[test]
    fn clear_restarts_drawing_or_returns_to_idle() {
        let mut selector = drawing(AreaMode::Polygon);
        selector
            .handle(SelectorEvent::Click(Coordinate::new(40.30, -74.70)))
            .unwrap();
        selector.handle(SelectorEvent::Clear).unwrap();
        assert_eq!(
            selector.state(),
            &SelectorState::DrawingPolygon {
                vertices: Vec::new()
            }
        );

        let mut selector = drawing(AreaMode::Box);
        selector
            .handle(SelectorEvent::Click(Coordinate::new(40.30, -74.70)))
            .unwrap();
        selector
            .handle(SelectorEvent::Click(Coordinate::new(40.40, -74.60)))
            .unwrap();
        selector.handle(SelectorEvent::Clear).unwrap();
        assert_eq!(selector.state(), &SelectorState::Idle);
        assert!(selector.selection().is_none());
    }

    #[test]
    fn start_from_ready_drops_selection() {
        let mut selector = drawing(AreaMode::Box);
        selector
            .handle(SelectorEvent::Click(Coordinate::new(40.30, -74.70)))
            .unwrap();
        selector
            .handle(SelectorEvent::Click(Coordinate::new(40.40, -74.60)))
            .unwrap();
        selector.handle(SelectorEvent::Start).unwrap();
        assert_eq!(selector.state(), &SelectorState::AwaitingAreaType);
        assert_eq!(selector.preview(), None);
    }
}
