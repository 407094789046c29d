//! Hazard detail view.
//!
//! Clicking a rendered item emits [`DetailEvent::Open`] with the hazard's
//! id. [`DetailViewController`] resolves it against the current hazard set
//! and holds the projected [`HazardDetail`] until it is closed.

use chrono::{DateTime, Utc};
use hazard_map_hazard_models::{Hazard, severity_color};
use serde::Serialize;

/// Event consumed by [`DetailViewController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailEvent {
    /// Show the hazard with this id.
    Open {
        /// Store identifier of the hazard.
        hazard_id: String,
    },
    /// Dismiss the open detail view.
    Close,
}

/// Everything the detail view shows for one hazard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HazardDetail {
    /// Store identifier.
    pub id: String,
    /// Hazard type label.
    pub hazard_type: Option<String>,
    /// Reported severity.
    pub severity: Option<i64>,
    /// Palette color for the severity badge.
    pub color: &'static str,
    /// Workflow status.
    pub status: Option<String>,
    /// Report origin.
    pub source: Option<String>,
    /// Street address.
    pub address: Option<String>,
    /// When the report was stored.
    pub created_at: Option<DateTime<Utc>>,
    /// Analysis description.
    pub description: Option<String>,
    /// Surroundings noted by the analysis model.
    pub location_context: Option<String>,
    /// Repair cost formatted for display.
    pub repair_cost: Option<String>,
    /// Projected worsening timeframe.
    pub projected_worsening: Option<String>,
    /// How the hazard is expected to worsen.
    pub future_worsening_description: Option<String>,
    /// Primary photo.
    pub image: Option<String>,
    /// External map link for the hazard position.
    pub map_link: String,
}

impl From<&Hazard> for HazardDetail {
    fn from(hazard: &Hazard) -> Self {
        Self {
            id: hazard.id.clone(),
            hazard_type: hazard.hazard_type.clone(),
            severity: hazard.severity,
            color: severity_color(hazard.display_severity()),
            status: hazard.status.clone(),
            source: hazard.source.clone(),
            address: hazard.location.clone(),
            created_at: hazard.created_at,
            description: hazard.description.clone(),
            location_context: hazard.location_context.clone(),
            repair_cost: hazard
                .projected_repair_cost
                .as_ref()
                .map(ToString::to_string),
            projected_worsening: hazard.projected_worsening.clone(),
            future_worsening_description: hazard.future_worsening_description.clone(),
            image: hazard.images.first().cloned(),
            map_link: format!(
                "https://www.google.com/maps?q={},{}",
                hazard.lat, hazard.lon
            ),
        }
    }
}

/// Owns the open detail view, if any.
#[derive(Debug, Clone, Default)]
pub struct DetailViewController {
    open: Option<HazardDetail>,
}

impl DetailViewController {
    /// The detail currently shown.
    #[must_use]
    pub const fn current(&self) -> Option<&HazardDetail> {
        self.open.as_ref()
    }

    /// Applies `event` against `hazards`.
    ///
    /// Opening an id that is not in `hazards` closes the view instead.
    pub fn handle(&mut self, event: DetailEvent, hazards: &[Hazard]) -> Option<&HazardDetail> {
        match event {
            DetailEvent::Open { hazard_id } => {
                self.open = hazards
                    .iter()
                    .find(|h| h.id == hazard_id)
                    .map(HazardDetail::from);
                if self.open.is_none() {
                    log::debug!("Hazard {hazard_id} is no longer in the current result set");
                }
            }
            DetailEvent::Close => self.open = None,
        }
        self.open.as_ref()
    }
}
