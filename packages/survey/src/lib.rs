#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Survey submission for a selected region.
//!
//! The analysis service only understands bounding boxes, so a selection
//! polygon is reduced to its envelope before it is sent. Submission is
//! fire-and-forget: a `{"ok": true}` answer means the job was started,
//! and nothing tracks it after that.

pub mod http;
pub mod orchestrator;

use async_trait::async_trait;
use hazard_map_hazard_models::BoundingBox;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpSurveyTransport;
pub use orchestrator::{SurveyJob, SurveyOrchestrator};

/// Body of a survey request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurveyBounds {
    /// Southern edge.
    pub lat_min: f64,
    /// Western edge.
    pub lon_min: f64,
    /// Northern edge.
    pub lat_max: f64,
    /// Eastern edge.
    pub lon_max: f64,
    /// Sampling step in degrees; the service picks its own when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_step: Option<f64>,
}

impl SurveyBounds {
    /// Request covering `bbox`.
    #[must_use]
    pub const fn from_bounding_box(bbox: &BoundingBox, grid_step: Option<f64>) -> Self {
        Self {
            lat_min: bbox.south,
            lon_min: bbox.west,
            lat_max: bbox.north,
            lon_max: bbox.east,
            grid_step,
        }
    }
}

/// Reply from the analysis service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyResponse {
    /// Whether the job was started.
    #[serde(default)]
    pub ok: bool,
    /// Optional human-readable status.
    #[serde(default)]
    pub message: Option<String>,
}

impl SurveyResponse {
    /// Whether the service reported that the job started.
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError::NotAccepted`] when `ok` is not set.
    pub const fn accepted(&self) -> Result<(), SurveyError> {
        if self.ok {
            Ok(())
        } else {
            Err(SurveyError::NotAccepted)
        }
    }
}

/// Something that can start a survey job.
#[async_trait]
pub trait SurveyTransport: Send + Sync {
    /// Sends one survey request.
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError`] if the request fails or the service answers
    /// with a non-success status.
    async fn start(&self, bounds: &SurveyBounds) -> Result<SurveyResponse, SurveyError>;
}

/// Errors from survey submission.
#[derive(Debug, Error)]
pub enum SurveyError {
    /// Submit was attempted without a finished selection.
    #[error("Please draw a bounding box first.")]
    NoSelection,

    /// A request is already in flight.
    #[error("A survey request is already being submitted.")]
    Busy,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("HTTP {status}")]
    Status {
        /// Response status code.
        status: u16,
    },

    /// The service answered but did not report `ok: true`.
    #[error("Survey call completed but did not indicate success.")]
    NotAccepted,
}

impl SurveyError {
    /// Status line to show the operator for this error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NoSelection | Self::Busy | Self::NotAccepted => self.to_string(),
            Self::Http(_) | Self::Status { .. } => format!("Failed to start survey: {self}"),
        }
    }
}
