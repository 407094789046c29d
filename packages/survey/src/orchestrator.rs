//! Client-side survey job tracking.
//!
//! Submission is split into [`SurveyOrchestrator::begin`] and
//! [`SurveyOrchestrator::finish`]; the request itself runs in between
//! without borrowing the orchestrator. [`SurveyOrchestrator::submit`]
//! chains the three.

use std::sync::Arc;

use hazard_map_selection::SelectionPolygon;
use serde::{Deserialize, Serialize};

use crate::{SurveyBounds, SurveyError, SurveyResponse, SurveyTransport};

/// Status line after the service accepts a job.
pub const STARTED_MESSAGE: &str = "Survey processing started in the background.";

/// Local submit/running flags for the current selection.
///
/// `running` only records that the service accepted a job. Completion is
/// never reported back, so it stays set until the job is reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyJob {
    /// A request is in flight.
    pub submitting: bool,
    /// The service accepted a job.
    pub running: bool,
    /// Status line for the operator; empty when there is nothing to say.
    pub message: String,
}

/// Turns a selection into a survey request and tracks its flags.
pub struct SurveyOrchestrator {
    transport: Arc<dyn SurveyTransport>,
    grid_step: Option<f64>,
    job: SurveyJob,
}

impl SurveyOrchestrator {
    /// Creates an orchestrator sending through `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn SurveyTransport>, grid_step: Option<f64>) -> Self {
        Self {
            transport,
            grid_step,
            job: SurveyJob::default(),
        }
    }

    /// Current job flags.
    #[must_use]
    pub const fn job(&self) -> &SurveyJob {
        &self.job
    }

    /// Shared handle to the transport.
    #[must_use]
    pub fn transport(&self) -> Arc<dyn SurveyTransport> {
        Arc::clone(&self.transport)
    }

    /// Forgets the current job, e.g. when the selection changes.
    pub fn reset(&mut self) {
        self.job = SurveyJob::default();
    }

    /// Validates the selection and marks a request as in flight.
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError::NoSelection`] without a selection and
    /// [`SurveyError::Busy`] while another request is in flight. Neither
    /// changes the in-flight flag.
    pub fn begin(
        &mut self,
        selection: Option<&SelectionPolygon>,
    ) -> Result<SurveyBounds, SurveyError> {
        if self.job.submitting {
            return Err(SurveyError::Busy);
        }

        let Some(polygon) = selection else {
            let err = SurveyError::NoSelection;
            self.job.message = err.user_message();
            return Err(err);
        };

        let bounds = SurveyBounds::from_bounding_box(&polygon.bounding_box(), self.grid_step);
        log::info!(
            "Submitting survey for lat [{}, {}] lon [{}, {}]",
            bounds.lat_min,
            bounds.lat_max,
            bounds.lon_min,
            bounds.lon_max,
        );

        self.job.submitting = true;
        self.job.message.clear();
        Ok(bounds)
    }

    /// Records the outcome of a request started with [`Self::begin`].
    ///
    /// # Errors
    ///
    /// Returns the transport error, or [`SurveyError::NotAccepted`] when
    /// the service did not answer `ok: true`.
    pub fn finish(
        &mut self,
        outcome: Result<SurveyResponse, SurveyError>,
    ) -> Result<(), SurveyError> {
        self.job.submitting = false;

        let Err(result) = outcome.and_then(|response| response.accepted()) else {
            self.job.running = true;
            self.job.message = STARTED_MESSAGE.to_string();
            return Ok(());
        };

        log::warn!("Survey submission failed: {result}");
        self.job.message = result.user_message();
        Err(result)
    }

    /// Submits `selection` and waits for the service to answer.
    ///
    /// # Errors
    ///
    /// See [`Self::begin`] and [`Self::finish`].
    pub async fn submit(&mut self, selection: Option<&SelectionPolygon>) -> Result<(), SurveyError> {
        let bounds = self.begin(selection)?;
        let outcome = self.transport.start(&bounds).await;
        self.finish(outcome)
    }
}
