#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Operator dashboard controller.
//!
//! [`Dashboard`] wires the query engine, road-network cache, region
//! selector, and survey orchestrator together around one owned
//! [`ViewState`]. The view exists between [`Dashboard::mount`] and
//! [`Dashboard::teardown`]; every async operation re-checks it after each
//! await and drops its result if the view has gone away in the meantime.
//!
//! Filter changes re-query the store and re-render the layer. Overlapping
//! queries are resolved last-result-wins through [`QueryGeneration`]
//! tickets. Facet counts come from a separate unfiltered snapshot that is
//! only refreshed on mount or on request.

pub mod config;
pub mod detail;
pub mod render;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use hazard_map_hazard_models::{BoundingBox, Coordinate, Hazard};
use hazard_map_query::{
    HazardQueryEngine, PostgrestHazardStore, QueryError, QueryGeneration, QueryTicket,
};
use hazard_map_query_models::{FacetKind, FacetStats, FilterState};
use hazard_map_road_network::{CacheSettings, OverpassClient, RoadNetworkCache};
use hazard_map_selection::{HandlerChange, RegionSelector, SelectionError, SelectorEvent};
use hazard_map_survey::{HttpSurveyTransport, SurveyError, SurveyOrchestrator, SurveyTransport};

pub use config::{ConfigError, DashboardConfig};
pub use detail::{DetailEvent, DetailViewController, HazardDetail};
pub use render::{PathStyle, RenderItem, build_layer};

/// Half-extent in degrees of the initial viewport around the map center.
const INITIAL_VIEW_HALF_EXTENT: f64 = 0.05;

/// Everything that exists only while the map is mounted.
pub struct ViewState {
    /// Visible map bounds.
    pub viewport: BoundingBox,
    /// Operator filter selections.
    pub filters: FilterState,
    /// Hazards matching `filters`.
    pub hazards: Vec<Hazard>,
    /// Counts over the unfiltered snapshot.
    pub facets: FacetStats,
    /// Items currently drawn for `hazards`.
    pub layer: Vec<RenderItem>,
    /// Region selection flow.
    pub selector: RegionSelector,
    /// Survey flags for the current selection.
    pub survey: SurveyOrchestrator,
    /// Hazard detail view.
    pub detail: DetailViewController,
    /// Last error or survey status shown to the operator.
    pub notice: Option<String>,
}

impl ViewState {
    /// Status line: the last notice, else the selector's instructions.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.notice
            .clone()
            .or_else(|| self.selector.message().map(ToString::to_string))
    }
}

/// Query engine over the configured PostgREST hazard store.
#[must_use]
pub fn hazard_engine(config: &DashboardConfig, client: &reqwest::Client) -> HazardQueryEngine {
    let mut store = PostgrestHazardStore::new(client.clone(), &config.hazard_store.base_url)
        .with_table(&config.hazard_store.table);
    if let Some(key) = &config.hazard_store.api_key {
        store = store.with_api_key(key);
    }
    HazardQueryEngine::new(Arc::new(store)).with_page_size(config.hazard_store.page_size)
}

/// Road network cache over the configured Overpass endpoint.
#[must_use]
pub fn road_network_cache(
    config: &DashboardConfig,
    client: &reqwest::Client,
) -> RoadNetworkCache {
    let overpass = OverpassClient::new(client.clone(), &config.road_network.overpass_url)
        .with_way_selector(&config.road_network.way_selector)
        .with_timeout_secs(config.road_network.timeout_secs);
    RoadNetworkCache::new(
        Arc::new(overpass),
        CacheSettings {
            quantum_deg: config.road_network.quantum_deg,
            capacity: config.road_network.capacity,
        },
    )
}

/// HTTP transport for the configured survey service.
#[must_use]
pub fn survey_transport(
    config: &DashboardConfig,
    client: &reqwest::Client,
) -> Arc<dyn SurveyTransport> {
    Arc::new(HttpSurveyTransport::new(client.clone(), &config.survey.url))
}

/// The dashboard controller.
pub struct Dashboard {
    engine: HazardQueryEngine,
    roads: Arc<RoadNetworkCache>,
    survey_transport: Arc<dyn SurveyTransport>,
    grid_step: Option<f64>,
    generation: QueryGeneration,
    view: Mutex<Option<ViewState>>,
}

impl Dashboard {
    /// Creates an unmounted dashboard.
    #[must_use]
    pub fn new(
        engine: HazardQueryEngine,
        roads: Arc<RoadNetworkCache>,
        survey_transport: Arc<dyn SurveyTransport>,
        grid_step: Option<f64>,
    ) -> Self {
        Self {
            engine,
            roads,
            survey_transport,
            grid_step,
            generation: QueryGeneration::new(),
            view: Mutex::new(None),
        }
    }

    /// Builds the live HTTP clients described by `config`.
    #[must_use]
    pub fn from_config(config: &DashboardConfig, client: &reqwest::Client) -> Self {
        Self::new(
            hazard_engine(config, client),
            Arc::new(road_network_cache(config, client)),
            survey_transport(config, client),
            config.survey.grid_step,
        )
    }

    /// Initial viewport for a map config.
    #[must_use]
    pub const fn initial_viewport(map: &config::MapConfig) -> BoundingBox {
        BoundingBox::around(
            Coordinate::new(map.center_lat, map.center_lon),
            INITIAL_VIEW_HALF_EXTENT,
        )
    }

    fn lock(&self) -> MutexGuard<'_, Option<ViewState>> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` on the mounted view, or returns `None` after teardown.
    pub fn with_view<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> Option<R> {
        self.lock().as_mut().map(f)
    }

    /// Whether the view exists.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.lock().is_some()
    }

    /// Creates the view at `viewport` and loads hazards and facets.
    pub async fn mount(&self, viewport: BoundingBox) {
        *self.lock() = Some(ViewState {
            viewport,
            filters: FilterState::default(),
            hazards: Vec::new(),
            facets: FacetStats::default(),
            layer: Vec::new(),
            selector: RegionSelector::new(),
            survey: SurveyOrchestrator::new(Arc::clone(&self.survey_transport), self.grid_step),
            detail: DetailViewController::default(),
            notice: None,
        });
        log::info!("Dashboard mounted at {viewport:?}");

        self.refresh_facets().await;
        self.refresh_hazards().await;
    }

    /// Drops the view. In-flight operations discard their results.
    pub fn teardown(&self) {
        if self.lock().take().is_some() {
            log::info!("Dashboard torn down");
        }
    }

    /// Moves the map and re-renders.
    pub async fn set_viewport(&self, viewport: BoundingBox) {
        if self.with_view(|v| v.viewport = viewport).is_some() {
            self.render().await;
        }
    }

    // ── Filters ─────────────────────────────────────────────────────────

    /// Toggles one facet value and re-queries.
    pub async fn toggle_filter(&self, facet: FacetKind, value: &str) {
        self.update_filters(|f| f.toggle(facet, value)).await;
    }

    /// Clears a facet and re-queries.
    pub async fn clear_filter(&self, facet: FacetKind) {
        self.update_filters(|f| f.clear(facet)).await;
    }

    /// Sets the minimum severity and re-queries.
    pub async fn set_min_severity(&self, severity: u8) {
        self.update_filters(|f| f.set_min_severity(severity)).await;
    }

    /// Sets the creation-time window and re-queries.
    pub async fn set_date_range(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) {
        self.update_filters(|f| f.set_date_range(start, end)).await;
    }

    async fn update_filters(&self, change: impl FnOnce(&mut FilterState)) {
        if self.with_view(|v| change(&mut v.filters)).is_some() {
            self.refresh_hazards().await;
        }
    }

    // ── Hazard queries ──────────────────────────────────────────────────

    /// Starts a new query generation for the current filters.
    ///
    /// Returns `None` when unmounted.
    pub fn begin_hazard_query(&self) -> Option<(QueryTicket, FilterState)> {
        let filters = self.with_view(|v| v.filters.clone())?;
        Some((self.generation.begin(), filters))
    }

    /// Stores a query result if `ticket` is still the newest generation.
    ///
    /// Returns whether the result was applied. Errors leave the previous
    /// hazards in place.
    pub fn apply_hazard_result(
        &self,
        ticket: QueryTicket,
        result: Result<Vec<Hazard>, QueryError>,
    ) -> bool {
        if !self.generation.is_current(ticket) {
            log::debug!("Discarding stale hazard result #{}", ticket.value());
            return false;
        }

        self.with_view(|view| match result {
            Ok(hazards) => {
                view.hazards = hazards;
                if let Some(open) = view.detail.current().map(|d| d.id.clone()) {
                    view.detail.handle(DetailEvent::Open { hazard_id: open }, &view.hazards);
                }
                true
            }
            Err(e) => {
                log::error!("Hazard query failed: {e}");
                false
            }
        })
        .unwrap_or_else(|| {
            log::debug!("Dropping hazard result #{}: view is gone", ticket.value());
            false
        })
    }

    /// Re-queries hazards for the current filters and re-renders.
    pub async fn refresh_hazards(&self) {
        let Some((ticket, filters)) = self.begin_hazard_query() else {
            return;
        };
        let result = self.engine.fetch_hazards(&filters).await;
        if self.apply_hazard_result(ticket, result) {
            self.render().await;
        }
    }

    /// Recomputes facet counts from a fresh unfiltered snapshot.
    pub async fn refresh_facets(&self) {
        match self.engine.fetch_facet_stats().await {
            Ok(stats) => {
                if self.with_view(|v| v.facets = stats).is_none() {
                    log::debug!("Dropping facet snapshot: view is gone");
                }
            }
            Err(e) => log::error!("Facet snapshot failed: {e}"),
        }
    }

    // ── Rendering ───────────────────────────────────────────────────────

    /// Redraws the hazard layer, snapping hazards to roads in view.
    pub async fn render(&self) {
        let Some((viewport, empty)) = self.with_view(|v| (v.viewport, v.hazards.is_empty()))
        else {
            return;
        };

        if empty {
            self.with_view(|v| v.layer.clear());
            return;
        }

        let network = self.roads.ensure_network(viewport).await;

        let drawn = self.with_view(|v| {
            if v.viewport != viewport {
                return None;
            }
            v.layer = build_layer(&v.hazards, &network);
            Some(v.layer.iter().filter(|i| i.is_highlight()).count())
        });
        match drawn {
            Some(Some(highlights)) => log::debug!("Rendered {highlights} road highlights"),
            Some(None) => log::debug!("Skipping render: viewport moved during road fetch"),
            None => log::debug!("Skipping render: view is gone"),
        }
    }

    // ── Detail view ─────────────────────────────────────────────────────

    /// Handles a click on a rendered item.
    pub fn click_marker(&self, hazard_id: &str) -> Option<HazardDetail> {
        self.dispatch_detail(DetailEvent::Open {
            hazard_id: hazard_id.to_string(),
        })
    }

    /// Applies a detail event to the view's detail controller.
    pub fn dispatch_detail(&self, event: DetailEvent) -> Option<HazardDetail> {
        self.with_view(|v| v.detail.handle(event, &v.hazards).cloned())
            .flatten()
    }

    // ── Region selection and survey ─────────────────────────────────────

    /// Feeds a UI event to the region selector.
    ///
    /// Starting, cancelling, or clearing a selection forgets the survey
    /// job for the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError`] when a shape cannot be finished; the
    /// message is also stored as the view's notice.
    pub fn selector_event(&self, event: SelectorEvent) -> Result<HandlerChange, SelectionError> {
        self.with_view(|view| {
            if matches!(
                event,
                SelectorEvent::Start | SelectorEvent::Cancel | SelectorEvent::Clear
            ) {
                view.survey.reset();
            }
            match view.selector.handle(event) {
                Ok(change) => {
                    if !change.is_empty() || view.selector.selection().is_some() {
                        view.notice = None;
                    }
                    Ok(change)
                }
                Err(e) => {
                    view.notice = Some(e.to_string());
                    Err(e)
                }
            }
        })
        .unwrap_or_else(|| Ok(HandlerChange::default()))
    }

    /// Submits the current selection to the survey service.
    ///
    /// # Errors
    ///
    /// Returns [`SurveyError`] if there is no selection, a request is
    /// already in flight, or the service does not accept the job.
    pub async fn submit_survey(&self) -> Result<(), SurveyError> {
        let (bounds, transport) = self
            .with_view(|view| {
                let bounds = view.survey.begin(view.selector.selection());
                if let Err(e) = &bounds {
                    view.notice = Some(e.user_message());
                }
                bounds.map(|b| (b, view.survey.transport()))
            })
            .unwrap_or(Err(SurveyError::NoSelection))?;

        let outcome = transport.start(&bounds).await;

        let mut guard = self.lock();
        let Some(view) = guard.as_mut() else {
            let result = outcome.and_then(|response| response.accepted());
            if let Err(e) = &result {
                log::warn!("Survey submission failed after teardown: {e}");
            }
            return result;
        };
        let result = view.survey.finish(outcome);
        view.notice = Some(view.survey.job().message.clone());
        result
    }
}
