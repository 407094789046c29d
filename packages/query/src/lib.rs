#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Hazard query engine for the dashboard.
//!
//! Composes the operator's [`FilterState`] into a store query, fetches the
//! matching hazards, and computes facet statistics over a separate
//! unfiltered snapshot so that every filter chip stays available while
//! filters are active.
//!
//! Filter changes may overlap in flight. [`QueryGeneration`] hands out
//! tickets so that only the newest query's result is applied.

pub mod compose;
pub mod generation;
pub mod memory;
pub mod postgrest;

use std::sync::Arc;

use async_trait::async_trait;
use hazard_map_hazard_models::Hazard;
use hazard_map_query_models::{DEFAULT_PAGE_SIZE, FacetStats, FilterState, HazardQuery};
use thiserror::Error;

pub use compose::{build_query, compute_facet_stats};
pub use generation::{QueryGeneration, QueryTicket};
pub use memory::InMemoryHazardStore;
pub use postgrest::PostgrestHazardStore;

/// Backend that answers hazard queries.
#[async_trait]
pub trait HazardStore: Send + Sync {
    /// Returns the hazards matching `query`, newest first, capped at
    /// `query.limit`.
    ///
    /// Rows that cannot be turned into a [`Hazard`] are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the store cannot be reached or answers
    /// with something other than a list of rows.
    async fn fetch(&self, query: &HazardQuery) -> Result<Vec<Hazard>, QueryError>;
}

/// Errors from hazard store queries.
#[derive(Debug, Error)]
pub enum QueryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("Hazard store returned HTTP {status}: {body}")]
    Status {
        /// Response status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// Runs filtered queries and facet snapshots against a [`HazardStore`].
#[derive(Clone)]
pub struct HazardQueryEngine {
    store: Arc<dyn HazardStore>,
    page_size: u32,
}

impl HazardQueryEngine {
    /// Creates an engine over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn HazardStore>) -> Self {
        Self {
            store,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Caps both filtered queries and facet snapshots at `page_size` rows.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Fetches the hazards matching `filters`.
    ///
    /// # Errors
    ///
    /// Propagates [`QueryError`] from the store.
    pub async fn fetch_hazards(&self, filters: &FilterState) -> Result<Vec<Hazard>, QueryError> {
        let query = HazardQuery {
            limit: self.page_size,
            ..build_query(filters)
        };
        log::debug!("Querying hazards with {} predicates", query.predicates.len());
        let hazards = self.store.fetch(&query).await?;
        log::debug!("Hazard query returned {} records", hazards.len());
        Ok(hazards)
    }

    /// Fetches the unfiltered snapshot and derives its facet counts.
    ///
    /// # Errors
    ///
    /// Propagates [`QueryError`] from the store.
    pub async fn fetch_facet_stats(&self) -> Result<FacetStats, QueryError> {
        let query = HazardQuery {
            limit: self.page_size,
            ..HazardQuery::unfiltered()
        };
        let snapshot = self.store.fetch(&query).await?;
        Ok(compute_facet_stats(&snapshot))
    }
}
