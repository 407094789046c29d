//! In-process hazard store.
//!
//! Evaluates [`HazardQuery`] predicates directly over a fixed set of
//! hazards. Used for offline runs and as a test double.

use async_trait::async_trait;
use hazard_map_hazard_models::Hazard;
use hazard_map_query_models::{HazardQuery, SortOrder};

use crate::{HazardStore, QueryError};

/// A [`HazardStore`] over hazards held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHazardStore {
    hazards: Vec<Hazard>,
}

impl InMemoryHazardStore {
    /// Creates a store over `hazards`.
    #[must_use]
    pub const fn new(hazards: Vec<Hazard>) -> Self {
        Self { hazards }
    }

    /// Evaluates `query` synchronously.
    #[must_use]
    pub fn evaluate(&self, query: &HazardQuery) -> Vec<Hazard> {
        let mut matched: Vec<Hazard> = self
            .hazards
            .iter()
            .filter(|h| query.matches(h))
            .cloned()
            .collect();

        match query.order {
            // Stable sort keeps insertion order among equal timestamps;
            // undated rows sort last like `NULLS LAST`.
            SortOrder::NewestFirst => {
                matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
        }

        matched.truncate(usize::try_from(query.limit).unwrap_or(usize::MAX));
        matched
    }
}

#[async_trait]
impl HazardStore for InMemoryHazardStore {
    async fn fetch(&self, query: &HazardQuery) -> Result<Vec<Hazard>, QueryError> {
        Ok(self.evaluate(query))
    }
}
