#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Hazard filter state, query descriptors, and facet statistics types.
//!
//! [`FilterState`] is what the operator toggles in the sidebar.
//! [`HazardQuery`] is the store-agnostic descriptor composed from it: a
//! conjunction of [`Predicate`]s plus ordering and a row cap.
//! [`FacetStats`] holds the value counts shown next to each filter chip.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use hazard_map_hazard_models::{Hazard, MAX_SEVERITY};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Fixed row cap for hazard queries and facet snapshots.
pub const DEFAULT_PAGE_SIZE: u32 = 5000;

/// A filterable string dimension.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FacetKind {
    /// Hazard type (`hazard_type` column).
    Type,
    /// Report source (`source` column).
    Source,
}

impl FacetKind {
    /// Store column backing this facet.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Type => "hazard_type",
            Self::Source => "source",
        }
    }

    /// Reads this facet's raw value from a hazard.
    #[must_use]
    pub fn value_of(self, hazard: &Hazard) -> Option<&str> {
        match self {
            Self::Type => hazard.hazard_type.as_deref(),
            Self::Source => hazard.source.as_deref(),
        }
    }
}

/// The operator's current filter selections.
///
/// Set order is irrelevant; only membership matters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    /// Selected hazard types.
    pub types: BTreeSet<String>,
    /// Minimum severity, `0` meaning no constraint.
    pub min_severity: u8,
    /// Selected sources.
    pub source: BTreeSet<String>,
    /// Earliest creation time.
    pub start: Option<DateTime<Utc>>,
    /// Latest creation time.
    pub end: Option<DateTime<Utc>>,
}

impl FilterState {
    /// Selected values of a facet.
    #[must_use]
    pub const fn values(&self, facet: FacetKind) -> &BTreeSet<String> {
        match facet {
            FacetKind::Type => &self.types,
            FacetKind::Source => &self.source,
        }
    }

    const fn values_mut(&mut self, facet: FacetKind) -> &mut BTreeSet<String> {
        match facet {
            FacetKind::Type => &mut self.types,
            FacetKind::Source => &mut self.source,
        }
    }

    /// Adds `value` to the facet selection, or removes it if present.
    pub fn toggle(&mut self, facet: FacetKind, value: &str) {
        let set = self.values_mut(facet);
        if !set.remove(value) {
            set.insert(value.to_string());
        }
    }

    /// Clears every selection of a facet.
    pub fn clear(&mut self, facet: FacetKind) {
        self.values_mut(facet).clear();
    }

    /// Whether `value` is selected for the facet.
    #[must_use]
    pub fn is_selected(&self, facet: FacetKind, value: &str) -> bool {
        self.values(facet).contains(value)
    }

    /// Sets the minimum severity, clamped to `0..=5`.
    pub fn set_min_severity(&mut self, severity: u8) {
        self.min_severity = severity.min(MAX_SEVERITY);
    }

    /// Sets the creation-time window. `None` leaves that end open.
    pub fn set_date_range(&mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) {
        self.start = start;
        self.end = end;
    }
}

/// One conjunctive constraint on the hazard set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// Value of the facet column is one of `values`.
    In {
        /// Facet column.
        facet: FacetKind,
        /// Accepted values.
        values: BTreeSet<String>,
    },
    /// `severity >= min`.
    SeverityAtLeast {
        /// Inclusive lower bound.
        min: u8,
    },
    /// `created_at >= at`.
    CreatedFrom {
        /// Inclusive lower bound.
        at: DateTime<Utc>,
    },
    /// `created_at <= at`.
    CreatedUntil {
        /// Inclusive upper bound.
        at: DateTime<Utc>,
    },
}

impl Predicate {
    /// Evaluates the predicate against a hazard.
    ///
    /// Absent fields never satisfy a constraint, matching SQL `NULL`
    /// comparison semantics in the store.
    #[must_use]
    pub fn matches(&self, hazard: &Hazard) -> bool {
        match self {
            Self::In { facet, values } => {
                facet.value_of(hazard).is_some_and(|v| values.contains(v))
            }
            Self::SeverityAtLeast { min } => {
                hazard.severity.is_some_and(|s| s >= i64::from(*min))
            }
            Self::CreatedFrom { at } => hazard.created_at.is_some_and(|c| c >= *at),
            Self::CreatedUntil { at } => hazard.created_at.is_some_and(|c| c <= *at),
        }
    }
}

/// Result ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// `created_at` descending.
    #[default]
    NewestFirst,
}

/// A store-agnostic hazard query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardQuery {
    /// Conjunctive constraints; empty means every record.
    pub predicates: Vec<Predicate>,
    /// Result ordering.
    pub order: SortOrder,
    /// Maximum number of rows.
    pub limit: u32,
}

impl Default for HazardQuery {
    fn default() -> Self {
        Self::unfiltered()
    }
}

impl HazardQuery {
    /// Every record, newest first, up to the page cap.
    #[must_use]
    pub const fn unfiltered() -> Self {
        Self {
            predicates: Vec::new(),
            order: SortOrder::NewestFirst,
            limit: DEFAULT_PAGE_SIZE,
        }
    }

    /// Whether the query constrains nothing.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Whether a hazard satisfies every predicate.
    #[must_use]
    pub fn matches(&self, hazard: &Hazard) -> bool {
        self.predicates.iter().all(|p| p.matches(hazard))
    }
}

/// A facet value with its number of occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetCount {
    /// Trimmed, non-empty facet value.
    pub value: String,
    /// Number of hazards carrying it.
    pub count: u64,
}

/// Facet counts for the filter chips, sorted by value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetStats {
    /// Counts per hazard type.
    pub type_stats: Vec<FacetCount>,
    /// Counts per source.
    pub source_stats: Vec<FacetCount>,
}

impl FacetStats {
    /// Counts for one facet.
    #[must_use]
    pub fn for_facet(&self, facet: FacetKind) -> &[FacetCount] {
        match facet {
            FacetKind::Type => &self.type_stats,
            FacetKind::Source => &self.source_stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_adds_then_removes() {
        let mut filters = FilterState::default();
        filters.toggle(FacetKind::Type, "pothole");
        assert!(filters.is_selected(FacetKind::Type, "pothole"));
        assert!(!filters.is_selected(FacetKind::Source, "pothole"));
        filters.toggle(FacetKind::Type, "pothole");
        assert!(filters.types.is_empty());
    }

    #[test]
    fn clear_only_touches_one_facet() {
        let mut filters = FilterState::default();
        filters.toggle(FacetKind::Type, "crack");
        filters.toggle(FacetKind::Source, "survey");
        filters.clear(FacetKind::Type);
        assert!(filters.types.is_empty());
        assert_eq!(filters.source.len(), 1);
    }

    #[test]
    fn min_severity_is_clamped() {
        let mut filters = FilterState::default();
        filters.set_min_severity(9);
        assert_eq!(filters.min_severity, 5);
    }

    #[test]
    fn facet_kind_parses_from_snake_case() {
        assert_eq!("type".parse::<FacetKind>().unwrap(), FacetKind::Type);
        assert_eq!(FacetKind::Source.as_ref(), "source");
        assert_eq!(FacetKind::Type.column(), "hazard_type");
    }
}
