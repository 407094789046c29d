//! Filter-to-query composition and facet counting.

use std::collections::BTreeMap;

use hazard_map_hazard_models::Hazard;
use hazard_map_query_models::{
    FacetCount, FacetKind, FacetStats, FilterState, HazardQuery, Predicate,
};

/// Composes `filters` into a conjunctive [`HazardQuery`].
///
/// Only constrained dimensions produce a predicate: a facet with no
/// selected values, a minimum severity of `0`, or an open date bound adds
/// nothing. An all-default filter state yields an unconstrained query.
#[must_use]
pub fn build_query(filters: &FilterState) -> HazardQuery {
    let mut query = HazardQuery::unfiltered();

    if !filters.types.is_empty() {
        query.predicates.push(Predicate::In {
            facet: FacetKind::Type,
            values: filters.types.clone(),
        });
    }

    if filters.min_severity > 0 {
        query.predicates.push(Predicate::SeverityAtLeast {
            min: filters.min_severity,
        });
    }

    if !filters.source.is_empty() {
        query.predicates.push(Predicate::In {
            facet: FacetKind::Source,
            values: filters.source.clone(),
        });
    }

    if let Some(at) = filters.start {
        query.predicates.push(Predicate::CreatedFrom { at });
    }
    if let Some(at) = filters.end {
        query.predicates.push(Predicate::CreatedUntil { at });
    }

    query
}

/// Counts facet values across `hazards`.
///
/// Values are trimmed; blank and absent values are not counted. Each
/// facet's counts are sorted by value, so the result does not depend on
/// input order.
#[must_use]
pub fn compute_facet_stats(hazards: &[Hazard]) -> FacetStats {
    FacetStats {
        type_stats: count_facet(hazards, FacetKind::Type),
        source_stats: count_facet(hazards, FacetKind::Source),
    }
}

fn count_facet(hazards: &[Hazard], facet: FacetKind) -> Vec<FacetCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();

    for value in hazards.iter().filter_map(|h| facet.value_of(h)) {
        let value = value.trim();
        if !value.is_empty() {
            *counts.entry(value).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .map(|(value, count)| FacetCount {
            value: value.to_string(),
            count,
        })
        .collect()
}
