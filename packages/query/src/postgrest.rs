//! `PostgREST` hazard store client.
//!
//! The hazards table is exposed through a Supabase-style REST endpoint at
//! `{base_url}/rest/v1/{table}`. Predicates become `PostgREST` column
//! filters (`in.(...)`, `gte.`, `lte.`) on the query string.
//!
//! See <https://postgrest.org/en/stable/references/api/tables_views.html>

use async_trait::async_trait;
use chrono::SecondsFormat;
use hazard_map_hazard_models::Hazard;
use hazard_map_query_models::{HazardQuery, Predicate, SortOrder};

use crate::{HazardStore, QueryError};

/// Default table holding hazard reports.
pub const DEFAULT_TABLE: &str = "hazards";

/// Queries hazards from a `PostgREST` endpoint.
#[derive(Debug, Clone)]
pub struct PostgrestHazardStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    table: String,
}

impl PostgrestHazardStore {
    /// Creates a client for the project at `base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            table: DEFAULT_TABLE.to_string(),
        }
    }

    /// Sends `key` as both `apikey` and bearer token.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Queries `table` instead of [`DEFAULT_TABLE`].
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Full URL of the table endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }
}

/// Translates `query` into `PostgREST` query-string pairs.
///
/// Parameters are emitted in a fixed order: `select`, one filter per
/// predicate, `order`, then `limit`.
#[must_use]
pub fn to_query_params(query: &HazardQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];

    for predicate in &query.predicates {
        let (column, filter) = match predicate {
            Predicate::In { facet, values } => {
                let list = values
                    .iter()
                    .map(|v| quote_value(v))
                    .collect::<Vec<_>>()
                    .join(",");
                (facet.column(), format!("in.({list})"))
            }
            Predicate::SeverityAtLeast { min } => ("severity", format!("gte.{min}")),
            Predicate::CreatedFrom { at } => (
                "created_at",
                format!("gte.{}", at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            ),
            Predicate::CreatedUntil { at } => (
                "created_at",
                format!("lte.{}", at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            ),
        };
        params.push((column.to_string(), filter));
    }

    let order = match query.order {
        SortOrder::NewestFirst => "created_at.desc",
    };
    params.push(("order".to_string(), order.to_string()));
    params.push(("limit".to_string(), query.limit.to_string()));

    params
}

/// Double-quotes a list value so commas and parentheses survive.
fn quote_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Converts a `PostgREST` row array into hazards, skipping malformed rows.
///
/// # Errors
///
/// Returns [`QueryError::Parse`] if `body` is not a JSON array.
pub fn parse_rows(body: serde_json::Value) -> Result<Vec<Hazard>, QueryError> {
    let serde_json::Value::Array(rows) = body else {
        return Err(QueryError::Parse {
            message: "hazard store response is not an array".to_string(),
        });
    };

    let total = rows.len();
    let mut skipped = 0usize;
    let hazards: Vec<Hazard> = rows
        .into_iter()
        .filter_map(|row| match Hazard::from_json(row) {
            Ok(h) => Some(h),
            Err(e) => {
                skipped += 1;
                log::trace!("Skipping hazard row: {e}");
                None
            }
        })
        .collect();

    if skipped > 0 {
        log::debug!("Skipped {skipped} of {total} malformed hazard rows");
    }

    Ok(hazards)
}

#[async_trait]
impl HazardStore for PostgrestHazardStore {
    async fn fetch(&self, query: &HazardQuery) -> Result<Vec<Hazard>, QueryError> {
        let params = to_query_params(query);
        let mut request = self.client.get(self.endpoint()).query(&params);

        if let Some(key) = &self.api_key {
            request = request
                .header("apikey", key)
                .header("Authorization", format!("Bearer {key}"));
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            log::error!("Hazard query failed with HTTP {status}");
            return Err(QueryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = resp.json().await?;
        parse_rows(body)
    }
}
