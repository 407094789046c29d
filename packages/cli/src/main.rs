#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! CLI entry point for the hazard map services.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use hazard_map_dashboard::{
    DashboardConfig, hazard_engine, road_network_cache, survey_transport,
};
use hazard_map_geometry::snap_to_network;
use hazard_map_hazard_models::{BoundingBox, Coordinate, Hazard};
use hazard_map_query_models::{FacetCount, FacetKind, FilterState};
use hazard_map_selection::SelectionPolygon;
use hazard_map_survey::SurveyOrchestrator;

/// Half-extent in degrees of the viewport fetched around a snapped point.
const SNAP_HALF_EXTENT: f64 = 0.005;

#[derive(Parser)]
#[command(name = "hazard_map_cli", about = "Road hazard map client")]
struct Cli {
    /// Configuration file (defaults to the built-in configuration)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List hazards matching the given filters, newest first
    Query {
        /// Hazard type to include (repeatable)
        #[arg(long = "type")]
        hazard_types: Vec<String>,
        /// Source to include (repeatable)
        #[arg(long = "source")]
        sources: Vec<String>,
        /// Minimum severity (0-5)
        #[arg(long, default_value = "0")]
        min_severity: u8,
        /// Only hazards created at or after this RFC 3339 time
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        /// Only hazards created at or before this RFC 3339 time
        #[arg(long)]
        until: Option<DateTime<Utc>>,
        /// Print the hazards as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show type and source counts over the unfiltered hazard set
    Facets,
    /// Snap a point to the nearest road and print the highlight segment
    Snap {
        /// Latitude of the point
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude of the point
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
    /// Start a survey over a bounding box
    Survey {
        /// Box as `lat_min,lon_min,lat_max,lon_max`
        #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
        bbox: BoundingBox,
    },
}

/// Parses `lat_min,lon_min,lat_max,lon_max`.
fn parse_bbox(s: &str) -> Result<BoundingBox, String> {
    let values = s
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| format!("Invalid number {part:?}: {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let [lat_min, lon_min, lat_max, lon_max] = values[..] else {
        return Err(format!(
            "Expected 4 comma-separated values, got {}",
            values.len()
        ));
    };
    if !values.iter().all(|v| v.is_finite()) {
        return Err("Coordinates must be finite".to_string());
    }

    Ok(BoundingBox::from_corners(
        Coordinate::new(lat_min, lon_min),
        Coordinate::new(lat_max, lon_max),
    ))
}

fn print_hazards(hazards: &[Hazard]) {
    println!(
        "{:<38} {:<14} {:>3} {:<8} {:<20} LOCATION",
        "ID", "TYPE", "SEV", "SOURCE", "CREATED"
    );
    println!("{}", "-".repeat(100));
    for hazard in hazards {
        println!(
            "{:<38} {:<14} {:>3} {:<8} {:<20} {:.5},{:.5}",
            hazard.id,
            hazard.hazard_type.as_deref().unwrap_or("-"),
            hazard
                .severity
                .map_or_else(|| "-".to_string(), |s| s.to_string()),
            hazard.source.as_deref().unwrap_or("-"),
            hazard
                .created_at
                .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string()),
            hazard.lat,
            hazard.lon,
        );
    }
    println!("{} hazard(s)", hazards.len());
}

fn print_facet(facet: FacetKind, counts: &[FacetCount]) {
    println!("{facet}:");
    if counts.is_empty() {
        println!("  (none)");
    }
    for count in counts {
        println!("  {:<20} {}", count.value, count.count);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = DashboardConfig::load(cli.config.as_deref())?;
    log::debug!(
        "Using hazard store {} and survey service {}",
        config.hazard_store.base_url,
        config.survey.url
    );
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Query {
            hazard_types,
            sources,
            min_severity,
            since,
            until,
            json,
        } => {
            let mut filters = FilterState::default();
            for value in &hazard_types {
                filters.toggle(FacetKind::Type, value);
            }
            for value in &sources {
                filters.toggle(FacetKind::Source, value);
            }
            filters.set_min_severity(min_severity);
            filters.set_date_range(since, until);

            let hazards = hazard_engine(&config, &client)
                .fetch_hazards(&filters)
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&hazards)?);
            } else {
                print_hazards(&hazards);
            }
        }
        Commands::Facets => {
            let stats = hazard_engine(&config, &client).fetch_facet_stats().await?;
            print_facet(FacetKind::Type, &stats.type_stats);
            print_facet(FacetKind::Source, &stats.source_stats);
        }
        Commands::Snap { lat, lon } => {
            let point = Coordinate::new(lat, lon);
            let cache = road_network_cache(&config, &client);
            let network = cache
                .ensure_network(BoundingBox::around(point, SNAP_HALF_EXTENT))
                .await;

            match snap_to_network(point, &network) {
                Some(segment) => println!(
                    "{:.6},{:.6} -> {:.6},{:.6}",
                    segment.start.lat, segment.start.lon, segment.end.lat, segment.end.lon
                ),
                None => println!("No road data near {lat},{lon}; draw a point marker"),
            }
        }
        Commands::Survey { bbox } => {
            let selection = SelectionPolygon::from_box(&bbox)?;
            let mut orchestrator = SurveyOrchestrator::new(
                survey_transport(&config, &client),
                config.survey.grid_step,
            );

            let result = orchestrator.submit(Some(&selection)).await;
            println!("{}", orchestrator.job().message);
            result?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_parses_in_survey_order() {
        let bbox = parse_bbox("40.30, -74.70, 40.40, -74.60").unwrap();
        assert_eq!(bbox, BoundingBox::new(-74.70, 40.30, -74.60, 40.40));
    }

    #[test]
    fn bbox_rejects_bad_input() {
        assert!(parse_bbox("40.3,-74.7,40.4").is_err());
        assert!(parse_bbox("40.3,-74.7,40.4,abc").is_err());
        assert!(parse_bbox("40.3,-74.7,40.4,inf").is_err());
    }

    #[test]
    fn cli_parses_query_filters() {
        let cli = Cli::try_parse_from([
            "hazard_map_cli",
            "query",
            "--type",
            "pothole",
            "--type",
            "crack",
            "--min-severity",
            "3",
            "--since",
            "2024-01-01T00:00:00Z",
        ])
        .unwrap();

        let Commands::Query {
            hazard_types,
            min_severity,
            since,
            ..
        } = cli.command
        else {
            panic!("expected query");
        };
        assert_eq!(hazard_types, vec!["pothole", "crack"]);
        assert_eq!(min_severity, 3);
        assert!(since.is_some());
    }
}
