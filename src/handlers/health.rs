//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that returns
//! refresh statistics and per-provider freshness as plain text.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::state::SharedState;

// Time conversion constants
const SECONDS_PER_HOUR: f64 = 3600.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const HOURS_PER_DAY: f64 = 24.0;

fn format_uptime(uptime_seconds: u64) -> String {
    let uptime_hours = uptime_seconds as f64 / SECONDS_PER_HOUR;
    if uptime_hours < 1.0 {
        format!("{:.1} minutes", uptime_hours * MINUTES_PER_HOUR)
    } else if uptime_hours < HOURS_PER_DAY {
        format!("{:.1} hours", uptime_hours)
    } else {
        format!("{:.1} days", uptime_hours / HOURS_PER_DAY)
    }
}

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    state.health_stats.record_http_request();

    let since_cycle = state.health_stats.seconds_since_last_cycle();
    let (status, message) = match since_cycle {
        Some(_) => (StatusCode::OK, "OK"),
        None => (StatusCode::SERVICE_UNAVAILABLE, "No refresh cycle completed yet"),
    };

    let uptime_str = format_uptime(state.health_stats.get_uptime_seconds());
    let table = state.health_stats.render_table();
    let providers = render_providers(&state).await;

    debug!("Health check: {} - {}", status, message);
    (
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!("{message}\n\nUptime: {uptime_str}\n\n{table}\n{providers}"),
    )
}

/// Renders the age of every provider's record as a plain-text table.
async fn render_providers(state: &SharedState) -> String {
    let records = state.store.snapshot_all().await;
    let now = Utc::now().timestamp();

    let mut out = String::new();
    writeln!(out, "PROVIDERS").ok();
    writeln!(out, "---------").ok();
    writeln!(
        out,
        "{:<28} | {:<9} | {:<8} | {:>12}",
        "id", "family", "network", "age (s)"
    )
    .ok();

    for provider in state.providers.iter() {
        let age = records
            .get(&provider.id)
            .map(|r| r.last_updated())
            .filter(|&t| t > 0)
            .map(|t| (now - t).max(0).to_string())
            .unwrap_or_else(|| "never".to_string());
        writeln!(
            out,
            "{:<28} | {:<9} | {:<8} | {:>12}",
            provider.id,
            provider.family.to_string(),
            provider.network.to_string(),
            age
        )
        .ok();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime_units() {
        assert_eq!(format_uptime(90), "1.5 minutes");
        assert_eq!(format_uptime(7200), "2.0 hours");
        assert_eq!(format_uptime(3 * 86_400), "3.0 days");
    }
}
