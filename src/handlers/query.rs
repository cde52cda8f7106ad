//! Multiplexed query endpoint (`/?c=<tag>`).
//!
//! Tags:
//! - `gsd`: legacy stakepool set
//! - `vsp`: voting service set
//! - `gcs`: coin supply
//! - `price`: exchange rate
//! - `dc`: download count
//! - `dic`: download badge (SVG)
//! - `cc`: clear cached aggregates, loopback callers only

use axum::{
    extract::{ConnectInfo, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tracing::{debug, instrument, warn};

use super::response::{json, json_error, svg, ProviderSet};
use crate::adapters::releases::format_thousands;
use crate::aggregates;
use crate::error::AggregateError;
use crate::provider::ProviderFamily;
use crate::state::SharedState;

const KNOWN_TAGS: [&str; 7] = ["gsd", "vsp", "gcs", "price", "dc", "dic", "cc"];

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub c: Option<String>,
}

/// Literal match against the two loopback addresses. IPv4-mapped peers are
/// compared in their IPv4 form.
pub fn is_loopback_peer(ip: IpAddr) -> bool {
    let ip = ip.to_canonical();
    ip == IpAddr::V4(Ipv4Addr::LOCALHOST) || ip == IpAddr::V6(Ipv6Addr::LOCALHOST)
}

/// Handler for the `/` endpoint.
#[instrument(skip(state, params), fields(tag = tracing::field::Empty))]
pub async fn query_handler(
    State(state): State<SharedState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(params): Query<QueryParams>,
) -> Response {
    state.health_stats.record_http_request();

    let tag = params.c.unwrap_or_default();
    tracing::Span::current().record("tag", tag.as_str());
    debug!("Processing query from {}", peer);

    let response = match tag.as_str() {
        "gsd" => provider_set(&state, ProviderFamily::Stakepool).await,
        "vsp" => provider_set(&state, ProviderFamily::Vsp).await,
        "gcs" => aggregate(aggregates::coin_supply(&state).await),
        "price" => aggregate(aggregates::price(&state).await),
        "dc" => match aggregates::download_count(&state).await {
            Ok(count) => json(
                StatusCode::OK,
                &["DownloadsCount".to_string(), format_thousands(count)],
            ),
            Err(e) => json_error(&e.to_string()),
        },
        "dic" => match aggregates::download_badge(&state).await {
            Ok(body) => svg(body),
            Err(e) => json_error(&e.to_string()),
        },
        "cc" => clear_cache(&state, peer).await,
        _ => StatusCode::NOT_FOUND.into_response(),
    };

    let label = if KNOWN_TAGS.contains(&tag.as_str()) {
        tag.as_str()
    } else {
        "unknown"
    };
    state
        .metrics
        .http_requests_total
        .with_label_values(&[label, response.status().as_str()])
        .inc();

    response
}

fn aggregate<T: Serialize>(result: Result<T, AggregateError>) -> Response {
    match result {
        Ok(value) => json(StatusCode::OK, &value),
        Err(e) => json_error(&e.to_string()),
    }
}

async fn provider_set(state: &SharedState, family: ProviderFamily) -> Response {
    let records = state.store.snapshot_all().await;
    let set = ProviderSet::build(&state.providers, &records, family, &mut rand::thread_rng());
    json(StatusCode::OK, &set)
}

async fn clear_cache(state: &SharedState, peer: SocketAddr) -> Response {
    if !is_loopback_peer(peer.ip()) {
        warn!("Rejected cache clear from {}", peer);
        return json(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({ "response": "unauthorized" }),
        );
    }

    aggregates::clear(state).await;
    json(
        StatusCode::OK,
        &serde_json::json!({ "response": "cache cleared" }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_is_literal() {
        assert!(is_loopback_peer("127.0.0.1".parse().unwrap()));
        assert!(is_loopback_peer("::1".parse().unwrap()));
        assert!(!is_loopback_peer("127.0.0.2".parse().unwrap()));
        assert!(is_loopback_peer("::ffff:127.0.0.1".parse().unwrap()));
        assert!(!is_loopback_peer("::ffff:127.0.0.2".parse().unwrap()));
        assert!(!is_loopback_peer("10.0.0.1".parse().unwrap()));
    }
}
