//! Lazily computed aggregate values with their own expiry.
//!
//! Each accessor returns the cached value while it is valid and otherwise
//! performs exactly one fetch-then-cache. Nothing here is refreshed eagerly.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::adapters::price::{self, Price};
use crate::adapters::releases::{decode_download_total, format_thousands};
use crate::adapters::supply::{self, CoinSupply};
use crate::error::{AggregateError, DecodeError, FetchError, StoreError};
use crate::state::AppState;
use crate::store::{CacheKey, CachedValue};

/// Download badge; `__COUNT__` is replaced by the formatted download total.
pub const BADGE_TEMPLATE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="128" height="20"><linearGradient id="b" x2="0" y2="100%"><stop offset="0" stop-color="#bbb" stop-opacity=".1"/><stop offset="1" stop-opacity=".1"/></linearGradient><mask id="a"><rect width="128" height="20" rx="3" fill="#fff"/></mask><g mask="url(#a)"><path fill="#555" d="M0 0h69v20H0z"/><path fill="#4c1" d="M69 0h59v20H69z"/><path fill="url(#b)" d="M0 0h128v20H0z"/></g><g fill="#fff" text-anchor="middle" font-family="DejaVu Sans,Verdana,Geneva,sans-serif" font-size="11"><text x="34.5" y="15" fill="#010101" fill-opacity=".3">downloads</text><text x="34.5" y="14">downloads</text><text x="97.5" y="15" fill="#010101" fill-opacity=".3">__COUNT__ total</text><text x="97.5" y="14">__COUNT__ total</text></g></svg>"##;

pub fn render_badge(count: u64) -> String {
    BADGE_TEMPLATE.replace("__COUNT__", &format_thousands(count))
}

fn expiry_after(now: DateTime<Utc>, ttl_secs: u64) -> DateTime<Utc> {
    i64::try_from(ttl_secs)
        .ok()
        .and_then(ChronoDuration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn count_source(state: &AppState, key: CacheKey, source: &str) {
    state
        .metrics
        .aggregate_requests_total
        .with_label_values(&[key.as_str(), source])
        .inc();
}

async fn lookup(state: &AppState, key: CacheKey) -> Option<CachedValue> {
    let value = state.store.get_if_valid(key).await;
    if value.is_some() {
        state.health_stats.record_aggregate_hit();
        count_source(state, key, "cache");
        debug!("Serving {} from cache", key.as_str());
    } else {
        state.health_stats.record_aggregate_miss();
    }
    value
}

fn failed(state: &AppState, key: CacheKey, err: AggregateError) -> AggregateError {
    state.health_stats.record_aggregate_error();
    count_source(state, key, "error");
    error!("Failed to refresh {} aggregate: {}", key.as_str(), err);
    err
}

fn unexpected(state: &AppState, key: CacheKey, expected: &'static str) -> AggregateError {
    failed(
        state,
        key,
        StoreError::UnexpectedType {
            key: key.as_str(),
            expected,
        }
        .into(),
    )
}

async fn fetch_body(
    state: &AppState,
    key: CacheKey,
    url: &str,
    timeout: Duration,
) -> Result<Vec<u8>, AggregateError> {
    let result = match tokio::time::timeout(timeout, state.fetcher.fetch(url, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            url: url.to_string(),
        }),
    };
    result.map_err(|e| failed(state, key, e.into()))
}

fn decode_failed(state: &AppState, key: CacheKey, url: &str, source: DecodeError) -> AggregateError {
    failed(
        state,
        key,
        AggregateError::Decode {
            url: url.to_string(),
            source,
        },
    )
}

async fn remember(state: &AppState, key: CacheKey, value: CachedValue, ttl_secs: u64) {
    let expiry = expiry_after(Utc::now(), ttl_secs);
    state.store.set(key, value, expiry).await;
    count_source(state, key, "fetch");
    debug!("Cached {} until {}", key.as_str(), expiry);
}

/// Coin supply breakdown (`gcs`).
#[instrument(skip(state))]
pub async fn coin_supply(state: &AppState) -> Result<CoinSupply, AggregateError> {
    let key = CacheKey::CoinSupply;
    if let Some(value) = lookup(state, key).await {
        return match value {
            CachedValue::CoinSupply(supply) => Ok(supply),
            _ => Err(unexpected(state, key, "coin supply")),
        };
    }

    let cfg = &state.config.supply;
    let body = fetch_body(state, key, &cfg.url, state.config.aggregate_timeout()).await?;
    let supply = supply::decode(&body, &cfg.params())
        .map_err(|source| decode_failed(state, key, &cfg.url, source))?;

    remember(state, key, CachedValue::CoinSupply(supply.clone()), cfg.ttl_secs).await;
    Ok(supply)
}

/// Exchange rate (`price`).
#[instrument(skip(state))]
pub async fn price(state: &AppState) -> Result<Price, AggregateError> {
    let key = CacheKey::Price;
    if let Some(value) = lookup(state, key).await {
        return match value {
            CachedValue::Price(price) => Ok(price),
            _ => Err(unexpected(state, key, "price")),
        };
    }

    let cfg = &state.config.price;
    let body = fetch_body(state, key, &cfg.url, state.config.aggregate_timeout()).await?;
    let price = price::decode(&body, &cfg.coin)
        .map_err(|source| decode_failed(state, key, &cfg.url, source))?;

    remember(state, key, CachedValue::Price(price.clone()), cfg.ttl_secs).await;
    Ok(price)
}

/// Total asset downloads over every configured repository (`dc`).
#[instrument(skip(state))]
pub async fn download_count(state: &AppState) -> Result<u64, AggregateError> {
    let key = CacheKey::DownloadCount;
    if let Some(value) = lookup(state, key).await {
        return match value {
            CachedValue::DownloadCount(count) => Ok(count),
            _ => Err(unexpected(state, key, "download count")),
        };
    }

    let cfg = &state.config.downloads;
    let timeout = state.config.release_timeout();
    let mut total = 0u64;
    for url in cfg.release_urls() {
        let body = fetch_body(state, key, &url, timeout).await?;
        let count =
            decode_download_total(&body).map_err(|source| decode_failed(state, key, &url, source))?;
        total = total.saturating_add(count);
    }

    remember(state, key, CachedValue::DownloadCount(total), cfg.ttl_secs).await;
    Ok(total)
}

/// Rendered SVG download badge (`dic`).
///
/// A still-valid cached download count is reused before any fetch.
#[instrument(skip(state))]
pub async fn download_badge(state: &AppState) -> Result<String, AggregateError> {
    let key = CacheKey::DownloadBadge;
    if let Some(value) = lookup(state, key).await {
        return match value {
            CachedValue::Badge(svg) => Ok(svg),
            _ => Err(unexpected(state, key, "badge")),
        };
    }

    let count = download_count(state).await?;
    let svg = render_badge(count);

    remember(
        state,
        key,
        CachedValue::Badge(svg.clone()),
        state.config.downloads.ttl_secs,
    )
    .await;
    Ok(svg)
}

/// Drops every cached aggregate (`cc`). Returns the number of entries removed.
pub async fn clear(state: &AppState) -> usize {
    let cleared = state.store.clear_cache().await;
    state.health_stats.record_cache_clear();
    debug!("Cleared {} cached aggregates", cleared);
    cleared
}
