//! Periodic refresh of provider records.
//!
//! One cycle fans out a unit of work per provider instance, waits for every
//! unit to resolve and never lets one instance's failure reach another. A
//! unit walks its family's attempt strategies in order and only the first
//! fully decoded record is written to the store.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{FetchError, ProviderError};
use crate::provider::{ApiAttempt, ProviderInstance, ProviderRecord};
use crate::state::SharedState;

/// Longest payload excerpt written to the log on a decode failure.
const PAYLOAD_LOG_LIMIT: usize = 512;

/// A record accepted into the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    pub attempt: ApiAttempt,
    /// Index of `attempt` in the family's strategy list; non-zero means a fallback was used.
    pub attempt_index: usize,
    pub last_updated: i64,
}

/// Result of refreshing one instance within a cycle.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub id: String,
    pub result: Result<Accepted, ProviderError>,
}

fn payload_preview(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(PAYLOAD_LOG_LIMIT)
        .collect()
}

/// Fetches and decodes one attempt without touching the store.
pub async fn try_attempt(
    state: &SharedState,
    instance: &ProviderInstance,
    attempt: ApiAttempt,
) -> Result<ProviderRecord, ProviderError> {
    let url = attempt.url(&instance.url);
    let timeout = state.config.provider_timeout();

    debug!("Fetching {} ({}) from {}", instance.id, attempt, url);

    // The fetcher carries its own timeout; this bounds implementations that ignore it.
    let body = match tokio::time::timeout(timeout, state.fetcher.fetch(&url, timeout)).await {
        Ok(result) => result?,
        Err(_) => return Err(FetchError::Timeout { url }.into()),
    };

    attempt.decode(&body).map_err(|source| {
        warn!(
            "Decode failed for {} at {}: {} (payload: {})",
            instance.id,
            url,
            source,
            payload_preview(&body)
        );
        ProviderError::Decode { url, source }
    })
}

/// Refreshes a single instance, trying each attempt strategy in order.
#[instrument(skip(state, instance), fields(provider = %instance.id))]
pub async fn refresh_instance(
    state: &SharedState,
    instance: &ProviderInstance,
) -> Result<Accepted, ProviderError> {
    let attempts = instance.family.attempts();
    let mut last_error = None;

    for (index, attempt) in attempts.iter().enumerate() {
        match try_attempt(state, instance, *attempt).await {
            Ok(record) => {
                let last_updated = state.store.put(&instance.id, record).await?;

                let outcome = if index == 0 { "success" } else { "fallback" };
                if index > 0 {
                    state.health_stats.record_fallback_success();
                    info!("{} refreshed via fallback {}", instance.id, attempt);
                } else {
                    debug!("{} refreshed via {}", instance.id, attempt);
                }
                state
                    .metrics
                    .provider_refresh_total
                    .with_label_values(&[instance.id.as_str(), outcome])
                    .inc();
                let network = instance.network.to_string();
                state
                    .metrics
                    .provider_last_updated_seconds
                    .with_label_values(&[instance.id.as_str(), network.as_str()])
                    .set(last_updated as f64);

                return Ok(Accepted {
                    attempt: *attempt,
                    attempt_index: index,
                    last_updated,
                });
            }
            Err(e) => {
                state.health_stats.record_failed_attempt();
                if index + 1 < attempts.len() {
                    warn!(
                        "{} attempt {} failed, falling back: {}",
                        instance.id, attempt, e
                    );
                }
                last_error = Some(e);
            }
        }
    }

    state.health_stats.record_exhausted_provider();
    state
        .metrics
        .provider_refresh_total
        .with_label_values(&[instance.id.as_str(), "failure"])
        .inc();

    let last = last_error.unwrap_or_else(|| {
        FetchError::Transport {
            url: instance.url.clone(),
            message: "no attempt strategies configured".into(),
        }
        .into()
    });
    error!("{} failed after {} attempts: {}", instance.id, attempts.len(), last);

    Err(ProviderError::Exhausted {
        attempts: attempts.len(),
        last: Box::new(last),
    })
}

/// Runs one full cycle over every configured instance.
///
/// Returns after every unit has resolved. Reports are sorted by provider id.
#[instrument(skip(state), fields(providers = state.providers.len()))]
pub async fn refresh_all(state: &SharedState) -> Vec<RefreshReport> {
    let start = Instant::now();
    state.metrics.refresh_in_progress.set(1.0);
    info!("Starting refresh cycle for {} providers", state.providers.len());

    let mut tasks = JoinSet::new();
    for instance in state.providers.iter().cloned() {
        let state = Arc::clone(state);
        tasks.spawn(async move {
            let result = refresh_instance(&state, &instance).await;
            RefreshReport {
                id: instance.id,
                result,
            }
        });
    }

    let mut reports = Vec::with_capacity(state.providers.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(report) => reports.push(report),
            Err(e) => error!("Refresh task did not complete: {}", e),
        }
    }
    reports.sort_by(|a, b| a.id.cmp(&b.id));

    let refreshed = reports.iter().filter(|r| r.result.is_ok()).count();
    let elapsed = start.elapsed().as_secs_f64();

    state.metrics.refresh_in_progress.set(0.0);
    state.metrics.refresh_cycles_total.inc();
    state.metrics.refresh_cycle_duration_seconds.set(elapsed);
    state.health_stats.record_cycle(refreshed as u64, elapsed);

    info!(
        "Refresh cycle completed in {:.3}s: {}/{} providers refreshed",
        elapsed,
        refreshed,
        reports.len()
    );
    reports
}

/// Repeats [`refresh_all`] every `period` until `shutdown` flips to `true`.
///
/// The first tick is consumed immediately because the caller runs the
/// initial cycle itself before serving requests. A cycle that has started
/// always runs to completion.
pub async fn run_refresh_loop(
    state: SharedState,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    info!("Refresh loop started (period {}s)", period.as_secs());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                refresh_all(&state).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("Refresh loop stopped");
}
