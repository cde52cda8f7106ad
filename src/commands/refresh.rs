//! Refresh command implementation.
//!
//! Runs a single refresh cycle against the configured providers and prints
//! the resulting snapshot as JSON.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::Config;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::refresher::refresh_all;
use crate::state::AppState;

/// Runs one cycle with `fetcher` and returns the pretty-printed snapshot.
pub async fn refresh_snapshot(
    config: Config,
    fetcher: Arc<dyn Fetcher>,
    provider: Option<&str>,
) -> anyhow::Result<String> {
    if let Some(id) = provider {
        if !config.providers.iter().any(|p| p.id == id) {
            anyhow::bail!("Unknown provider '{}'", id);
        }
    }

    let state = AppState::new(config, fetcher)?.shared();
    let reports = refresh_all(&state).await;

    let mut failures = BTreeMap::new();
    for report in &reports {
        if let Err(e) = &report.result {
            failures.insert(report.id.clone(), e.to_string());
        }
    }

    let mut records = state.store.snapshot_all().await;
    if let Some(id) = provider {
        records.retain(|key, _| key == id);
        failures.retain(|key, _| key == id);
    }

    let output = serde_json::json!({
        "records": records,
        "failures": failures,
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

pub async fn command_refresh(config: Config, provider: Option<String>) -> anyhow::Result<()> {
    let fetcher = HttpFetcher::new(
        &config.user_agent(),
        config.max_idle_per_host.unwrap_or(crate::config::DEFAULT_MAX_IDLE_PER_HOST),
    )?;
    let snapshot = refresh_snapshot(config, Arc::new(fetcher), provider.as_deref()).await?;
    println!("{}", snapshot);
    Ok(())
}
