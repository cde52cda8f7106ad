//! Application state management for the aggregator.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers and used by the background refresh task.

use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::fetcher::Fetcher;
use crate::health_stats::HealthStats;
use crate::metrics::AggregatorMetrics;
use crate::provider::ProviderInstance;
use crate::store::Store;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Service context shared across requests and background tasks.
pub struct AppState {
    pub config: Arc<Config>,
    /// Provider identities, fixed for the lifetime of the process.
    pub providers: Arc<Vec<ProviderInstance>>,
    pub store: Store,
    pub fetcher: Arc<dyn Fetcher>,
    pub registry: Registry,
    pub metrics: AggregatorMetrics,
    pub health_stats: Arc<HealthStats>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Builds the context from an already validated config.
    pub fn new(config: Config, fetcher: Arc<dyn Fetcher>) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let metrics = AggregatorMetrics::new(&registry)?;
        let providers = config.provider_instances();
        let store = Store::new(&providers);

        Ok(Self {
            config: Arc::new(config),
            providers: Arc::new(providers),
            store,
            fetcher,
            registry,
            metrics,
            health_stats: Arc::new(HealthStats::new()),
            start_time: Instant::now(),
        })
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }

    pub fn provider(&self, id: &str) -> Option<&ProviderInstance> {
        self.providers.iter().find(|p| p.id == id)
    }
}
