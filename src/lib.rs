//! vsp-aggregator library
//!
//! Polls a fixed set of voting-service and stakepool providers, keeps the
//! latest good record of each in memory, and serves those records together
//! with lazily cached chain aggregates (coin supply, price, download count)
//! over a single multiplexed HTTP endpoint.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use vsp_aggregator::{config::Config, fetcher::HttpFetcher, refresher, state::AppState};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let fetcher = HttpFetcher::new(&config.user_agent(), 2)?;
//! let state = AppState::new(config, Arc::new(fetcher))?.shared();
//!
//! for report in refresher::refresh_all(&state).await {
//!     println!("{}: {}", report.id, report.result.is_ok());
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod aggregates;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod handlers;
pub mod health_stats;
pub mod metrics;
pub mod normalize;
pub mod provider;
pub mod refresher;
pub mod state;
pub mod store;

// Re-export main types for convenience
pub use error::{AggregateError, DecodeError, FetchError, ProviderError, StoreError};
pub use provider::{Network, ProviderFamily, ProviderInstance, ProviderRecord};
pub use state::{AppState, SharedState};
pub use store::{CacheKey, CachedValue, Store};
