//! Prometheus metrics definitions for vsp-aggregator.
//!
//! Refresh outcomes are labelled per provider so a single misbehaving
//! endpoint is visible without reading logs.

use prometheus::{Counter, CounterVec, Gauge, GaugeVec, Opts, Registry};

/// Collection of Prometheus metrics exposed on `/metrics`.
#[derive(Clone)]
pub struct AggregatorMetrics {
    // ========== Refresh Cycle ==========
    pub refresh_cycles_total: Counter,
    pub refresh_cycle_duration_seconds: Gauge,
    pub refresh_in_progress: Gauge,

    // ========== Per Provider ==========
    pub provider_refresh_total: CounterVec, // labels: provider, outcome
    pub provider_last_updated_seconds: GaugeVec, // labels: provider, network

    // ========== Aggregates ==========
    pub aggregate_requests_total: CounterVec, // labels: key, source

    // ========== HTTP ==========
    pub http_requests_total: CounterVec, // labels: tag, status
}

impl AggregatorMetrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let refresh_cycles_total = Counter::new(
            "vsp_aggregator_refresh_cycles_total",
            "Completed provider refresh cycles",
        )?;
        let refresh_cycle_duration_seconds = Gauge::new(
            "vsp_aggregator_refresh_cycle_duration_seconds",
            "Wall-clock duration of the last refresh cycle",
        )?;
        let refresh_in_progress = Gauge::new(
            "vsp_aggregator_refresh_in_progress",
            "Whether a refresh cycle is currently running (1) or idle (0)",
        )?;
        let provider_refresh_total = CounterVec::new(
            Opts::new(
                "vsp_aggregator_provider_refresh_total",
                "Provider refresh results by outcome (success, fallback, failure)",
            ),
            &["provider", "outcome"],
        )?;
        let provider_last_updated_seconds = GaugeVec::new(
            Opts::new(
                "vsp_aggregator_provider_last_updated_seconds",
                "Unix time of the last accepted record per provider",
            ),
            &["provider", "network"],
        )?;
        let aggregate_requests_total = CounterVec::new(
            Opts::new(
                "vsp_aggregator_aggregate_requests_total",
                "Aggregate lookups by cache key and source (cache, fetch, error)",
            ),
            &["key", "source"],
        )?;
        let http_requests_total = CounterVec::new(
            Opts::new(
                "vsp_aggregator_http_requests_total",
                "Query endpoint requests by tag and HTTP status",
            ),
            &["tag", "status"],
        )?;

        registry.register(Box::new(refresh_cycles_total.clone()))?;
        registry.register(Box::new(refresh_cycle_duration_seconds.clone()))?;
        registry.register(Box::new(refresh_in_progress.clone()))?;
        registry.register(Box::new(provider_refresh_total.clone()))?;
        registry.register(Box::new(provider_last_updated_seconds.clone()))?;
        registry.register(Box::new(aggregate_requests_total.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;

        Ok(Self {
            refresh_cycles_total,
            refresh_cycle_duration_seconds,
            refresh_in_progress,
            provider_refresh_total,
            provider_last_updated_seconds,
            aggregate_requests_total,
            http_requests_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, TextEncoder};

    #[test]
    fn test_metrics_register_once() {
        let registry = Registry::new();
        let metrics = AggregatorMetrics::new(&registry).unwrap();
        metrics
            .provider_refresh_total
            .with_label_values(&["Delta", "success"])
            .inc();
        metrics.refresh_cycles_total.inc();

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("vsp_aggregator_refresh_cycles_total 1"));
        assert!(text.contains("# TYPE vsp_aggregator_provider_refresh_total counter"));

        // A second registration of the same names must fail.
        assert!(AggregatorMetrics::new(&registry).is_err());
    }
}
