//! Integration tests for health stats module.
//!
//! These tests verify that HealthStats tracks refresh cycles, aggregate
//! cache behaviour and HTTP requests correctly when updated concurrently.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use vsp_aggregator::health_stats::HealthStats;

#[test]
fn test_health_stats_initialize_empty() {
    let stats = HealthStats::new();

    let (cur, avg, max, min, count) = stats.cycle_duration_seconds.snapshot();
    assert_eq!(count, 0);
    assert_eq!((cur, avg, max, min), (0.0, 0.0, 0.0, 0.0));

    assert_eq!(stats.cycles_total.load(Ordering::Relaxed), 0);
    assert_eq!(stats.failed_attempts.load(Ordering::Relaxed), 0);
    assert_eq!(stats.http_request_timestamps.count_last_minute(), 0);
    assert!(stats.seconds_since_last_cycle().is_none());
}

#[test]
fn test_cycle_statistics() {
    let stats = HealthStats::new();
    stats.record_cycle(10, 1.0);
    stats.record_cycle(6, 3.0);

    let (cur, avg, max, min, count) = stats.cycle_duration_seconds.snapshot();
    assert_eq!(count, 2);
    assert_eq!(cur, 3.0);
    assert_eq!(avg, 2.0);
    assert_eq!(max, 3.0);
    assert_eq!(min, 1.0);

    let (cur, _, max, min, _) = stats.providers_refreshed.snapshot();
    assert_eq!((cur, max, min), (6.0, 10.0, 6.0));
    assert_eq!(stats.cycles_total.load(Ordering::Relaxed), 2);
}

#[test]
fn test_render_table_contains_sections() {
    let stats = HealthStats::new();
    stats.record_cycle(3, 0.5);
    stats.record_failed_attempt();
    stats.record_aggregate_hit();
    stats.record_aggregate_miss();
    stats.record_cache_clear();

    let table = stats.render_table();
    for section in ["REFRESH CYCLES", "AGGREGATE CACHE", "HTTP SERVER"] {
        assert!(table.contains(section), "missing section {}", section);
    }
    assert!(table.contains("hit_ratio (%)"));
    assert!(table.contains("50.0"));
}

#[test]
fn test_thread_safety_of_counters() {
    let stats = Arc::new(HealthStats::new());
    let mut handles = vec![];

    // Spawn multiple threads to update stats concurrently
    for i in 0..10 {
        let stats_clone = Arc::clone(&stats);
        let handle = thread::spawn(move || {
            stats_clone.record_cycle(i, 0.1 * i as f64);
            stats_clone.record_failed_attempt();
            stats_clone.record_exhausted_provider();
            stats_clone.record_aggregate_error();
            stats_clone.record_http_request();
        });
        handles.push(handle);
    }

    // Wait for all threads to complete
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(stats.cycles_total.load(Ordering::Relaxed), 10);
    assert_eq!(stats.failed_attempts.load(Ordering::Relaxed), 10);
    assert_eq!(stats.exhausted_providers.load(Ordering::Relaxed), 10);
    assert_eq!(stats.aggregate_errors.load(Ordering::Relaxed), 10);
    assert_eq!(stats.http_requests_total.load(Ordering::Relaxed), 10);
    assert_eq!(stats.http_request_timestamps.count_last_minute(), 10);

    let (_, _, max, min, count) = stats.providers_refreshed.snapshot();
    assert_eq!(count, 10);
    assert_eq!(max, 9.0);
    assert_eq!(min, 0.0);
}
