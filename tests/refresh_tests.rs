//! Integration tests for the refresh cycle: partial failure, stale reads,
//! version fallback and the background loop.

mod common;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use common::*;
use vsp_aggregator::adapters::stakepool::StakepoolStats;
use vsp_aggregator::commands::refresh::refresh_snapshot;
use vsp_aggregator::error::{DecodeError, FetchError, ProviderError};
use vsp_aggregator::provider::{ProviderFamily, ProviderInstance, ProviderRecord};
use vsp_aggregator::refresher::{refresh_all, run_refresh_loop};
use vsp_aggregator::store::Store;

const ALPHA_V2: &str = "https://alpha.test/api/v2/stats";
const ALPHA_V1: &str = "https://alpha.test/api/v1/stats";
const BRAVO_V2: &str = "https://bravo.test/api/v2/stats";
const BRAVO_V1: &str = "https://bravo.test/api/v1/stats";

fn two_pools() -> vsp_aggregator::config::Config {
    config_with(vec![
        stakepool("Alpha", "https://alpha.test"),
        stakepool("Bravo", "https://bravo.test/"),
    ])
}

fn live_of(record: &ProviderRecord) -> u64 {
    match record {
        ProviderRecord::Stakepool(stats) => stats.live,
        other => panic!("unexpected record {:?}", other),
    }
}

#[tokio::test]
async fn test_partial_failure_keeps_default_record() {
    let fetcher = MockFetcher::new();
    fetcher.body(ALPHA_V2, &stakepool_stats_body(42));
    fetcher.reply(BRAVO_V2, Reply::Status(500));
    fetcher.reply(BRAVO_V1, Reply::Status(500));
    let state = state_with(two_pools(), fetcher.clone());

    let logs = LogCapture::default();
    let reports = {
        let _guard = logs.install();
        refresh_all(&state).await
    };
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].id, "Alpha");
    assert!(reports[0].result.is_ok());
    assert_eq!(
        reports[1].result,
        Err(ProviderError::Exhausted {
            attempts: 2,
            last: Box::new(ProviderError::Fetch(FetchError::Remote {
                url: BRAVO_V1.into(),
                status: 500,
            })),
        })
    );

    let snapshot = state.store.snapshot_all().await;
    let alpha = &snapshot["Alpha"];
    assert_eq!(live_of(alpha), 42);
    assert!(alpha.last_updated() > 0);
    match alpha {
        ProviderRecord::Stakepool(stats) => {
            assert!(stats.api_enabled);
            assert_eq!(stats.user_count_active, 150);
            assert_eq!(stats.version, "1.4.0-pre+dev");
        }
        other => panic!("unexpected record {:?}", other),
    }
    assert_eq!(snapshot["Bravo"], ProviderFamily::Stakepool.default_record());

    let output = logs.contents();
    assert!(
        output
            .lines()
            .any(|l| l.contains("ERROR") && l.contains("Bravo failed after 2 attempts")),
        "no error logged for Bravo:\n{}",
        output
    );
    assert!(!output
        .lines()
        .any(|l| l.contains("ERROR") && l.contains("Alpha")));

    // Alpha succeeded on the first attempt and never touched v1.
    assert_eq!(fetcher.calls_to(ALPHA_V1), 0);
    assert_eq!(fetcher.calls_to(BRAVO_V1), 1);
}

#[tokio::test]
async fn test_failed_cycle_leaves_record_unchanged() {
    let fetcher = MockFetcher::new();
    fetcher.body(ALPHA_V2, &stakepool_stats_body(10));
    let state = state_with(config_with(vec![stakepool("Alpha", "https://alpha.test")]), fetcher.clone());

    refresh_all(&state).await;
    let before = state.store.get("Alpha").await.unwrap();

    fetcher.reply(ALPHA_V2, Reply::Transport);
    fetcher.reply(ALPHA_V1, Reply::Status(503));
    let reports = refresh_all(&state).await;
    assert!(reports[0].result.is_err());

    let after = state.store.get("Alpha").await.unwrap();
    assert_eq!(before, after);
    assert_eq!(
        serde_json::to_vec(&before).unwrap(),
        serde_json::to_vec(&after).unwrap()
    );
}

#[tokio::test]
async fn test_last_updated_strictly_increases() {
    let fetcher = MockFetcher::new();
    fetcher.body(ALPHA_V2, &stakepool_stats_body(1));
    let state = state_with(config_with(vec![stakepool("Alpha", "https://alpha.test")]), fetcher.clone());

    let mut previous = 0;
    for live in 1..=3 {
        fetcher.body(ALPHA_V2, &stakepool_stats_body(live));
        let reports = refresh_all(&state).await;
        let accepted = reports[0].result.clone().unwrap();
        assert!(accepted.last_updated > previous);
        previous = accepted.last_updated;

        let record = state.store.get("Alpha").await.unwrap();
        assert_eq!(record.last_updated(), accepted.last_updated);
        assert_eq!(live_of(&record), live);
    }
}

#[tokio::test]
async fn test_falls_back_to_initial_api_version() {
    let fetcher = MockFetcher::new();
    fetcher.reply(ALPHA_V2, Reply::Status(404));
    fetcher.body(ALPHA_V1, &stakepool_stats_body(77));
    let state = state_with(config_with(vec![stakepool("Alpha", "https://alpha.test")]), fetcher.clone());

    let reports = refresh_all(&state).await;
    let accepted = reports[0].result.clone().unwrap();
    assert_eq!(accepted.attempt_index, 1);
    assert_eq!(accepted.attempt.to_string(), "stakepool v1");
    assert_eq!(live_of(&state.store.get("Alpha").await.unwrap()), 77);
    assert_eq!(fetcher.calls_to(ALPHA_V2), 1);
    assert_eq!(fetcher.calls_to(ALPHA_V1), 1);

    let stats = &state.health_stats;
    assert_eq!(stats.fallback_successes.load(std::sync::atomic::Ordering::Relaxed), 1);
    assert_eq!(stats.failed_attempts.load(std::sync::atomic::Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_missing_required_field_is_rejected() {
    let fetcher = MockFetcher::new();
    fetcher.body(ALPHA_V2, &stakepool_stats_missing_field());
    fetcher.body(ALPHA_V1, &stakepool_stats_missing_field());
    let state = state_with(config_with(vec![stakepool("Alpha", "https://alpha.test")]), fetcher);

    let reports = refresh_all(&state).await;
    match &reports[0].result {
        Err(ProviderError::Exhausted { attempts, last }) => {
            assert_eq!(*attempts, 2);
            assert_eq!(
                **last,
                ProviderError::Decode {
                    url: ALPHA_V1.into(),
                    source: DecodeError::MissingFields {
                        keys: vec!["UserCountActive".into()]
                    },
                }
            );
        }
        other => panic!("expected exhausted attempts, got {:?}", other),
    }

    assert_eq!(
        state.store.get("Alpha").await.unwrap(),
        ProviderFamily::Stakepool.default_record()
    );
}

#[tokio::test]
async fn test_vsp_record_is_normalized() {
    let fetcher = MockFetcher::new();
    fetcher.body("https://vsp.test/api/v3/vspinfo", &vspinfo_body(321));
    let state = state_with(config_with(vec![vsp("Vee", "https://vsp.test")]), fetcher);

    let reports = refresh_all(&state).await;
    assert!(reports[0].result.is_ok());

    match state.store.get("Vee").await.unwrap() {
        ProviderRecord::Vsp(stats) => {
            assert_eq!(stats.voting, 321);
            assert_eq!(stats.vspdversion, "1.2.0-pre+abc");
            assert_eq!(stats.estimatednetworkproportion, 0.1235);
            assert!(!stats.closed);
            assert!(stats.lastupdated > 0);
        }
        other => panic!("unexpected record {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_provider_times_out_without_blocking_others() {
    let fetcher = MockFetcher::new();
    fetcher.body(ALPHA_V2, &stakepool_stats_body(5));
    fetcher.reply(BRAVO_V2, Reply::Slow(Duration::from_secs(5), stakepool_stats_body(6)));
    fetcher.reply(BRAVO_V1, Reply::Status(500));
    let state = state_with(two_pools(), fetcher);

    let started = std::time::Instant::now();
    let reports = refresh_all(&state).await;
    assert!(started.elapsed() < Duration::from_secs(4));

    assert!(reports[0].result.is_ok());
    match &reports[1].result {
        Err(ProviderError::Exhausted { .. }) => {}
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(
        state.store.get("Bravo").await.unwrap(),
        ProviderFamily::Stakepool.default_record()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_snapshots_never_observe_torn_records() {
    let instances = vec![ProviderInstance {
        id: "Alpha".into(),
        url: "https://alpha.test".into(),
        network: vsp_aggregator::provider::Network::Mainnet,
        family: ProviderFamily::Stakepool,
        launched: 0,
    }];
    let store = Arc::new(Store::new(&instances));

    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            for n in 1..=200u64 {
                let record = ProviderRecord::Stakepool(StakepoolStats {
                    immature: n,
                    live: n,
                    voted: n,
                    missed: n,
                    user_count: n,
                    user_count_active: n,
                    ..Default::default()
                });
                store.put("Alpha", record).await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    let snapshot = store.snapshot_all().await;
                    if let ProviderRecord::Stakepool(s) = &snapshot["Alpha"] {
                        let n = s.live;
                        assert!(
                            [s.immature, s.voted, s.missed, s.user_count, s.user_count_active]
                                .iter()
                                .all(|v| *v == n),
                            "torn record observed: {:?}",
                            s
                        );
                    }
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}

#[tokio::test]
async fn test_refresh_loop_stops_on_shutdown() {
    let fetcher = MockFetcher::new();
    fetcher.body(ALPHA_V2, &stakepool_stats_body(1));
    let state = state_with(config_with(vec![stakepool("Alpha", "https://alpha.test")]), fetcher.clone());

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(run_refresh_loop(state.clone(), Duration::from_millis(50), rx));

    tokio::time::sleep(Duration::from_millis(220)).await;
    tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("refresh loop did not stop")
        .unwrap();

    // The immediate tick is skipped, so every cycle here came from the timer.
    let cycles = state.metrics.refresh_cycles_total.get();
    assert!(cycles >= 2.0, "expected at least two cycles, got {}", cycles);

    let calls = fetcher.total_calls();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(fetcher.total_calls(), calls);
}

#[tokio::test]
async fn test_refresh_command_snapshot() {
    let fetcher = MockFetcher::new();
    fetcher.body(ALPHA_V2, &stakepool_stats_body(9));
    fetcher.reply(BRAVO_V2, Reply::Status(500));
    fetcher.reply(BRAVO_V1, Reply::Status(500));

    let output = refresh_snapshot(two_pools(), fetcher.clone(), None).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["records"]["Alpha"]["Live"], 9);
    assert_eq!(value["records"]["Bravo"]["Live"], 0);
    assert!(value["failures"]["Bravo"]
        .as_str()
        .unwrap()
        .contains("non-success status: 500"));

    let output = refresh_snapshot(two_pools(), fetcher.clone(), Some("Alpha")).await.unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert!(value["records"].get("Bravo").is_none());

    assert!(refresh_snapshot(two_pools(), fetcher, Some("Zulu")).await.is_err());
}
