//! Health statistics for the aggregator.
//!
//! This module provides types for tracking refresh-cycle performance,
//! aggregate cache behaviour, and HTTP request volume. All counters are
//! lock-free or guarded by short-lived mutexes so they can be updated from
//! refresh tasks and request handlers alike.

use std::collections::VecDeque;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock as StdRwLock};
use std::time::{Duration, Instant};

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns `(last, avg, max, min, count)`.
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Sliding window of HTTP request timestamps.
pub struct RequestTimestamps {
    inner: Mutex<VecDeque<Instant>>,
}

impl Default for RequestTimestamps {
    fn default() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(1024)),
        }
    }
}

impl RequestTimestamps {
    pub fn record(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            let now = Instant::now();
            guard.push_back(now);
            // Keep only the last 10 minutes
            while guard
                .front()
                .is_some_and(|&t| now.duration_since(t) > Duration::from_secs(600))
            {
                guard.pop_front();
            }
        }
    }

    pub fn count_last_minute(&self) -> u64 {
        if let Ok(guard) = self.inner.lock() {
            guard
                .iter()
                .filter(|t| t.elapsed() <= Duration::from_secs(60))
                .count() as u64
        } else {
            0
        }
    }
}

/// Health statistics shared by the refresh loop and the HTTP handlers.
pub struct HealthStats {
    // Refresh cycles
    pub cycle_duration_seconds: Stat,
    pub providers_refreshed: Stat,
    pub cycles_total: AtomicU64,
    pub failed_attempts: AtomicU64,
    pub exhausted_providers: AtomicU64,
    pub fallback_successes: AtomicU64,

    // Aggregate cache
    pub aggregate_hits: AtomicU64,
    pub aggregate_misses: AtomicU64,
    pub aggregate_errors: AtomicU64,
    pub cache_clears: AtomicU64,

    // HTTP server
    pub http_request_timestamps: RequestTimestamps,
    pub http_requests_total: AtomicU64,

    // Timing
    pub start_time: Instant,
    pub last_cycle_time: StdRwLock<Option<Instant>>,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            cycle_duration_seconds: Stat::default(),
            providers_refreshed: Stat::default(),
            cycles_total: AtomicU64::new(0),
            failed_attempts: AtomicU64::new(0),
            exhausted_providers: AtomicU64::new(0),
            fallback_successes: AtomicU64::new(0),
            aggregate_hits: AtomicU64::new(0),
            aggregate_misses: AtomicU64::new(0),
            aggregate_errors: AtomicU64::new(0),
            cache_clears: AtomicU64::new(0),
            http_request_timestamps: RequestTimestamps::default(),
            http_requests_total: AtomicU64::new(0),
            start_time: Instant::now(),
            last_cycle_time: StdRwLock::new(None),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_cycle(&self, refreshed: u64, duration_seconds: f64) {
        self.providers_refreshed.add_sample(refreshed as f64);
        self.cycle_duration_seconds.add_sample(duration_seconds);
        self.cycles_total.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut guard) = self.last_cycle_time.write() {
            *guard = Some(Instant::now());
        }
    }

    pub fn record_failed_attempt(&self) {
        self.failed_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_exhausted_provider(&self) {
        self.exhausted_providers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback_success(&self) {
        self.fallback_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_aggregate_hit(&self) {
        self.aggregate_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_aggregate_miss(&self) {
        self.aggregate_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_aggregate_error(&self) {
        self.aggregate_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_clear(&self) {
        self.cache_clears.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_http_request(&self) {
        self.http_request_timestamps.record();
        self.http_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Seconds since the last completed refresh cycle.
    pub fn seconds_since_last_cycle(&self) -> Option<u64> {
        self.last_cycle_time
            .read()
            .ok()
            .and_then(|guard| guard.map(|t| t.elapsed().as_secs()))
    }

    pub fn get_aggregate_hit_ratio(&self) -> f64 {
        let hits = self.aggregate_hits.load(Ordering::Relaxed);
        let misses = self.aggregate_misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            100.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    pub fn render_table(&self) -> String {
        let (cd_cur, cd_avg, cd_max, cd_min, _) = self.cycle_duration_seconds.snapshot();
        let (pr_cur, pr_avg, pr_max, pr_min, _) = self.providers_refreshed.snapshot();

        let left_col = 28;
        let col_w = 10;
        let mut out = String::new();

        let row = |out: &mut String, name: &str, cells: [String; 4]| {
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                name,
                cells[0],
                cells[1],
                cells[2],
                cells[3],
                left = left_col,
                col = col_w
            )
            .ok();
        };
        let single = |value: String| [value, "N/A".into(), "N/A".into(), "N/A".into()];

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "metric",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();
        writeln!(out, "{}", "-".repeat(left_col + 4 * (col_w + 3))).ok();

        writeln!(out).ok();
        writeln!(out, "REFRESH CYCLES").ok();
        writeln!(out, "--------------").ok();
        row(
            &mut out,
            "cycle_duration (s)",
            [
                format!("{:.3}", cd_cur),
                format!("{:.3}", cd_avg),
                format!("{:.3}", cd_max),
                format!("{:.3}", cd_min),
            ],
        );
        row(
            &mut out,
            "providers_refreshed",
            [
                format!("{:.0}", pr_cur),
                format!("{:.1}", pr_avg),
                format!("{:.0}", pr_max),
                format!("{:.0}", pr_min),
            ],
        );
        row(
            &mut out,
            "cycles_total",
            single(self.cycles_total.load(Ordering::Relaxed).to_string()),
        );
        row(
            &mut out,
            "failed_attempts",
            single(self.failed_attempts.load(Ordering::Relaxed).to_string()),
        );
        row(
            &mut out,
            "exhausted_providers",
            single(self.exhausted_providers.load(Ordering::Relaxed).to_string()),
        );
        row(
            &mut out,
            "fallback_successes",
            single(self.fallback_successes.load(Ordering::Relaxed).to_string()),
        );

        writeln!(out).ok();
        writeln!(out, "AGGREGATE CACHE").ok();
        writeln!(out, "---------------").ok();
        row(
            &mut out,
            "hit_ratio (%)",
            single(format!("{:.1}", self.get_aggregate_hit_ratio())),
        );
        row(
            &mut out,
            "fetch_errors",
            single(self.aggregate_errors.load(Ordering::Relaxed).to_string()),
        );
        row(
            &mut out,
            "cache_clears",
            single(self.cache_clears.load(Ordering::Relaxed).to_string()),
        );

        writeln!(out).ok();
        writeln!(out, "HTTP SERVER").ok();
        writeln!(out, "-----------").ok();
        row(
            &mut out,
            "http_requests_last_minute",
            single(self.http_request_timestamps.count_last_minute().to_string()),
        );
        row(
            &mut out,
            "http_requests_total",
            single(self.http_requests_total.load(Ordering::Relaxed).to_string()),
        );

        out
    }
}
