//! Shared helpers for integration tests: a scripted in-memory fetcher,
//! provider fixtures and a state builder.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use vsp_aggregator::config::{Config, ProviderConfig};
use vsp_aggregator::error::FetchError;
use vsp_aggregator::fetcher::Fetcher;
use vsp_aggregator::provider::{Network, ProviderFamily};
use vsp_aggregator::state::{AppState, SharedState};

/// Scripted response for one URL.
#[derive(Debug, Clone)]
pub enum Reply {
    Body(String),
    Status(u16),
    Transport,
    Slow(Duration, String),
}

/// Fetcher answering from a URL table and counting every call.
#[derive(Default)]
pub struct MockFetcher {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, url: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(url.to_string(), reply);
    }

    pub fn body(&self, url: &str, body: &str) {
        self.reply(url, Reply::Body(body.to_string()));
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let reply = self.replies.lock().unwrap().get(url).cloned();

        match reply {
            Some(Reply::Body(body)) => Ok(body.into_bytes()),
            Some(Reply::Status(status)) => Err(FetchError::Remote {
                url: url.to_string(),
                status,
            }),
            Some(Reply::Slow(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(body.into_bytes())
            }
            Some(Reply::Transport) | None => Err(FetchError::Transport {
                url: url.to_string(),
                message: "connection refused".into(),
            }),
        }
    }
}

/// In-memory sink for formatted log lines.
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Installs a plain-text subscriber writing into this capture for the
    /// current thread until the guard is dropped.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn stakepool(id: &str, url: &str) -> ProviderConfig {
    ProviderConfig {
        id: id.into(),
        url: url.into(),
        network: Network::Mainnet,
        family: ProviderFamily::Stakepool,
        launched: 1_463_671_140,
    }
}

pub fn vsp(id: &str, url: &str) -> ProviderConfig {
    ProviderConfig {
        id: id.into(),
        url: url.into(),
        network: Network::Testnet,
        family: ProviderFamily::Vsp,
        launched: 1_591_725_600,
    }
}

pub fn config_with(providers: Vec<ProviderConfig>) -> Config {
    Config {
        providers,
        provider_timeout_secs: Some(1),
        ..Config::default()
    }
}

pub fn state_with(config: Config, fetcher: Arc<MockFetcher>) -> SharedState {
    AppState::new(config, fetcher).unwrap().shared()
}

/// Stats payload with every required field; `live` distinguishes responses.
pub fn stakepool_stats_body(live: u64) -> String {
    format!(
        r#"{{
            "status": "success",
            "code": 0,
            "message": "ok",
            "data": {{
                "AllMempoolTix": 12,
                "APIVersionsSupported": [1, 2],
                "BlockHeight": 800000,
                "Difficulty": 150.5,
                "Immature": 3,
                "Live": {live},
                "Missed": 4,
                "OwnMempoolTix": 0,
                "PoolSize": 41000,
                "ProportionLive": 0.0123,
                "ProportionMissed": 0.004,
                "Revoked": 4,
                "TotalSubsidy": 1234.5,
                "Voted": 980,
                "Network": "mainnet",
                "PoolEmail": "admin@example.org",
                "PoolFees": 1.5,
                "PoolStatus": "Open",
                "UserCount": 200,
                "UserCountActive": 150,
                "Version": "1.4.0-pre+dev"
            }}
        }}"#
    )
}

/// Stats payload lacking `UserCountActive`.
pub fn stakepool_stats_missing_field() -> String {
    stakepool_stats_body(7).replace(r#""UserCountActive": 150,"#, "")
}

pub fn vspinfo_body(voting: u64) -> String {
    format!(
        r#"{{
            "apiversions": [3],
            "timestamp": 1700000000,
            "pubkey": "abc",
            "feepercentage": 2.0,
            "vspclosed": false,
            "network": "testnet3",
            "voting": {voting},
            "voted": 500,
            "revoked": 2,
            "missed": 2,
            "expired": 1,
            "vspdversion": "1.2.0-pre+abc/def",
            "blockheight": 1200000,
            "estimatednetworkproportion": 0.123456
        }}"#
    )
}

pub const SUPPLY_BODY: &str = r#"{"supply_mined": 1191578535131039, "block_height": 600000}"#;

pub const PRICE_BODY: &str = r#"{"decred": {"usd": 18.4567, "btc": 0.000312345678}}"#;

pub fn releases_body(counts: &[u64]) -> String {
    let assets: Vec<String> = counts
        .iter()
        .enumerate()
        .map(|(i, c)| format!(r#"{{"name": "asset-{i}", "download_count": {c}}}"#))
        .collect();
    format!(r#"[{{"tag_name": "v1.0.0", "assets": [{}]}}]"#, assets.join(", "))
}
