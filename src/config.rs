//! Configuration management for vsp-aggregator.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::adapters::supply::SupplyParams;
use crate::cli::{Args, ConfigFormat};
use crate::provider::{Network, ProviderFamily, ProviderInstance};

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8089;
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_AGGREGATE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RELEASE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_IDLE_PER_HOST: usize = 2;

/// Accepted values of `log_level`.
pub const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

pub fn default_user_agent() -> String {
    format!("vsp-aggregator/{} bot", env!("CARGO_PKG_VERSION"))
}

/// Blockchain data API used for the coin supply breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyConfig {
    #[serde(default = "default_supply_url")]
    pub url: String,
    #[serde(default = "default_airdrop")]
    pub airdrop: f64,
    #[serde(default = "default_premine")]
    pub premine: f64,
    #[serde(default = "default_total_supply")]
    pub total: f64,
    #[serde(default = "default_supply_ttl")]
    pub ttl_secs: u64,
}

fn default_supply_url() -> String {
    "https://dcrdata.decred.org/api/supply".into()
}
fn default_airdrop() -> f64 {
    840_000.0
}
fn default_premine() -> f64 {
    840_000.0
}
fn default_total_supply() -> f64 {
    21_000_000.0
}
fn default_supply_ttl() -> u64 {
    60
}

impl Default for SupplyConfig {
    fn default() -> Self {
        Self {
            url: default_supply_url(),
            airdrop: default_airdrop(),
            premine: default_premine(),
            total: default_total_supply(),
            ttl_secs: default_supply_ttl(),
        }
    }
}

impl SupplyConfig {
    pub fn params(&self) -> SupplyParams {
        SupplyParams {
            airdrop: self.airdrop,
            premine: self.premine,
            total: self.total,
        }
    }
}

/// Price API used for the exchange-rate query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceConfig {
    #[serde(default = "default_price_url")]
    pub url: String,
    /// Key of the coin inside the price response.
    #[serde(default = "default_price_coin")]
    pub coin: String,
    #[serde(default = "default_price_ttl")]
    pub ttl_secs: u64,
}

fn default_price_url() -> String {
    "https://api.coingecko.com/api/v3/simple/price?ids=decred&vs_currencies=usd,btc".into()
}
fn default_price_coin() -> String {
    "decred".into()
}
fn default_price_ttl() -> u64 {
    300
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            url: default_price_url(),
            coin: default_price_coin(),
            ttl_secs: default_price_ttl(),
        }
    }
}

/// Release repositories whose asset downloads are counted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadsConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// `owner/name` pairs.
    #[serde(default = "default_repositories")]
    pub repositories: Vec<String>,
    #[serde(default = "default_downloads_ttl")]
    pub ttl_secs: u64,
}

fn default_api_base() -> String {
    "https://api.github.com".into()
}
fn default_repositories() -> Vec<String> {
    vec!["decred/decred-binaries".into(), "decred/decred-release".into()]
}
fn default_downloads_ttl() -> u64 {
    4 * 60 * 60
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            repositories: default_repositories(),
            ttl_secs: default_downloads_ttl(),
        }
    }
}

impl DownloadsConfig {
    pub fn release_urls(&self) -> Vec<String> {
        let base = self.api_base.trim_end_matches('/');
        self.repositories
            .iter()
            .map(|repo| format!("{base}/repos/{repo}/releases?per_page=100"))
            .collect()
    }
}

/// One configured provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub url: String,
    pub network: Network,
    #[serde(default = "default_family")]
    pub family: ProviderFamily,
    /// Unix seconds at which the provider was listed.
    pub launched: i64,
}

fn default_family() -> ProviderFamily {
    ProviderFamily::Stakepool
}

impl ProviderConfig {
    fn new(
        id: &str,
        url: &str,
        network: Network,
        family: ProviderFamily,
        launched: (i32, u32, u32, u32, u32),
    ) -> Self {
        let (year, month, day, hour, min) = launched;
        Self {
            id: id.into(),
            url: url.into(),
            network,
            family,
            launched: unix_time(year, month, day, hour, min),
        }
    }

    pub fn instance(&self) -> ProviderInstance {
        ProviderInstance {
            id: self.id.clone(),
            url: self.url.trim_end_matches('/').to_string(),
            network: self.network,
            family: self.family,
            launched: self.launched,
        }
    }
}

/// Unix seconds for a UTC calendar minute; 0 if the date does not exist.
pub fn unix_time(year: i32, month: u32, day: u32, hour: u32, min: u32) -> i64 {
    Utc.with_ymd_and_hms(year, month, day, hour, min, 0)
        .single()
        .map(|t| t.timestamp())
        .unwrap_or(0)
}

/// Built-in provider list used when the config file names none.
pub fn default_providers() -> Vec<ProviderConfig> {
    use Network::{Mainnet, Testnet};
    use ProviderFamily::{Stakepool, Vsp};

    vec![
        ProviderConfig::new("Alfa", "https://test-dcrpool.dittrex.com", Testnet, Stakepool, (2019, 2, 17, 14, 0)),
        ProviderConfig::new("Everstake", "https://decred.everstake.one", Mainnet, Stakepool, (2019, 7, 23, 15, 46)),
        ProviderConfig::new("Dittrex", "https://dcrpool.dittrex.com", Mainnet, Stakepool, (2018, 11, 28, 16, 13)),
        ProviderConfig::new("Delta", "https://dcr.stakeminer.com", Mainnet, Stakepool, (2016, 5, 19, 15, 19)),
        ProviderConfig::new("Echo", "https://pool.d3c.red", Mainnet, Stakepool, (2016, 5, 23, 17, 59)),
        ProviderConfig::new("Golf", "https://stakepool.dcrstats.com", Mainnet, Stakepool, (2016, 5, 25, 9, 9)),
        ProviderConfig::new("Hotel", "https://stake.decredbrasil.com", Mainnet, Stakepool, (2016, 5, 28, 19, 31)),
        ProviderConfig::new("India", "https://stakepool.eu", Mainnet, Stakepool, (2016, 5, 22, 18, 58)),
        ProviderConfig::new("Juliett", "https://dcr.ubiqsmart.com", Mainnet, Stakepool, (2016, 6, 12, 20, 52)),
        ProviderConfig::new("Kilo", "https://teststakepool.decred.org", Testnet, Stakepool, (2017, 2, 7, 22, 0)),
        ProviderConfig::new("Lima", "https://ultrapool.eu", Mainnet, Stakepool, (2017, 5, 23, 10, 16)),
        ProviderConfig::new("Mike", "https://dcr.farm", Mainnet, Stakepool, (2017, 12, 21, 17, 50)),
        ProviderConfig::new("November", "https://decred.raqamiya.net", Mainnet, Stakepool, (2017, 12, 21, 17, 50)),
        ProviderConfig::new("Papa", "https://stakey.net", Mainnet, Stakepool, (2018, 1, 22, 21, 4)),
        ProviderConfig::new("Quebec", "https://test.stakey.net", Testnet, Stakepool, (2018, 1, 22, 21, 4)),
        ProviderConfig::new("Sierra", "https://decredvoting.com", Mainnet, Stakepool, (2018, 8, 30, 11, 55)),
        ProviderConfig::new("Life", "https://dcrpool.ibitlin.com", Mainnet, Stakepool, (2018, 7, 7, 1, 10)),
        ProviderConfig::new("Scarmani", "https://stakey.com", Mainnet, Stakepool, (2018, 10, 12, 15, 10)),
        ProviderConfig::new("Mega", "https://dcrpos.megapool.info", Mainnet, Stakepool, (2018, 10, 20, 9, 30)),
        ProviderConfig::new("Zeta", "https://dcrstake.coinmine.pl", Mainnet, Stakepool, (2018, 10, 22, 22, 30)),
        ProviderConfig::new("Staked", "https://decred.staked.us", Mainnet, Stakepool, (2018, 11, 28, 19, 30)),
        ProviderConfig::new("Tango", "https://testnet.decredvoting.com", Testnet, Stakepool, (2018, 8, 30, 11, 55)),
        ProviderConfig::new("99split", "https://99split.com", Mainnet, Stakepool, (2019, 12, 17, 1, 57)),
        ProviderConfig::new("Charlie", "https://decred.yieldwallet.io", Mainnet, Stakepool, (2020, 1, 29, 15, 32)),
        ProviderConfig::new("Dinner", "https://dcrstakedinner.com", Testnet, Stakepool, (2020, 3, 10, 15, 28)),
        ProviderConfig::new("teststakey.net", "https://teststakey.net", Testnet, Vsp, (2020, 8, 11, 16, 55)),
        ProviderConfig::new("stakey.net", "https://stakey.net", Mainnet, Vsp, (2020, 10, 1, 12, 0)),
        ProviderConfig::new("decredvoting.com", "https://vsp.decredvoting.com", Mainnet, Vsp, (2020, 10, 1, 12, 0)),
    ]
}

/// Enhanced configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Refresh scheduling and outbound requests
    pub refresh_interval_secs: Option<u64>,
    pub provider_timeout_secs: Option<u64>,
    pub aggregate_timeout_secs: Option<u64>,
    pub release_timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub max_idle_per_host: Option<usize>,

    // Feature flags
    pub enable_health: Option<bool>,
    pub enable_metrics: Option<bool>,

    // Logging
    pub log_level: Option<String>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,

    // Aggregate sources
    #[serde(default)]
    pub supply: SupplyConfig,
    #[serde(default)]
    pub price: PriceConfig,
    #[serde(default)]
    pub downloads: DownloadsConfig,

    // Polled providers
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            refresh_interval_secs: Some(DEFAULT_REFRESH_INTERVAL_SECS),
            provider_timeout_secs: Some(DEFAULT_PROVIDER_TIMEOUT_SECS),
            aggregate_timeout_secs: Some(DEFAULT_AGGREGATE_TIMEOUT_SECS),
            release_timeout_secs: Some(DEFAULT_RELEASE_TIMEOUT_SECS),
            user_agent: Some(default_user_agent()),
            max_idle_per_host: Some(DEFAULT_MAX_IDLE_PER_HOST),
            enable_health: Some(true),
            enable_metrics: Some(true),
            log_level: Some("info".into()),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
            supply: SupplyConfig::default(),
            price: PriceConfig::default(),
            downloads: DownloadsConfig::default(),
            providers: default_providers(),
        }
    }
}

impl Config {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(
            self.refresh_interval_secs
                .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS),
        )
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(
            self.provider_timeout_secs
                .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS),
        )
    }

    pub fn aggregate_timeout(&self) -> Duration {
        Duration::from_secs(
            self.aggregate_timeout_secs
                .unwrap_or(DEFAULT_AGGREGATE_TIMEOUT_SECS),
        )
    }

    pub fn release_timeout(&self) -> Duration {
        Duration::from_secs(
            self.release_timeout_secs
                .unwrap_or(DEFAULT_RELEASE_TIMEOUT_SECS),
        )
    }

    pub fn user_agent(&self) -> String {
        self.user_agent.clone().unwrap_or_else(default_user_agent)
    }

    pub fn provider_instances(&self) -> Vec<ProviderInstance> {
        self.providers.iter().map(ProviderConfig::instance).collect()
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    // Intervals and timeouts must be non-zero
    let durations = [
        ("refresh_interval_secs", cfg.refresh_interval_secs),
        ("provider_timeout_secs", cfg.provider_timeout_secs),
        ("aggregate_timeout_secs", cfg.aggregate_timeout_secs),
        ("release_timeout_secs", cfg.release_timeout_secs),
    ];
    for (name, value) in durations {
        if value == Some(0) {
            return Err(format!("{} must be greater than 0", name).into());
        }
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            return Err(format!(
                "Invalid log_level '{}', expected one of: {}",
                level,
                LOG_LEVELS.join(", ")
            )
            .into());
        }
    }

    if cfg.user_agent.as_deref().is_some_and(|ua| ua.trim().is_empty()) {
        return Err("user_agent must not be empty".into());
    }

    // Provider identities
    let mut seen = HashSet::new();
    for provider in &cfg.providers {
        if provider.id.trim().is_empty() {
            return Err(format!("Provider with URL '{}' has an empty id", provider.url).into());
        }
        if !seen.insert(provider.id.as_str()) {
            return Err(format!("Duplicate provider id '{}'", provider.id).into());
        }
        if !is_http_url(&provider.url) {
            return Err(format!(
                "Provider '{}' has invalid URL '{}', expected http:// or https://",
                provider.id, provider.url
            )
            .into());
        }
    }

    // Aggregate sources
    if !is_http_url(&cfg.supply.url) {
        return Err(format!("Invalid supply url '{}'", cfg.supply.url).into());
    }
    if !is_http_url(&cfg.price.url) {
        return Err(format!("Invalid price url '{}'", cfg.price.url).into());
    }
    if !is_http_url(&cfg.downloads.api_base) {
        return Err(format!("Invalid downloads api_base '{}'", cfg.downloads.api_base).into());
    }
    if cfg.supply.total.is_nan() || cfg.supply.total <= 0.0 {
        return Err("supply.total must be greater than 0".into());
    }
    if let Some(repo) = cfg
        .downloads
        .repositories
        .iter()
        .find(|r| r.split('/').filter(|part| !part.is_empty()).count() != 2)
    {
        return Err(format!("Invalid repository '{}', expected owner/name", repo).into());
    }

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        let cert_path = cfg.tls_cert_path.as_deref();
        let key_path = cfg.tls_key_path.as_deref();

        match (cert_path, key_path) {
            (None, None) => {
                return Err(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                );
            }
            (Some(_), None) => {
                return Err("TLS is enabled but tls_key_path is not set".into());
            }
            (None, Some(_)) => {
                return Err("TLS is enabled but tls_cert_path is not set".into());
            }
            (Some(cert), Some(key)) => {
                check_pem_file(cert, "certificate")?;
                check_pem_file(key, "private key")?;
            }
        }
    }

    Ok(())
}

fn check_pem_file(path: &str, what: &str) -> Result<(), Box<dyn std::error::Error>> {
    match fs::metadata(Path::new(path)) {
        Ok(meta) if meta.len() == 0 => Err(format!("TLS {} file is empty: {}", what, path).into()),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("TLS {} file not found: {}", what, path).into())
        }
        Err(e) => Err(format!("TLS {} file is not readable: {} ({})", what, path, e).into()),
    }
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(level) = &args.log_level {
        config.log_level = Some(level.as_str().to_string());
    }

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }

    // Only override port if the user supplied it on the CLI.
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }

    if let Some(secs) = args.refresh_interval {
        config.refresh_interval_secs = Some(secs);
    }
    if let Some(secs) = args.provider_timeout {
        config.provider_timeout_secs = Some(secs);
    }
    if let Some(user_agent) = &args.user_agent {
        config.user_agent = Some(user_agent.clone());
    }

    // Feature flags
    if args.disable_health {
        config.enable_health = Some(false);
    }
    if args.disable_metrics {
        config.enable_metrics = Some(false);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Enhanced configuration loading with multiple format support
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            // Try default locations
            let defaults = [
                "/etc/vsp-aggregator/config.yaml",
                "/etc/vsp-aggregator/config.yml",
                "/etc/vsp-aggregator/config.json",
                "./vsp-aggregator.yaml",
                "./vsp-aggregator.yml",
                "./vsp-aggregator.json",
            ];

            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(found) => PathBuf::from(found),
                None => return Ok(Config::default()),
            }
        }
    };

    let content = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Renders configuration in the requested format
pub fn render_config(
    config: &Config,
    format: ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, format)?);
    Ok(())
}
