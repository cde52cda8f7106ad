//! Provider identities, families and the records decoded from them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::adapters::stakepool::{self, StakepoolStats};
use crate::adapters::vsp::{self, VspStats};
use crate::error::DecodeError;

/// Current legacy stakepool API version.
pub const STAKEPOOL_API_CURRENT_VERSION: u32 = 2;

/// Initial legacy stakepool API version, used as the fallback.
pub const STAKEPOOL_API_INITIAL_VERSION: u32 = 1;

/// Voting-service API version.
pub const VSP_API_VERSION: u32 = 3;

const STAKEPOOL_ATTEMPTS: [ApiAttempt; 2] = [
    ApiAttempt::Stakepool {
        version: STAKEPOOL_API_CURRENT_VERSION,
    },
    ApiAttempt::Stakepool {
        version: STAKEPOOL_API_INITIAL_VERSION,
    },
];

const VSP_ATTEMPTS: [ApiAttempt; 1] = [ApiAttempt::Vsp {
    version: VSP_API_VERSION,
}];

/// Network a provider operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Simnet,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Simnet => "simnet",
        };
        f.write_str(s)
    }
}

/// Family of remote API a provider instance speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFamily {
    /// Legacy stakepool `/api/v{N}/stats`.
    Stakepool,
    /// Voting service `/api/v3/vspinfo`.
    Vsp,
}

impl ProviderFamily {
    /// Ordered attempt strategies, tried until one succeeds.
    pub fn attempts(&self) -> &'static [ApiAttempt] {
        match self {
            ProviderFamily::Stakepool => &STAKEPOOL_ATTEMPTS,
            ProviderFamily::Vsp => &VSP_ATTEMPTS,
        }
    }

    /// Record served for an instance that has never refreshed successfully.
    pub fn default_record(&self) -> ProviderRecord {
        match self {
            ProviderFamily::Stakepool => ProviderRecord::Stakepool(StakepoolStats::default()),
            ProviderFamily::Vsp => ProviderRecord::Vsp(VspStats::default()),
        }
    }
}

impl fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderFamily::Stakepool => f.write_str("stakepool"),
            ProviderFamily::Vsp => f.write_str("vsp"),
        }
    }
}

/// One way of asking a provider for its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiAttempt {
    Stakepool { version: u32 },
    Vsp { version: u32 },
}

impl ApiAttempt {
    /// Endpoint URL for this attempt against `base`.
    pub fn url(&self, base: &str) -> String {
        let base = base.trim_end_matches('/');
        match self {
            ApiAttempt::Stakepool { version } => format!("{base}/api/v{version}/stats"),
            ApiAttempt::Vsp { version } => format!("{base}/api/v{version}/vspinfo"),
        }
    }

    pub fn decode(&self, body: &[u8]) -> Result<ProviderRecord, DecodeError> {
        match self {
            ApiAttempt::Stakepool { .. } => stakepool::decode(body).map(ProviderRecord::Stakepool),
            ApiAttempt::Vsp { .. } => vsp::decode(body).map(ProviderRecord::Vsp),
        }
    }
}

impl fmt::Display for ApiAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiAttempt::Stakepool { version } => write!(f, "stakepool v{version}"),
            ApiAttempt::Vsp { version } => write!(f, "vsp v{version}"),
        }
    }
}

/// Immutable identity of one remote data source, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInstance {
    pub id: String,
    pub url: String,
    pub network: Network,
    pub family: ProviderFamily,
    /// Unix seconds at which the provider was listed.
    pub launched: i64,
}

/// Last successfully decoded snapshot of a provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProviderRecord {
    Stakepool(StakepoolStats),
    Vsp(VspStats),
}

impl ProviderRecord {
    pub fn last_updated(&self) -> i64 {
        match self {
            ProviderRecord::Stakepool(stats) => stats.last_updated,
            ProviderRecord::Vsp(stats) => stats.lastupdated,
        }
    }

    pub fn set_last_updated(&mut self, timestamp: i64) {
        match self {
            ProviderRecord::Stakepool(stats) => stats.last_updated = timestamp,
            ProviderRecord::Vsp(stats) => stats.lastupdated = timestamp,
        }
    }

    pub fn family(&self) -> ProviderFamily {
        match self {
            ProviderRecord::Stakepool(_) => ProviderFamily::Stakepool,
            ProviderRecord::Vsp(_) => ProviderFamily::Vsp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stakepool_attempts_fall_back_to_initial_version() {
        let urls: Vec<String> = ProviderFamily::Stakepool
            .attempts()
            .iter()
            .map(|a| a.url("https://pool.example/"))
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://pool.example/api/v2/stats",
                "https://pool.example/api/v1/stats"
            ]
        );
    }

    #[test]
    fn test_vsp_has_single_attempt() {
        let attempts = ProviderFamily::Vsp.attempts();
        assert_eq!(attempts.len(), 1);
        assert_eq!(
            attempts[0].url("https://vsp.example"),
            "https://vsp.example/api/v3/vspinfo"
        );
    }

    #[test]
    fn test_default_record_matches_family() {
        for family in [ProviderFamily::Stakepool, ProviderFamily::Vsp] {
            let record = family.default_record();
            assert_eq!(record.family(), family);
            assert_eq!(record.last_updated(), 0);
        }
    }
}
