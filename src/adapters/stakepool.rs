//! Legacy stakepool statistics adapter (`/api/v{N}/stats`).

use serde::Serialize;
use serde_json::Value;

use super::{parse_document, Fields};
use crate::error::DecodeError;
use crate::normalize::sanitize_version;

/// Keys every stats payload must carry inside `data`.
pub const REQUIRED_FIELDS: [&str; 10] = [
    "Immature",
    "Live",
    "Voted",
    "Missed",
    "PoolFees",
    "ProportionLive",
    "ProportionMissed",
    "UserCount",
    "UserCountActive",
    "APIVersionsSupported",
];

/// Ticket and user statistics reported by a legacy stakepool.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StakepoolStats {
    #[serde(rename = "APIEnabled")]
    pub api_enabled: bool,
    #[serde(rename = "APIVersionsSupported")]
    pub api_versions_supported: Vec<Value>,
    pub last_updated: i64,
    pub immature: u64,
    pub live: u64,
    pub voted: u64,
    pub missed: u64,
    pub pool_fees: f64,
    pub proportion_live: f64,
    pub proportion_missed: f64,
    pub user_count: u64,
    pub user_count_active: u64,
    pub version: String,
}

/// Decodes a `{"status": "success", "data": {...}}` stats envelope.
pub fn decode(body: &[u8]) -> Result<StakepoolStats, DecodeError> {
    let doc = parse_document(body)?;
    let envelope = Fields::of(&doc, "response")?;
    envelope.require(&["status"])?;

    let status = envelope.string("status")?;
    if status != "success" {
        return Err(DecodeError::Rejected {
            status: status.to_string(),
        });
    }

    envelope.require(&["data"])?;
    let data = envelope.object("data")?;
    data.require(&REQUIRED_FIELDS)?;

    Ok(StakepoolStats {
        api_enabled: true,
        api_versions_supported: data.array("APIVersionsSupported")?.clone(),
        last_updated: 0,
        immature: data.count("Immature")?,
        live: data.count("Live")?,
        voted: data.count("Voted")?,
        missed: data.count("Missed")?,
        pool_fees: data.number("PoolFees")?,
        proportion_live: data.number("ProportionLive")?,
        proportion_missed: data.number("ProportionMissed")?,
        user_count: data.count("UserCount")?,
        user_count_active: data.count("UserCountActive")?,
        version: data
            .optional_string("Version")?
            .map(sanitize_version)
            .unwrap_or_default(),
    })
}
