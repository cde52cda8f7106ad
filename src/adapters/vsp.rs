//! Voting service provider adapter (`/api/v3/vspinfo`).

use serde::Serialize;
use serde_json::Value;

use super::{parse_document, Fields};
use crate::error::DecodeError;
use crate::normalize::{round, sanitize_version};

pub const REQUIRED_FIELDS: [&str; 11] = [
    "apiversions",
    "feepercentage",
    "vspclosed",
    "network",
    "voting",
    "voted",
    "missed",
    "expired",
    "vspdversion",
    "blockheight",
    "estimatednetworkproportion",
];

/// Public information advertised by a voting service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub struct VspStats {
    pub apiversions: Vec<Value>,
    pub feepercentage: f64,
    pub closed: bool,
    pub voting: u64,
    pub voted: u64,
    pub missed: u64,
    pub expired: u64,
    pub vspdversion: String,
    pub blockheight: u64,
    pub estimatednetworkproportion: f64,
    pub lastupdated: i64,
}

pub fn decode(body: &[u8]) -> Result<VspStats, DecodeError> {
    let doc = parse_document(body)?;
    let info = Fields::of(&doc, "vspinfo")?;
    info.require(&REQUIRED_FIELDS)?;

    // The network is checked for type only; the configured label is authoritative.
    info.string("network")?;

    Ok(VspStats {
        apiversions: info.array("apiversions")?.clone(),
        feepercentage: info.number("feepercentage")?,
        closed: info.boolean("vspclosed")?,
        voting: info.count("voting")?,
        voted: info.count("voted")?,
        missed: info.count("missed")?,
        expired: info.count("expired")?,
        vspdversion: sanitize_version(info.string("vspdversion")?),
        blockheight: info.count("blockheight")?,
        estimatednetworkproportion: round(info.number("estimatednetworkproportion")?, 4),
        lastupdated: 0,
    })
}
