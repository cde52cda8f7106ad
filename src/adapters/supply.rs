//! Coin supply adapter for the blockchain data API (`/api/supply`).
//!
//! The upstream contract is the `supply_mined` field, expressed in atoms
//! (1 coin = 10^8 atoms). All derived percentages are computed from the
//! freshly fetched figure and the configured constants.

use serde::Serialize;

use super::{parse_document, Fields};
use crate::error::DecodeError;
use crate::normalize::round;

pub const ATOMS_PER_COIN: f64 = 1e8;

/// Share of post-genesis issuance paid to stakeholders.
const POS_SHARE: f64 = 0.3;
/// Share of post-genesis issuance paid to miners.
const POW_SHARE: f64 = 0.6;
/// Share of post-genesis issuance paid to the treasury.
const SUBSIDY_SHARE: f64 = 0.1;

/// Constants the supply breakdown is derived from, in whole coins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupplyParams {
    pub airdrop: f64,
    pub premine: f64,
    pub total: f64,
}

/// Coin supply breakdown served by the `gcs` query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinSupply {
    #[serde(rename = "Airdrop")]
    pub airdrop: f64,
    #[serde(rename = "CoinSupplyMined")]
    pub coin_supply_mined: f64,
    #[serde(rename = "CoinSupplyMinedRaw")]
    pub coin_supply_mined_raw: f64,
    #[serde(rename = "CoinSupplyTotal")]
    pub coin_supply_total: f64,
    #[serde(rename = "PercentMined")]
    pub percent_mined: f64,
    #[serde(rename = "Pos")]
    pub pos: f64,
    #[serde(rename = "Pow")]
    pub pow: f64,
    #[serde(rename = "Premine")]
    pub premine: f64,
    #[serde(rename = "Subsidy")]
    pub subsidy: f64,
}

pub fn decode(body: &[u8], params: &SupplyParams) -> Result<CoinSupply, DecodeError> {
    let doc = parse_document(body)?;
    let supply = Fields::of(&doc, "supply")?;
    supply.require(&["supply_mined"])?;

    let mined_atoms = supply.number("supply_mined")?;
    if mined_atoms <= 0.0 {
        return Err(DecodeError::TypeMismatch {
            field: "supply_mined".into(),
            expected: "a positive number",
        });
    }

    Ok(compute(mined_atoms, params))
}

/// Derives the supply breakdown from a mined amount in atoms.
pub fn compute(mined_atoms: f64, params: &SupplyParams) -> CoinSupply {
    let raw = round(mined_atoms, 1);
    let mined = round(raw / ATOMS_PER_COIN, 1);
    let after_genesis = mined - params.airdrop - params.premine;
    let share = |part: f64| round(part / mined * 100.0, 1);

    CoinSupply {
        airdrop: share(params.airdrop),
        coin_supply_mined: mined,
        coin_supply_mined_raw: raw,
        coin_supply_total: params.total,
        percent_mined: round(mined / params.total * 100.0, 1),
        pos: share(after_genesis * POS_SHARE),
        pow: share(after_genesis * POW_SHARE),
        premine: share(params.premine),
        subsidy: share(after_genesis * SUBSIDY_SHARE),
    }
}
