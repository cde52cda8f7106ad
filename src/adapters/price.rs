//! Exchange-rate adapter for a simple price API
//! (`{"<coin>": {"usd": 15.2, "btc": 0.00023}}`).

use serde::Serialize;

use super::{parse_document, Fields};
use crate::error::DecodeError;
use crate::normalize::round;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Price {
    #[serde(rename = "USD")]
    pub usd: f64,
    #[serde(rename = "BTC")]
    pub btc: f64,
}

pub fn decode(body: &[u8], coin: &str) -> Result<Price, DecodeError> {
    let doc = parse_document(body)?;
    let root = Fields::of(&doc, "price")?;
    root.require(&[coin])?;

    let quotes = root.object(coin)?;
    quotes.require(&["usd", "btc"])?;

    Ok(Price {
        usd: round(quotes.number("usd")?, 2),
        btc: round(quotes.number("btc")?, 8),
    })
}
