//! Response builders shared by the query endpoint.

use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use tracing::error;

use crate::adapters::stakepool::StakepoolStats;
use crate::adapters::vsp::VspStats;
use crate::provider::{Network, ProviderFamily, ProviderInstance, ProviderRecord};

fn json_headers() -> [(HeaderName, &'static str); 4] {
    [
        (header::CONTENT_TYPE, "application/json"),
        (header::STRICT_TRANSPORT_SECURITY, "max-age=15552001"),
        (header::VARY, "Accept-Encoding"),
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    ]
}

/// Serializes `value` as a JSON response with the standard headers.
pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => (status, json_headers(), body).into_response(),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            json_error(&e.to_string())
        }
    }
}

/// `500` with `{"error": "<message>"}`.
pub fn json_error(message: &str) -> Response {
    let body = serde_json::json!({ "error": message }).to_string();
    (StatusCode::INTERNAL_SERVER_ERROR, json_headers(), body).into_response()
}

pub fn svg(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "image/svg+xml")],
        body,
    )
        .into_response()
}

#[derive(serde::Serialize)]
struct StakepoolView<'a> {
    #[serde(rename = "Network")]
    network: Network,
    #[serde(rename = "URL")]
    url: &'a str,
    #[serde(rename = "Launched")]
    launched: i64,
    #[serde(flatten)]
    stats: &'a StakepoolStats,
}

#[derive(serde::Serialize)]
struct VspView<'a> {
    network: Network,
    url: &'a str,
    launched: i64,
    #[serde(flatten)]
    stats: &'a VspStats,
}

#[derive(serde::Serialize)]
#[serde(untagged)]
enum ProviderView<'a> {
    Stakepool(StakepoolView<'a>),
    Vsp(VspView<'a>),
}

/// Provider records of one family keyed by id, in a shuffled order.
pub struct ProviderSet<'a> {
    entries: Vec<(&'a str, ProviderView<'a>)>,
}

impl<'a> ProviderSet<'a> {
    pub fn build<R: Rng + ?Sized>(
        providers: &'a [ProviderInstance],
        records: &'a BTreeMap<String, ProviderRecord>,
        family: ProviderFamily,
        rng: &mut R,
    ) -> Self {
        let mut entries: Vec<(&'a str, ProviderView<'a>)> = providers
            .iter()
            .filter(|p| p.family == family)
            .filter_map(|p| {
                let view = match records.get(&p.id)? {
                    ProviderRecord::Stakepool(stats) => ProviderView::Stakepool(StakepoolView {
                        network: p.network,
                        url: &p.url,
                        launched: p.launched,
                        stats,
                    }),
                    ProviderRecord::Vsp(stats) => ProviderView::Vsp(VspView {
                        network: p.network,
                        url: &p.url,
                        launched: p.launched,
                        stats,
                    }),
                };
                Some((p.id.as_str(), view))
            })
            .collect();
        entries.shuffle(rng);
        Self { entries }
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }
}

impl Serialize for ProviderSet<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, view) in &self.entries {
            map.serialize_entry(id, view)?;
        }
        map.end()
    }
}
