//! Release listing adapter: sums asset download counts of a repository's
//! releases as returned by the GitHub REST API.

use super::{parse_document, Fields};
use crate::error::DecodeError;

pub fn decode_download_total(body: &[u8]) -> Result<u64, DecodeError> {
    let doc = parse_document(body)?;
    let releases = doc.as_array().ok_or_else(|| DecodeError::TypeMismatch {
        field: "releases".into(),
        expected: "an array",
    })?;

    let mut total = 0u64;
    for release in releases {
        let release = Fields::of(release, "release")?;
        release.require(&["assets"])?;
        for asset in release.array("assets")? {
            let asset = Fields::of(asset, "asset")?;
            asset.require(&["download_count"])?;
            total = total.saturating_add(asset.count("download_count")?);
        }
    }

    Ok(total)
}

/// Formats a download total the way the badge and `dc` query show it.
pub fn format_thousands(count: u64) -> String {
    format!("{}k", count / 1000)
}
