//! Numeric rounding and version-string normalization shared by the adapters.

/// Characters permitted in the build-metadata portion of a semantic version.
pub const SEMANTIC_BUILD_ALPHABET: &str =
    "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-.+";

/// Maximum length of a version string after sanitization.
pub const MAX_VERSION_LEN: usize = 13;

/// Rounds half up to `places` decimal places: `floor(x * 10^places + 0.5) / 10^places`.
pub fn round(value: f64, places: u32) -> f64 {
    let shift = 10f64.powi(places as i32);
    (value * shift + 0.5).floor() / shift
}

/// Strips every character that is not part of the semantic versioning
/// build-metadata alphabet.
pub fn normalize_build_string(s: &str) -> String {
    s.chars()
        .filter(|c| SEMANTIC_BUILD_ALPHABET.contains(*c))
        .collect()
}

/// Normalizes a provider-advertised version and truncates it to
/// [`MAX_VERSION_LEN`] characters.
pub fn sanitize_version(s: &str) -> String {
    let mut version = normalize_build_string(s);
    // Only ASCII survives normalization, so byte truncation is safe.
    version.truncate(MAX_VERSION_LEN);
    version
}
