//! Cache key generation using SHA-256 hashes

use sha2::{Digest, Sha256};

/// Generate a deterministic cache key from endpoint, scope and parameters.
///
/// The key is a SHA-256 hash of the endpoint, the optional scope (e.g. the
/// feed URL) and the sorted parameters, so parameter order never matters.
pub fn cache_key(endpoint: &str, scope: Option<&str>, params: &[(&str, &str)]) -> String {
    let mut hasher = Sha256::new();

    hasher.update(endpoint.as_bytes());
    hasher.update(b"|");

    if let Some(scope) = scope {
        hasher.update(scope.as_bytes());
    }
    hasher.update(b"|");

    // Sort and include params for deterministic key
    let mut sorted_params: Vec<_> = params.iter().collect();
    sorted_params.sort_by_key(|(k, _)| *k);

    for (k, v) in sorted_params {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b"&");
    }

    format!("{:x}", hasher.finalize())
}
