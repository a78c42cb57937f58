//! Header masking for persisted reports

use std::collections::BTreeMap;

/// Headers masked before a report leaves the process.
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "x-api-key",
    "x-auth-token",
    "cookie",
    "set-cookie",
    "proxy-authorization",
];

/// Mask value for redacted headers.
pub const MASK: &str = "***";

/// Returns true if the header name matches a known sensitive header (case-insensitive).
#[must_use]
pub fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE_HEADERS
        .iter()
        .any(|&h| name.eq_ignore_ascii_case(h))
}

/// Replace the values of sensitive headers with [`MASK`] in place.
pub fn mask_headers(headers: &mut BTreeMap<String, String>) {
    for (key, value) in headers.iter_mut() {
        if is_sensitive_header(key) {
            *value = MASK.to_string();
        }
    }
}
