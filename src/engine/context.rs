//! Per-request context
//!
//! Normalized view of an inbound request, owned exclusively by the request
//! lifecycle. This is the surface handler scripts see, independent of the
//! host HTTP types.

use std::collections::HashMap;

/// Normalized request data handed to the handler invoker.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: String,
    pub raw_url: String,
    /// Percent-decoded path.
    pub pathname: String,
    /// Flat query mapping; the last value wins on duplicate keys.
    pub query: HashMap<String, String>,
    /// Parameters bound by dynamic route segments.
    pub params: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    /// Parsed JSON body; absent for non-mutating methods.
    pub body: Option<serde_json::Value>,
}

/// Percent-decode a request path.
pub fn decode_pathname(path: &str) -> String {
    percent_encoding::percent_decode_str(path)
        .decode_utf8_lossy()
        .into_owned()
}

/// Parse a raw query string into a flat string-to-string mapping.
pub fn parse_query(raw: Option<&str>) -> HashMap<String, String> {
    match raw {
        Some(q) => form_urlencoded::parse(q.as_bytes()).into_owned().collect(),
        None => HashMap::new(),
    }
}

/// Extract request headers into a flat map, skipping non-UTF-8 values.
pub fn header_map(headers: &hyper::HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}
