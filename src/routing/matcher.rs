//! Route pattern matching
//!
//! A route pattern is a sequence of segments derived from a handler file's
//! relative path. A segment written as `[name]` matches any single non-slash
//! path segment and binds it to `name`; every other segment must match
//! literally.

use std::collections::HashMap;

/// One segment of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must match the request segment exactly.
    Literal(String),
    /// Matches any single segment and binds it to the parameter name.
    Param(String),
}

impl Segment {
    /// Parse a raw path segment, recognizing the `[name]` bracket notation.
    pub fn parse(raw: &str) -> Self {
        raw.strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .filter(|name| !name.is_empty())
            .map_or_else(
                || Self::Literal(raw.to_string()),
                |name| Self::Param(name.to_string()),
            )
    }
}

/// Match a request path (already split into segments) against a pattern.
///
/// Returns the bound parameters on success, `None` on mismatch. Segment
/// counts must be equal; a bracket segment never spans a slash.
pub fn match_segments(
    pattern: &[Segment],
    path_segments: &[&str],
) -> Option<HashMap<String, String>> {
    if pattern.len() != path_segments.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (segment, actual) in pattern.iter().zip(path_segments) {
        match segment {
            Segment::Literal(lit) => {
                if lit != actual {
                    return None;
                }
            }
            Segment::Param(name) => {
                params.insert(name.clone(), (*actual).to_string());
            }
        }
    }
    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(raw: &[&str]) -> Vec<Segment> {
        raw.iter().map(|s| Segment::parse(s)).collect()
    }

    #[test]
    fn test_parse_bracket_segment() {
        assert_eq!(Segment::parse("[id]"), Segment::Param("id".to_string()));
        assert_eq!(
            Segment::parse("users"),
            Segment::Literal("users".to_string())
        );
        // Empty brackets are not a parameter.
        assert_eq!(Segment::parse("[]"), Segment::Literal("[]".to_string()));
    }

    #[test]
    fn test_literal_match() {
        let p = pattern(&["users", "list"]);
        assert!(match_segments(&p, &["users", "list"]).is_some());
        assert!(match_segments(&p, &["users", "other"]).is_none());
    }

    #[test]
    fn test_param_binding() {
        let p = pattern(&["users", "[id]"]);
        let params = match_segments(&p, &["users", "123"]).expect("should match");
        assert_eq!(params.get("id").map(String::as_str), Some("123"));
    }

    #[test]
    fn test_param_does_not_span_slash() {
        let p = pattern(&["users", "[id]"]);
        assert!(match_segments(&p, &["users", "1", "posts"]).is_none());
        assert!(match_segments(&p, &["users"]).is_none());
    }

    #[test]
    fn test_multiple_params() {
        let p = pattern(&["[org]", "repos", "[name]"]);
        let params = match_segments(&p, &["acme", "repos", "router"]).expect("should match");
        assert_eq!(params.get("org").map(String::as_str), Some("acme"));
        assert_eq!(params.get("name").map(String::as_str), Some("router"));
    }
}
