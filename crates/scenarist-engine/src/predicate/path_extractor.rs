//! Request field extraction for state capture.
//!
//! A path expression starts with the request section (`body`, `headers` or `query`)
//! followed by dot-separated keys, e.g. `body.user.id` or `headers.x-user-id`.
//!
//! Traversal only follows object keys by direct lookup. Arrays are not indexable,
//! empty segments are rejected, and the reserved names `__proto__`, `constructor`
//! and `prototype` are never followed, so captured paths behave identically to
//! JavaScript-side scenario tooling that denylists them.

use crate::context::HttpRequestContext;
use serde_json::Value;

/// Keys that are never traversed.
pub const DENYLISTED_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Request section a path expression starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRoot {
    Body,
    Headers,
    Query,
}

impl PathRoot {
    pub fn parse(segment: &str) -> Option<Self> {
        match segment {
            "body" => Some(PathRoot::Body),
            "headers" => Some(PathRoot::Headers),
            "query" => Some(PathRoot::Query),
            _ => None,
        }
    }
}

/// Check whether a single path segment may be traversed.
pub fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty() && !DENYLISTED_KEYS.contains(&segment)
}

/// Extract a value from the request context.
///
/// Returns `None` when the root is unknown, any segment is unsafe, or the path
/// cannot be followed through objects.
pub fn extract_from_path(ctx: &HttpRequestContext, path: &str) -> Option<Value> {
    let mut segments = path.split('.');
    let root = PathRoot::parse(segments.next()?)?;
    let rest: Vec<&str> = segments.collect();

    if !rest.iter().all(|segment| is_safe_segment(segment)) {
        return None;
    }

    match root {
        PathRoot::Body => {
            let mut current = ctx.body.as_ref()?;
            for segment in rest {
                current = match current {
                    Value::Object(map) => map.get(segment)?,
                    _ => return None,
                };
            }
            Some(current.clone())
        }
        PathRoot::Headers => match rest.as_slice() {
            [] => Some(string_map_to_value(&ctx.headers, true)),
            [name] => ctx.header(name).map(|v| Value::String(v.to_string())),
            _ => None,
        },
        PathRoot::Query => match rest.as_slice() {
            [] => Some(string_map_to_value(&ctx.query, false)),
            [name] => ctx.query.get(*name).map(|v| Value::String(v.clone())),
            _ => None,
        },
    }
}

fn string_map_to_value(map: &std::collections::HashMap<String, String>, lower: bool) -> Value {
    let mut entries: Vec<(&String, &String)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    Value::Object(
        entries
            .into_iter()
            .map(|(k, v)| {
                let key = if lower { k.to_lowercase() } else { k.clone() };
                (key, Value::String(v.clone()))
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> HttpRequestContext {
        HttpRequestContext::new("POST", "/cart/items?coupon=SAVE10")
            .with_header("X-User-Id", "user-7")
            .with_body(json!({
                "item": {"sku": "A1", "qty": 2},
                "tags": ["a", "b"],
                "note": null
            }))
    }

    #[test]
    fn test_extract_header_stored_with_mixed_case() {
        let mut ctx = HttpRequestContext::new("GET", "/x");
        ctx.headers
            .insert("X-Request-Id".to_string(), "req-1".to_string());
        assert_eq!(
            extract_from_path(&ctx, "headers.x-request-id"),
            Some(json!("req-1"))
        );
    }

    #[test]
    fn test_extract_body_paths() {
        let ctx = request();
        assert_eq!(extract_from_path(&ctx, "body.item.sku"), Some(json!("A1")));
        assert_eq!(
            extract_from_path(&ctx, "body.item"),
            Some(json!({"sku": "A1", "qty": 2}))
        );
        assert_eq!(extract_from_path(&ctx, "body.tags"), Some(json!(["a", "b"])));
        assert_eq!(extract_from_path(&ctx, "body.note"), Some(Value::Null));
        assert_eq!(extract_from_path(&ctx, "body.missing"), None);
    }

    #[test]
    fn test_arrays_are_not_indexable() {
        let ctx = request();
        assert_eq!(extract_from_path(&ctx, "body.tags.0"), None);
    }

    #[test]
    fn test_scalar_cannot_be_descended() {
        let ctx = request();
        assert_eq!(extract_from_path(&ctx, "body.item.sku.length"), None);
    }

    #[test]
    fn test_extract_headers_and_query() {
        let ctx = request();
        assert_eq!(
            extract_from_path(&ctx, "headers.x-user-id"),
            Some(json!("user-7"))
        );
        assert_eq!(
            extract_from_path(&ctx, "headers.X-User-Id"),
            Some(json!("user-7"))
        );
        assert_eq!(extract_from_path(&ctx, "query.coupon"), Some(json!("SAVE10")));
        assert_eq!(extract_from_path(&ctx, "query.coupon.code"), None);
        assert_eq!(
            extract_from_path(&ctx, "query"),
            Some(json!({"coupon": "SAVE10"}))
        );
    }

    #[test]
    fn test_unknown_root_rejected() {
        let ctx = request();
        assert_eq!(extract_from_path(&ctx, "params.id"), None);
        assert_eq!(extract_from_path(&ctx, "item.sku"), None);
        assert_eq!(extract_from_path(&ctx, ""), None);
    }

    #[test]
    fn test_denylisted_segments_rejected() {
        let ctx = HttpRequestContext::new("POST", "/x").with_body(json!({
            "__proto__": {"polluted": true},
            "constructor": {"prototype": {"polluted": true}},
            "safe": {"prototype": 1}
        }));
        assert_eq!(extract_from_path(&ctx, "body.__proto__"), None);
        assert_eq!(extract_from_path(&ctx, "body.__proto__.polluted"), None);
        assert_eq!(extract_from_path(&ctx, "body.constructor.prototype"), None);
        assert_eq!(extract_from_path(&ctx, "body.safe.prototype"), None);
    }

    #[test]
    fn test_empty_segments_rejected() {
        let ctx = request();
        assert_eq!(extract_from_path(&ctx, "body..item"), None);
        assert_eq!(extract_from_path(&ctx, "body.item."), None);
    }

    #[test]
    fn test_missing_body() {
        let ctx = HttpRequestContext::new("GET", "/x");
        assert_eq!(extract_from_path(&ctx, "body.id"), None);
        assert_eq!(extract_from_path(&ctx, "body"), None);
    }
}
