//! Request match criteria (body, headers, query) and specificity scoring.
//!
//! All declared groups must hold simultaneously:
//! - body: partial match, every declared key present in the request body with a
//!   structurally equal value (see [`deep_equals`]); extra body fields are ignored
//! - headers: exact value match on the declared names (names compared case-insensitively)
//! - query: exact value match on the declared keys
//!
//! Extra headers and query parameters on the request are ignored.

use crate::context::HttpRequestContext;
use crate::value::deep_equals;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<HashMap<String, String>>,
}

impl MatchCriteria {
    /// Number of declared body + header + query fields.
    pub fn specificity(&self) -> usize {
        self.body.as_ref().map_or(0, Map::len)
            + self.headers.as_ref().map_or(0, HashMap::len)
            + self.query.as_ref().map_or(0, HashMap::len)
    }

    /// Check if a request satisfies every declared criteria group.
    pub fn matches(&self, ctx: &HttpRequestContext) -> bool {
        self.matches_body(ctx.body.as_ref())
            && self.matches_headers(&ctx.headers)
            && self.matches_query(&ctx.query)
    }

    fn matches_body(&self, body: Option<&Value>) -> bool {
        let Some(expected) = &self.body else {
            return true;
        };
        if expected.is_empty() {
            return true;
        }
        let Some(Value::Object(actual)) = body else {
            return false;
        };
        expected
            .iter()
            .all(|(key, expected_value)| {
                actual
                    .get(key)
                    .is_some_and(|actual_value| deep_equals(actual_value, expected_value))
            })
    }

    fn matches_headers(&self, headers: &HashMap<String, String>) -> bool {
        let Some(expected) = &self.headers else {
            return true;
        };
        expected.iter().all(|(name, expected_value)| {
            let actual = headers.get(name).or_else(|| {
                let lower = name.to_lowercase();
                headers
                    .iter()
                    .find(|(k, _)| k.to_lowercase() == lower)
                    .map(|(_, v)| v)
            });
            actual == Some(expected_value)
        })
    }

    fn matches_query(&self, query: &HashMap<String, String>) -> bool {
        let Some(expected) = &self.query else {
            return true;
        };
        expected
            .iter()
            .all(|(name, expected_value)| query.get(name) == Some(expected_value))
    }
}
