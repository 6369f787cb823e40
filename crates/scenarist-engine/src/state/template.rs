//! Response templating from per-test state.
//!
//! String leaves in a response body and header values may reference state with
//! `{{state.<dot.path>}}`.
//!
//! - A string that is exactly one placeholder is replaced by the raw state value,
//!   so arrays, objects and numbers keep their type (missing values become `null`).
//! - Placeholders embedded in longer strings are stringified (missing values become
//!   the empty string).
//!
//! # Example
//!
//! ```yaml
//! response:
//!   status: 200
//!   body:
//!     items: "{{state.cart.items}}"
//!     greeting: "Hello {{state.user.name}}"
//! ```

use super::path::get_path;
use crate::context::MockResponse;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

static TEMPLATE_REGEX: OnceLock<Regex> = OnceLock::new();
static WHOLE_TEMPLATE_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_template_regex() -> &'static Regex {
    TEMPLATE_REGEX.get_or_init(|| {
        Regex::new(r"\{\{\s*state\.([A-Za-z0-9_\-.\[\]]+?)\s*\}\}")
            .expect("template regex is valid")
    })
}

fn get_whole_template_regex() -> &'static Regex {
    WHOLE_TEMPLATE_REGEX.get_or_init(|| {
        Regex::new(r"^\{\{\s*state\.([A-Za-z0-9_\-.\[\]]+?)\s*\}\}$")
            .expect("template regex is valid")
    })
}

/// Check if a string contains state template variables
pub fn has_template_variables(s: &str) -> bool {
    s.contains("{{") && get_template_regex().is_match(s)
}

/// Render every state placeholder in a response.
pub fn render_response(response: &MockResponse, state: &Map<String, Value>) -> MockResponse {
    let mut rendered = response.clone();
    if let Some(body) = rendered.body.as_mut() {
        render_value(body, state);
    }
    for value in rendered.headers.values_mut() {
        if has_template_variables(value) {
            *value = render_embedded(value, state);
        }
    }
    rendered
}

fn render_value(value: &mut Value, state: &Map<String, Value>) {
    match value {
        Value::String(s) if has_template_variables(s) => {
            *value = render_string(s, state);
        }
        Value::Array(items) => items.iter_mut().for_each(|item| render_value(item, state)),
        Value::Object(map) => map.values_mut().for_each(|v| render_value(v, state)),
        _ => {}
    }
}

fn render_string(s: &str, state: &Map<String, Value>) -> Value {
    if let Some(caps) = get_whole_template_regex().captures(s) {
        return get_path(state, &caps[1]).cloned().unwrap_or(Value::Null);
    }
    Value::String(render_embedded(s, state))
}

fn render_embedded(s: &str, state: &Map<String, Value>) -> String {
    get_template_regex()
        .replace_all(s, |caps: &regex::Captures| match get_path(state, &caps[1]) {
            Some(Value::String(v)) => v.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        })
        .to_string()
}
