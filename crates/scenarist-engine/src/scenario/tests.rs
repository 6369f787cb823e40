//! Tests for the scenario data model.
//!
//! Covers the authored JSON/YAML format:
//! - Response variant mapping (`response` / `sequence` / `stateResponse`)
//! - URL pattern classification
//! - Optional fields and defaults

use super::*;
use crate::context::MockResponse;
use crate::predicate::UrlPattern;
use serde_json::json;

#[test]
fn test_static_mock_from_json() {
    let mock: MockDefinition = serde_json::from_value(json!({
        "method": "get",
        "url": "/cart/status",
        "response": {"status": 200, "body": {"status": "unknown"}, "delay": 25}
    }))
    .unwrap();

    assert_eq!(mock.method, "GET");
    assert_eq!(mock.url, UrlPattern::Exact("/cart/status".to_string()));
    assert!(mock.match_criteria.is_none());
    assert_eq!(
        mock.response,
        ResponseVariant::Static(
            MockResponse::json(200, json!({"status": "unknown"})).with_delay(25)
        )
    );
}

#[test]
fn test_sequence_repeat_defaults_to_last() {
    let mock: MockDefinition = serde_json::from_value(json!({
        "method": "POST",
        "url": "/payments",
        "sequence": {"responses": [{"status": 202}, {"status": 200}]}
    }))
    .unwrap();

    match mock.response {
        ResponseVariant::Sequence(seq) => {
            assert_eq!(seq.repeat, RepeatMode::Last);
            assert_eq!(seq.responses.len(), 2);
        }
        other => panic!("expected sequence, got {}", other.kind()),
    }
}

#[test]
fn test_state_response_with_after_response() {
    let mock: MockDefinition = serde_json::from_value(json!({
        "method": "GET",
        "url": "/checkout",
        "stateResponse": {
            "default": {"status": 400},
            "conditions": [{
                "when": {"step": "reviewing"},
                "then": {"status": 200},
                "afterResponse": {"setState": {"step": "done"}}
            }]
        }
    }))
    .unwrap();

    let ResponseVariant::StateConditional(state) = &mock.response else {
        panic!("expected stateResponse");
    };
    assert_eq!(state.default.status, 400);
    assert_eq!(state.conditions[0].specificity(), 1);
    assert_eq!(
        state.conditions[0].after_response.as_ref().unwrap().set_state["step"],
        json!("done")
    );
}

#[test]
fn test_mock_requires_exactly_one_variant() {
    let none = serde_json::from_value::<MockDefinition>(json!({
        "method": "GET", "url": "/x"
    }));
    assert!(none.unwrap_err().to_string().contains("declares no response"));

    let both = serde_json::from_value::<MockDefinition>(json!({
        "method": "GET", "url": "/x",
        "response": {"status": 200},
        "sequence": {"responses": [{"status": 200}]}
    }));
    assert!(both.unwrap_err().to_string().contains("more than one"));
}

#[test]
fn test_url_pattern_kinds() {
    let cases = [
        (json!("/users/:id"), UrlPattern::Template("/users/:id".to_string())),
        (json!("/cart/*"), UrlPattern::Glob("/cart/*".to_string())),
        (json!("/api/**"), UrlPattern::Glob("/api/**".to_string())),
        (
            json!("https://api.example.com/cart"),
            UrlPattern::Exact("https://api.example.com/cart".to_string()),
        ),
        (
            json!("http://localhost:3000/users/:id"),
            UrlPattern::Template("http://localhost:3000/users/:id".to_string()),
        ),
        (
            json!({"regex": "^/api/v\\d+/items$"}),
            UrlPattern::Regex("^/api/v\\d+/items$".to_string()),
        ),
    ];
    for (raw, expected) in cases {
        let mock: MockDefinition = serde_json::from_value(json!({
            "method": "GET", "url": raw, "response": {"status": 200}
        }))
        .unwrap();
        assert_eq!(mock.url, expected);
    }
}

#[test]
fn test_match_criteria_and_capture() {
    let mock: MockDefinition = serde_json::from_value(json!({
        "method": "POST",
        "url": "/cart/items",
        "match": {
            "body": {"sku": "A1"},
            "headers": {"x-tier": "gold"},
            "query": {"dry": "1"}
        },
        "captureState": {"cart.items[]": "body.sku"},
        "response": {"status": 201}
    }))
    .unwrap();

    assert_eq!(mock.specificity(), 3);
    assert_eq!(
        mock.capture_state.as_ref().unwrap().get("cart.items[]"),
        Some(&"body.sku".to_string())
    );
}

#[test]
fn test_scenario_from_yaml() {
    let yaml = r#"
id: cart
name: Cart flow
description: Items in the cart
mocks:
  - method: GET
    url: /cart/status
    sequence:
      repeat: none
      responses:
        - status: 200
          body: { state: pending }
        - status: 200
          body: { state: ready }
"#;
    let scenario: ScenarioDefinition = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(scenario.id, "cart");
    assert_eq!(scenario.description.as_deref(), Some("Items in the cart"));
    assert!(!scenario.is_default());

    let ResponseVariant::Sequence(seq) = &scenario.mocks[0].response else {
        panic!("expected sequence");
    };
    assert_eq!(seq.repeat, RepeatMode::None);
    assert_eq!(seq.responses[1].body, Some(json!({"state": "ready"})));
}

#[test]
fn test_serialize_uses_authored_field_names() {
    let mock = MockDefinition::fixed("GET", "/x", MockResponse::new(204))
        .with_capture("last", "query.id");
    let value = serde_json::to_value(&mock).unwrap();
    assert_eq!(
        value,
        json!({
            "method": "GET",
            "url": "/x",
            "response": {"status": 204},
            "captureState": {"last": "query.id"}
        })
    );
}

#[test]
fn test_default_scenario_id() {
    assert!(ScenarioDefinition::new(DEFAULT_SCENARIO_ID, "Default").is_default());
}
