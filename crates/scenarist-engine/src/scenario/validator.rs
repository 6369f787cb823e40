//! Structural validation of scenario definitions.
//!
//! Runs at registration time; every problem found is reported with its location so
//! a broken catalog can be fixed in one pass.

use super::types::{
    AfterResponse, MockDefinition, ResponseVariant, ScenarioDefinition, StateCondition,
};
use crate::context::MockResponse;
use crate::error::ValidationIssue;
use crate::predicate::{is_safe_segment, PathRoot};
use crate::state::StateKey;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Validate a complete scenario definition.
pub fn validate_scenario(scenario: &ScenarioDefinition) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if scenario.id.trim().is_empty() {
        issues.push(ValidationIssue::new("id", "Scenario id must not be empty"));
    }
    if scenario.name.trim().is_empty() {
        issues.push(ValidationIssue::new("name", "Scenario name must not be empty"));
    }

    for (idx, mock) in scenario.mocks.iter().enumerate() {
        validate_mock(&format!("mocks[{idx}]"), mock, &mut issues);
    }

    issues
}

/// Validate a single mock definition.
pub fn validate_mock(location: &str, mock: &MockDefinition, issues: &mut Vec<ValidationIssue>) {
    check_method(location, &mock.method, issues);

    if mock.url.as_str().trim().is_empty() {
        issues.push(ValidationIssue::new(
            format!("{location}.url"),
            "URL pattern must not be empty",
        ));
    }

    if let Some(criteria) = &mock.match_criteria {
        for name in criteria.headers.iter().flat_map(|h| h.keys()) {
            if name.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    format!("{location}.match.headers"),
                    "Header names must not be empty",
                ));
            }
        }
    }

    match &mock.response {
        ResponseVariant::Static(response) => {
            check_response(&format!("{location}.response"), response, issues);
        }
        ResponseVariant::Sequence(sequence) => {
            if sequence.responses.is_empty() {
                issues.push(ValidationIssue::new(
                    format!("{location}.sequence.responses"),
                    "Sequence must contain at least one response",
                ));
            }
            for (i, response) in sequence.responses.iter().enumerate() {
                check_response(
                    &format!("{location}.sequence.responses[{i}]"),
                    response,
                    issues,
                );
            }
        }
        ResponseVariant::StateConditional(state_response) => {
            check_response(
                &format!("{location}.stateResponse.default"),
                &state_response.default,
                issues,
            );
            for (i, condition) in state_response.conditions.iter().enumerate() {
                check_condition(
                    &format!("{location}.stateResponse.conditions[{i}]"),
                    condition,
                    issues,
                );
            }
        }
    }

    if let Some(capture) = &mock.capture_state {
        check_capture(&format!("{location}.captureState"), capture, issues);
    }
    if let Some(after) = &mock.after_response {
        check_after_response(&format!("{location}.afterResponse"), after, issues);
    }
}

fn check_method(location: &str, method: &str, issues: &mut Vec<ValidationIssue>) {
    if method == "*" {
        return;
    }
    if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
        issues.push(ValidationIssue::new(
            format!("{location}.method"),
            format!("Invalid HTTP method '{method}'"),
        ));
    }
}

fn check_response(location: &str, response: &MockResponse, issues: &mut Vec<ValidationIssue>) {
    if !(100..=599).contains(&response.status) {
        issues.push(ValidationIssue::new(
            format!("{location}.status"),
            format!(
                "Status {} is out of valid range (100-599)",
                response.status
            ),
        ));
    }
}

fn check_condition(location: &str, condition: &StateCondition, issues: &mut Vec<ValidationIssue>) {
    if condition.when.is_empty() {
        issues.push(ValidationIssue::new(
            format!("{location}.when"),
            "Condition must declare at least one state key",
        ));
    }
    check_state_keys(&format!("{location}.when"), &condition.when, issues);
    check_response(&format!("{location}.then"), &condition.then, issues);
    if let Some(after) = &condition.after_response {
        check_after_response(&format!("{location}.afterResponse"), after, issues);
    }
}

fn check_capture(
    location: &str,
    capture: &BTreeMap<String, String>,
    issues: &mut Vec<ValidationIssue>,
) {
    for (key, path) in capture {
        if !is_valid_state_key(key) {
            issues.push(ValidationIssue::new(
                location,
                format!("Invalid state key '{key}'"),
            ));
        }

        let mut segments = path.split('.');
        let root_ok = segments.next().and_then(PathRoot::parse).is_some();
        if !root_ok {
            issues.push(ValidationIssue::new(
                format!("{location}.{key}"),
                format!("Capture path '{path}' must start with 'body', 'headers' or 'query'"),
            ));
        } else if !segments.all(is_safe_segment) {
            issues.push(ValidationIssue::new(
                format!("{location}.{key}"),
                format!("Capture path '{path}' contains an empty or reserved segment"),
            ));
        }
    }
}

fn check_after_response(location: &str, after: &AfterResponse, issues: &mut Vec<ValidationIssue>) {
    check_state_keys(&format!("{location}.setState"), &after.set_state, issues);
}

fn check_state_keys(location: &str, map: &Map<String, Value>, issues: &mut Vec<ValidationIssue>) {
    for key in map.keys() {
        if !is_valid_state_key(key) {
            issues.push(ValidationIssue::new(
                location,
                format!("Invalid state key '{key}'"),
            ));
        }
    }
}

/// State keys are non-empty dot paths with an optional trailing `[]`.
fn is_valid_state_key(key: &str) -> bool {
    let parsed = StateKey::parse(key);
    parsed.segments.iter().all(|s| !s.is_empty())
}
