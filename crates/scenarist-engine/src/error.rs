//! Error taxonomy for the resolution engine.
//!
//! Registration-time errors (`DuplicateScenario`, `ScenarioValidation`) always abort
//! the registration call. Request-time errors (`NoMockFound`, `MissingTestId`) are
//! routed through the configured [`ErrorBehavior`](crate::config::ErrorBehavior).

use serde::Serialize;
use std::fmt;

/// A single problem found while validating a scenario definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Location within the scenario (e.g., "mocks[2].sequence.responses").
    pub location: String,
    /// Human-readable description of the issue.
    pub message: String,
}

impl ValidationIssue {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Scenario '{scenario_id}' is already registered with a different definition")]
    DuplicateScenario { scenario_id: String },

    #[error("Scenario '{scenario_id}' is invalid: {}", join_issues(.issues))]
    ScenarioValidation {
        scenario_id: String,
        issues: Vec<ValidationIssue>,
    },

    #[error("Scenario '{scenario_id}' not found")]
    ScenarioNotFound { scenario_id: String },

    #[error("No mock matched {method} {url} (test id '{test_id}', scenario '{scenario_id}')")]
    NoMockFound {
        test_id: String,
        scenario_id: String,
        method: String,
        url: String,
    },

    #[error("No state condition matched for test id '{test_id}' in scenario '{scenario_id}'")]
    NoStateMatch {
        test_id: String,
        scenario_id: String,
    },

    #[error("Request {method} {url} carries no test id (expected header '{header}')")]
    MissingTestId {
        method: String,
        url: String,
        header: String,
    },
}

impl EngineError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::DuplicateScenario { .. } => "DUPLICATE_SCENARIO",
            EngineError::ScenarioValidation { .. } => "SCENARIO_VALIDATION_ERROR",
            EngineError::ScenarioNotFound { .. } => "SCENARIO_NOT_FOUND",
            EngineError::NoMockFound { .. } => "NO_MOCK_FOUND",
            EngineError::NoStateMatch { .. } => "NO_STATE_MATCH",
            EngineError::MissingTestId { .. } => "MISSING_TEST_ID",
        }
    }

    /// Remediation hint meant to be read directly in test failure output.
    pub fn hint(&self) -> String {
        match self {
            EngineError::DuplicateScenario { scenario_id } => format!(
                "Each scenario id must be unique. Rename one of the scenarios called '{scenario_id}' \
                 or register the same definition only once"
            ),
            EngineError::ScenarioValidation { .. } => {
                "Fix the listed fields in the scenario definition before registering it".to_string()
            }
            EngineError::ScenarioNotFound { scenario_id } => format!(
                "Register a scenario with id '{scenario_id}' before switching to it, \
                 or check the id for typos"
            ),
            EngineError::NoMockFound {
                scenario_id,
                method,
                url,
                ..
            } => format!(
                "Add a mock for {method} {url} to scenario '{scenario_id}' or to the default \
                 scenario, or check that its match criteria agree with the request"
            ),
            EngineError::NoStateMatch { .. } => {
                "Add a default response to the state-conditional mock".to_string()
            }
            EngineError::MissingTestId { header, .. } => format!(
                "Send the '{header}' header with every request, or configure a default test id"
            ),
        }
    }

    /// Whether this error is raised while resolving a request (as opposed to registration).
    pub fn is_request_time(&self) -> bool {
        matches!(
            self,
            EngineError::NoMockFound { .. }
                | EngineError::NoStateMatch { .. }
                | EngineError::MissingTestId { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_issues() {
        let err = EngineError::ScenarioValidation {
            scenario_id: "cart".to_string(),
            issues: vec![
                ValidationIssue::new("mocks[0].method", "Method must not be empty"),
                ValidationIssue::new("mocks[1].sequence.responses", "Sequence has no responses"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("Scenario 'cart' is invalid"));
        assert!(msg.contains("mocks[0].method: Method must not be empty"));
        assert!(msg.contains("mocks[1].sequence.responses"));
        assert_eq!(err.code(), "SCENARIO_VALIDATION_ERROR");
    }

    #[test]
    fn test_no_mock_found_context() {
        let err = EngineError::NoMockFound {
            test_id: "t1".to_string(),
            scenario_id: "cart".to_string(),
            method: "GET".to_string(),
            url: "/cart/status".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No mock matched GET /cart/status (test id 't1', scenario 'cart')"
        );
        assert!(err.hint().contains("GET /cart/status"));
        assert!(err.is_request_time());
    }

    #[test]
    fn test_registration_errors_are_not_request_time() {
        let dup = EngineError::DuplicateScenario {
            scenario_id: "x".to_string(),
        };
        assert!(!dup.is_request_time());
        assert_eq!(dup.code(), "DUPLICATE_SCENARIO");
    }

    #[test]
    fn test_missing_test_id_hint_names_header() {
        let err = EngineError::MissingTestId {
            method: "POST".to_string(),
            url: "/orders".to_string(),
            header: "x-scenarist-test-id".to_string(),
        };
        assert!(err.hint().contains("x-scenarist-test-id"));
    }
}
