//! Type definitions for scenarios and mocks.
//!
//! Definitions are plain data: they deserialize from JSON/YAML scenario files and are
//! immutable once registered. Compiled forms live in [`super::registry`].

use crate::context::MockResponse;
use crate::predicate::{MatchCriteria, UrlPattern};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Id of the scenario every catalog must provide as the universal fallback.
pub const DEFAULT_SCENARIO_ID: &str = "default";

// ============================================================================
// Scenario Types
// ============================================================================

/// A named, immutable bundle of mock definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDefinition {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub mocks: Vec<MockDefinition>,
}

impl ScenarioDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            mocks: Vec::new(),
        }
    }

    pub fn with_mock(mut self, mock: MockDefinition) -> Self {
        self.mocks.push(mock);
        self
    }

    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_SCENARIO_ID
    }
}

/// Per-test-id record of the currently active scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveScenario {
    pub scenario_id: String,
    pub activated_at: DateTime<Utc>,
}

impl ActiveScenario {
    pub fn new(scenario_id: impl Into<String>) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            activated_at: Utc::now(),
        }
    }
}

// ============================================================================
// Mock Types
// ============================================================================

/// A single mock: request matcher plus response variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MockDefinitionRaw", into = "MockDefinitionRaw")]
pub struct MockDefinition {
    /// HTTP method (upper-cased); `*` matches any method
    pub method: String,
    pub url: UrlPattern,
    pub match_criteria: Option<MatchCriteria>,
    pub response: ResponseVariant,
    /// State key -> request path expression (e.g., `"cart.items[]": "body.item"`)
    pub capture_state: Option<BTreeMap<String, String>>,
    pub after_response: Option<AfterResponse>,
}

impl MockDefinition {
    pub fn new(method: &str, url: &str, response: ResponseVariant) -> Self {
        Self {
            method: method.to_uppercase(),
            url: UrlPattern::parse(url),
            match_criteria: None,
            response,
            capture_state: None,
            after_response: None,
        }
    }

    /// Mock answering with a single static response.
    pub fn fixed(method: &str, url: &str, response: MockResponse) -> Self {
        Self::new(method, url, ResponseVariant::Static(response))
    }

    pub fn with_match(mut self, criteria: MatchCriteria) -> Self {
        self.match_criteria = Some(criteria);
        self
    }

    pub fn with_capture(mut self, state_key: &str, path: &str) -> Self {
        self.capture_state
            .get_or_insert_with(BTreeMap::new)
            .insert(state_key.to_string(), path.to_string());
        self
    }

    pub fn with_after_response(mut self, set_state: Map<String, Value>) -> Self {
        self.after_response = Some(AfterResponse { set_state });
        self
    }

    /// Specificity of the declared match criteria; criteria-less mocks score zero.
    pub fn specificity(&self) -> usize {
        self.match_criteria
            .as_ref()
            .map_or(0, MatchCriteria::specificity)
    }
}

/// How a mock produces its response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponseVariant {
    Static(MockResponse),
    Sequence(SequenceSpec),
    StateConditional(StateResponse),
}

impl ResponseVariant {
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseVariant::Static(_) => "response",
            ResponseVariant::Sequence(_) => "sequence",
            ResponseVariant::StateConditional(_) => "stateResponse",
        }
    }
}

/// Ordered responses advanced one step per matching request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceSpec {
    pub responses: Vec<MockResponse>,
    #[serde(default)]
    pub repeat: RepeatMode,
}

/// What happens once a sequence reaches its last response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Keep returning the last response
    #[default]
    Last,
    /// Wrap around to the first response
    Cycle,
    /// Stop matching once every response has been served
    None,
}

/// Response chosen by evaluating current test state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateResponse {
    #[serde(default)]
    pub conditions: Vec<StateCondition>,
    pub default: MockResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateCondition {
    /// State key (dot path) -> expected value
    pub when: Map<String, Value>,
    pub then: MockResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_response: Option<AfterResponse>,
}

impl StateCondition {
    pub fn specificity(&self) -> usize {
        self.when.len()
    }
}

/// State mutations applied after a response has been resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AfterResponse {
    #[serde(default)]
    pub set_state: Map<String, Value>,
}

// ============================================================================
// Wire format
// ============================================================================

/// Mock as authored: the response variant is spread over mutually exclusive fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MockDefinitionRaw {
    pub method: String,
    pub url: UrlPattern,
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_criteria: Option<MatchCriteria>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<MockResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<SequenceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_response: Option<StateResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_state: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_response: Option<AfterResponse>,
}

impl TryFrom<MockDefinitionRaw> for MockDefinition {
    type Error = String;

    fn try_from(raw: MockDefinitionRaw) -> Result<Self, Self::Error> {
        let response = match (raw.response, raw.sequence, raw.state_response) {
            (Some(r), None, None) => ResponseVariant::Static(r),
            (None, Some(s), None) => ResponseVariant::Sequence(s),
            (None, None, Some(s)) => ResponseVariant::StateConditional(s),
            (None, None, None) => {
                return Err(format!(
                    "mock {} {} declares no response; add one of `response`, `sequence` or `stateResponse`",
                    raw.method,
                    raw.url.as_str()
                ))
            }
            _ => {
                return Err(format!(
                    "mock {} {} declares more than one of `response`, `sequence` and `stateResponse`",
                    raw.method,
                    raw.url.as_str()
                ))
            }
        };

        Ok(MockDefinition {
            method: raw.method.to_uppercase(),
            url: raw.url,
            match_criteria: raw.match_criteria,
            response,
            capture_state: raw.capture_state,
            after_response: raw.after_response,
        })
    }
}

impl From<MockDefinition> for MockDefinitionRaw {
    fn from(mock: MockDefinition) -> Self {
        let (response, sequence, state_response) = match mock.response {
            ResponseVariant::Static(r) => (Some(r), None, None),
            ResponseVariant::Sequence(s) => (None, Some(s), None),
            ResponseVariant::StateConditional(s) => (None, None, Some(s)),
        };
        MockDefinitionRaw {
            method: mock.method,
            url: mock.url,
            match_criteria: mock.match_criteria,
            response,
            sequence,
            state_response,
            capture_state: mock.capture_state,
            after_response: mock.after_response,
        }
    }
}
