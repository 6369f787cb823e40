//! Response selection.
//!
//! Given the candidate mocks for a request (already filtered by method and URL), the
//! selector picks the best match, resolves its concrete response, and applies the
//! mock's state side effects:
//!
//! 1. Sequence mocks whose cursor is exhausted are skipped.
//! 2. Mocks with match criteria that hold for the request outrank every fallback
//!    mock (one without criteria); among them the highest specificity wins, ties going
//!    to the earliest candidate.
//! 3. Without a criteria match, a fallback mock answers: the active scenario's first
//!    fallback shadows the default scenario's, otherwise the first one wins.
//! 4. The winner's variant is resolved (static, sequence cursor, or state condition).
//! 5. `captureState`, then `afterResponse.setState` are written to the test id's state.
//! 6. `{{state.*}}` placeholders in the response are rendered from the final state.
//!
//! Side effects are applied before the response is returned; a transport failure
//! afterwards does not roll them back.

use crate::context::{HttpRequestContext, MockResponse};
use crate::error::EngineError;
use crate::predicate::extract_from_path;
use crate::scenario::{AfterResponse, MockDefinition, ResponseVariant};
use crate::sequence::SequenceTracker;
use crate::state::{find_matching_condition, render_response, StateManager};
use std::sync::Arc;
use tracing::debug;

/// A mock eligible for a request, with its stable index within the active scenario's
/// candidate list (sequence cursors are keyed by it).
#[derive(Debug, Clone, Copy)]
pub struct CandidateMock<'a> {
    pub index: usize,
    pub mock: &'a MockDefinition,
    /// Contributed by the default scenario rather than the active one
    pub from_default: bool,
}

impl<'a> CandidateMock<'a> {
    pub fn new(index: usize, mock: &'a MockDefinition) -> Self {
        Self {
            index,
            mock,
            from_default: false,
        }
    }

    pub fn from_default(index: usize, mock: &'a MockDefinition) -> Self {
        Self {
            from_default: true,
            ..Self::new(index, mock)
        }
    }
}

pub struct ResponseSelector {
    sequences: Arc<dyn SequenceTracker>,
    state: Arc<dyn StateManager>,
}

impl ResponseSelector {
    pub fn new(sequences: Arc<dyn SequenceTracker>, state: Arc<dyn StateManager>) -> Self {
        Self { sequences, state }
    }

    /// Select and resolve the response for a request.
    pub fn select_response(
        &self,
        test_id: &str,
        scenario_id: &str,
        ctx: &HttpRequestContext,
        candidates: &[CandidateMock<'_>],
    ) -> Result<MockResponse, EngineError> {
        // Candidates whose sequence ran out between ranking and resolution
        let mut exhausted = Vec::new();

        loop {
            let Some((position, candidate)) =
                self.find_best(test_id, scenario_id, ctx, candidates, &exhausted)
            else {
                return Err(EngineError::NoMockFound {
                    test_id: test_id.to_string(),
                    scenario_id: scenario_id.to_string(),
                    method: ctx.method.clone(),
                    url: ctx.url.clone(),
                });
            };

            let Some((response, condition_after)) =
                self.resolve_variant(test_id, scenario_id, candidate)
            else {
                exhausted.push(position);
                continue;
            };

            debug!(
                "Test id '{}' matched mock #{} ({} {}) in scenario '{}'",
                test_id,
                candidate.index,
                candidate.mock.method,
                candidate.mock.url.as_str(),
                scenario_id
            );

            self.capture_state(test_id, ctx, candidate.mock);
            if let Some(after) = &candidate.mock.after_response {
                self.apply_after_response(test_id, after);
            }
            if let Some(after) = condition_after {
                self.apply_after_response(test_id, after);
            }

            let state = self.state.get_all(test_id);
            return Ok(render_response(&response, &state));
        }
    }

    /// Rank candidates, returning the winner and its position in `candidates`.
    fn find_best<'c, 'm>(
        &self,
        test_id: &str,
        scenario_id: &str,
        ctx: &HttpRequestContext,
        candidates: &'c [CandidateMock<'m>],
        skip: &[usize],
    ) -> Option<(usize, &'c CandidateMock<'m>)> {
        let mut best: Option<(usize, &CandidateMock, usize)> = None;
        let mut fallback: Option<(usize, &CandidateMock)> = None;

        for (position, candidate) in candidates.iter().enumerate() {
            if skip.contains(&position) || self.is_exhausted(test_id, scenario_id, candidate) {
                continue;
            }

            match &candidate.mock.match_criteria {
                Some(criteria) => {
                    if !criteria.matches(ctx) {
                        continue;
                    }
                    let specificity = criteria.specificity();
                    // Strictly greater keeps the earliest candidate on a tie
                    if best.is_none_or(|(_, _, current)| specificity > current) {
                        best = Some((position, candidate, specificity));
                    }
                }
                None => {
                    let shadows = fallback
                        .is_none_or(|(_, current)| current.from_default && !candidate.from_default);
                    if shadows {
                        fallback = Some((position, candidate));
                    }
                }
            }
        }

        best.map(|(position, candidate, _)| (position, candidate))
            .or(fallback)
    }

    fn is_exhausted(&self, test_id: &str, scenario_id: &str, candidate: &CandidateMock) -> bool {
        matches!(candidate.mock.response, ResponseVariant::Sequence(_))
            && self
                .sequences
                .get_position(test_id, scenario_id, candidate.index)
                .exhausted
    }

    /// Resolve the concrete response of a variant.
    ///
    /// Returns `None` only for a sequence that has nothing left to serve.
    fn resolve_variant<'m>(
        &self,
        test_id: &str,
        scenario_id: &str,
        candidate: &CandidateMock<'m>,
    ) -> Option<(MockResponse, Option<&'m AfterResponse>)> {
        match &candidate.mock.response {
            ResponseVariant::Static(response) => Some((response.clone(), None)),
            ResponseVariant::Sequence(sequence) => {
                let served = self.sequences.advance(
                    test_id,
                    scenario_id,
                    candidate.index,
                    sequence.responses.len(),
                    sequence.repeat,
                )?;
                sequence
                    .responses
                    .get(served)
                    .map(|response| (response.clone(), None))
            }
            ResponseVariant::StateConditional(state_response) => {
                let current = self.state.get_all(test_id);
                match find_matching_condition(&state_response.conditions, &current) {
                    Some(condition) => {
                        Some((condition.then.clone(), condition.after_response.as_ref()))
                    }
                    None => Some((state_response.default.clone(), None)),
                }
            }
        }
    }

    /// Copy request fields into state. Paths that resolve to nothing are skipped.
    fn capture_state(&self, test_id: &str, ctx: &HttpRequestContext, mock: &MockDefinition) {
        let Some(capture) = &mock.capture_state else {
            return;
        };
        for (key, path) in capture {
            match extract_from_path(ctx, path) {
                Some(value) => self.state.set(test_id, key, value),
                None => debug!("Capture path '{}' not found in request, skipping", path),
            }
        }
    }

    fn apply_after_response(&self, test_id: &str, after: &AfterResponse) {
        for (key, value) in &after.set_state {
            self.state.set(test_id, key, value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::MatchCriteria;
    use crate::scenario::{RepeatMode, SequenceSpec, StateCondition, StateResponse};
    use crate::sequence::InMemorySequenceTracker;
    use crate::state::InMemoryStateManager;
    use serde_json::{json, Map, Value};

    struct Fixture {
        selector: ResponseSelector,
        state: Arc<InMemoryStateManager>,
    }

    fn fixture() -> Fixture {
        let state = Arc::new(InMemoryStateManager::new());
        let selector = ResponseSelector::new(
            Arc::new(InMemorySequenceTracker::new()),
            Arc::clone(&state) as Arc<dyn StateManager>,
        );
        Fixture { selector, state }
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn body_criteria(body: Value) -> MatchCriteria {
        MatchCriteria {
            body: Some(object(body)),
            ..Default::default()
        }
    }

    fn candidates(mocks: &[MockDefinition]) -> Vec<CandidateMock<'_>> {
        mocks
            .iter()
            .enumerate()
            .map(|(i, m)| CandidateMock::new(i, m))
            .collect()
    }

    fn status(f: &Fixture, ctx: &HttpRequestContext, mocks: &[MockDefinition]) -> u16 {
        f.selector
            .select_response("t1", "s", ctx, &candidates(mocks))
            .unwrap()
            .status
    }

    fn sequence(statuses: &[u16], repeat: RepeatMode) -> ResponseVariant {
        ResponseVariant::Sequence(SequenceSpec {
            responses: statuses.iter().map(|s| MockResponse::new(*s)).collect(),
            repeat,
        })
    }

    #[test]
    fn test_higher_specificity_wins_regardless_of_order() {
        let f = fixture();
        let a = MockDefinition::fixed("POST", "/x", MockResponse::new(201))
            .with_match(body_criteria(json!({"a": 1})));
        let b = MockDefinition::fixed("POST", "/x", MockResponse::new(202))
            .with_match(body_criteria(json!({"a": 1, "b": 2})));
        let ctx = HttpRequestContext::new("POST", "/x").with_body(json!({"a": 1, "b": 2, "c": 3}));

        assert_eq!(status(&f, &ctx, &[a.clone(), b.clone()]), 202);
        assert_eq!(status(&f, &ctx, &[b, a]), 202);
    }

    #[test]
    fn test_tie_goes_to_first_candidate() {
        let f = fixture();
        let first = MockDefinition::fixed("GET", "/x", MockResponse::new(201)).with_match(
            MatchCriteria {
                query: Some([("page".to_string(), "1".to_string())].into()),
                ..Default::default()
            },
        );
        let second = MockDefinition::fixed("GET", "/x", MockResponse::new(202)).with_match(
            MatchCriteria {
                headers: Some([("x-tier".to_string(), "gold".to_string())].into()),
                ..Default::default()
            },
        );
        let ctx = HttpRequestContext::new("GET", "/x?page=1").with_header("X-Tier", "gold");
        assert_eq!(status(&f, &ctx, &[first, second]), 201);
    }

    #[test]
    fn test_fallback_only_when_no_criteria_match() {
        let f = fixture();
        let fallback = MockDefinition::fixed("POST", "/x", MockResponse::new(200));
        let later_fallback = MockDefinition::fixed("POST", "/x", MockResponse::new(299));
        let specific = MockDefinition::fixed("POST", "/x", MockResponse::new(201))
            .with_match(body_criteria(json!({"kind": "special"})));
        let mocks = [fallback, specific, later_fallback];

        let special = HttpRequestContext::new("POST", "/x").with_body(json!({"kind": "special"}));
        let plain = HttpRequestContext::new("POST", "/x").with_body(json!({"kind": "plain"}));
        assert_eq!(status(&f, &special, &mocks), 201);
        assert_eq!(status(&f, &plain, &mocks), 200);
    }

    #[test]
    fn test_active_fallback_shadows_default_fallback() {
        let f = fixture();
        let default = MockDefinition::fixed("GET", "/x", MockResponse::new(200));
        let active = MockDefinition::fixed("GET", "/x", MockResponse::new(201));
        let active_later = MockDefinition::fixed("GET", "/x", MockResponse::new(202));
        let list = [
            CandidateMock::from_default(0, &default),
            CandidateMock::new(1, &active),
            CandidateMock::new(2, &active_later),
        ];
        let ctx = HttpRequestContext::new("GET", "/x");
        let response = f.selector.select_response("t1", "s", &ctx, &list).unwrap();
        assert_eq!(response.status, 201);
    }

    #[test]
    fn test_no_candidates_is_no_mock_found() {
        let f = fixture();
        let ctx = HttpRequestContext::new("GET", "/missing");
        let err = f.selector.select_response("t1", "s", &ctx, &[]).unwrap_err();
        assert_eq!(
            err,
            EngineError::NoMockFound {
                test_id: "t1".to_string(),
                scenario_id: "s".to_string(),
                method: "GET".to_string(),
                url: "/missing".to_string(),
            }
        );
    }

    #[test]
    fn test_unmatched_criteria_is_no_mock_found() {
        let f = fixture();
        let mock = MockDefinition::fixed("POST", "/x", MockResponse::new(201))
            .with_match(body_criteria(json!({"a": 1})));
        let ctx = HttpRequestContext::new("POST", "/x").with_body(json!({"a": 2}));
        let err = f
            .selector
            .select_response("t1", "s", &ctx, &candidates(&[mock]))
            .unwrap_err();
        assert_eq!(err.code(), "NO_MOCK_FOUND");
    }

    #[test]
    fn test_sequence_modes() {
        let ctx = HttpRequestContext::new("GET", "/seq");
        for (repeat, expected) in [
            (RepeatMode::Last, vec![200, 201, 202, 202]),
            (RepeatMode::Cycle, vec![200, 201, 202, 200]),
        ] {
            let f = fixture();
            let mocks = [MockDefinition::new("GET", "/seq", sequence(&[200, 201, 202], repeat))];
            let served: Vec<u16> = (0..4).map(|_| status(&f, &ctx, &mocks)).collect();
            assert_eq!(served, expected);
        }
    }

    #[test]
    fn test_exhausted_sequence_falls_through_to_fallback() {
        let f = fixture();
        let mocks = [
            MockDefinition::fixed("GET", "/seq", MockResponse::new(404)),
            MockDefinition::new("GET", "/seq", sequence(&[200, 201, 202], RepeatMode::None))
                .with_match(MatchCriteria {
                    query: Some([("id".to_string(), "1".to_string())].into()),
                    ..Default::default()
                }),
        ];
        let ctx = HttpRequestContext::new("GET", "/seq?id=1");
        let served: Vec<u16> = (0..5).map(|_| status(&f, &ctx, &mocks)).collect();
        assert_eq!(served, vec![200, 201, 202, 404, 404]);
    }

    #[test]
    fn test_exhausted_sequence_without_fallback() {
        let f = fixture();
        let mocks = [MockDefinition::new("GET", "/seq", sequence(&[200], RepeatMode::None))];
        let ctx = HttpRequestContext::new("GET", "/seq");
        assert_eq!(status(&f, &ctx, &mocks), 200);
        let err = f
            .selector
            .select_response("t1", "s", &ctx, &candidates(&mocks))
            .unwrap_err();
        assert_eq!(err.code(), "NO_MOCK_FOUND");
    }

    #[test]
    fn test_sequences_are_isolated_per_test_id() {
        let f = fixture();
        let mocks = [MockDefinition::new("GET", "/seq", sequence(&[200, 201], RepeatMode::Last))];
        let ctx = HttpRequestContext::new("GET", "/seq");
        let list = candidates(&mocks);

        assert_eq!(f.selector.select_response("a", "s", &ctx, &list).unwrap().status, 200);
        assert_eq!(f.selector.select_response("a", "s", &ctx, &list).unwrap().status, 201);
        assert_eq!(f.selector.select_response("b", "s", &ctx, &list).unwrap().status, 200);
    }

    #[test]
    fn test_state_conditional_prefers_more_specific_condition() {
        let f = fixture();
        let mock = MockDefinition::new(
            "GET",
            "/order",
            ResponseVariant::StateConditional(StateResponse {
                conditions: vec![
                    StateCondition {
                        when: object(json!({"status": "reviewing"})),
                        then: MockResponse::new(201),
                        after_response: None,
                    },
                    StateCondition {
                        when: object(json!({"status": "reviewing", "tier": "gold"})),
                        then: MockResponse::new(202),
                        after_response: None,
                    },
                ],
                default: MockResponse::new(200),
            }),
        );
        let ctx = HttpRequestContext::new("GET", "/order");
        let mocks = [mock];

        assert_eq!(status(&f, &ctx, &mocks), 200);
        f.state.set("t1", "status", json!("reviewing"));
        assert_eq!(status(&f, &ctx, &mocks), 201);
        f.state.set("t1", "tier", json!("gold"));
        assert_eq!(status(&f, &ctx, &mocks), 202);
    }

    #[test]
    fn test_capture_and_after_response() {
        let f = fixture();
        let mock = MockDefinition::fixed("POST", "/cart", MockResponse::new(201))
            .with_capture("cart.items[]", "body.item")
            .with_capture("user", "headers.x-user")
            .with_capture("missing", "body.nope")
            .with_after_response(object(json!({"step": "added"})));
        let mocks = [mock];

        for item in ["apple", "pear"] {
            let ctx = HttpRequestContext::new("POST", "/cart")
                .with_header("X-User", "ada")
                .with_body(json!({"item": item}));
            status(&f, &ctx, &mocks);
        }

        assert_eq!(
            Value::Object(f.state.get_all("t1")),
            json!({"cart": {"items": ["apple", "pear"]}, "user": "ada", "step": "added"})
        );
    }

    #[test]
    fn test_condition_after_response_applies_after_mock_level() {
        let f = fixture();
        let mock = MockDefinition::new(
            "POST",
            "/checkout",
            ResponseVariant::StateConditional(StateResponse {
                conditions: vec![StateCondition {
                    when: object(json!({"step": "review"})),
                    then: MockResponse::new(200),
                    after_response: Some(AfterResponse {
                        set_state: object(json!({"step": "paid"})),
                    }),
                }],
                default: MockResponse::new(409),
            }),
        )
        .with_after_response(object(json!({"step": "touched", "attempts[]": 1})));
        let mocks = [mock];
        let ctx = HttpRequestContext::new("POST", "/checkout");

        f.state.set("t1", "step", json!("review"));
        assert_eq!(status(&f, &ctx, &mocks), 200);
        assert_eq!(f.state.get("t1", "step"), Some(json!("paid")));

        assert_eq!(status(&f, &ctx, &mocks), 409);
        assert_eq!(f.state.get("t1", "step"), Some(json!("touched")));
        assert_eq!(f.state.get("t1", "attempts"), Some(json!([1, 1])));
    }

    #[test]
    fn test_response_rendered_from_captured_state() {
        let f = fixture();
        let mock = MockDefinition::fixed(
            "POST",
            "/users",
            MockResponse::json(201, json!({"name": "{{state.user.name}}", "greeting": "hi {{state.user.name}}"})),
        )
        .with_capture("user.name", "body.name");
        let ctx = HttpRequestContext::new("POST", "/users").with_body(json!({"name": "Ada"}));

        let response = f
            .selector
            .select_response("t1", "s", &ctx, &candidates(&[mock]))
            .unwrap();
        assert_eq!(
            response.body,
            Some(json!({"name": "Ada", "greeting": "hi Ada"}))
        );
    }
}
