//! State-conditional response evaluation.

use super::path::get_path;
use crate::scenario::StateCondition;
use crate::value::deep_equals;
use serde_json::{Map, Value};

/// Check whether every key of `when` is present in `state` with a deeply equal value.
///
/// Keys are dot paths, so `{"cart.step": "review"}` matches `{"cart": {"step": "review"}}`.
/// Extra keys in `state` are ignored.
pub fn condition_matches(when: &Map<String, Value>, state: &Map<String, Value>) -> bool {
    when.iter().all(|(key, expected)| {
        get_path(state, key).is_some_and(|actual| deep_equals(actual, expected))
    })
}

/// Find the best matching condition for the current state.
///
/// Among matching conditions the one with the most `when` keys wins; on a tie the
/// first in list order wins. Returns `None` when nothing matches, in which case the
/// caller answers with the variant's default response.
pub fn find_matching_condition<'a>(
    conditions: &'a [StateCondition],
    state: &Map<String, Value>,
) -> Option<&'a StateCondition> {
    let mut best: Option<&StateCondition> = None;
    for condition in conditions {
        if !condition_matches(&condition.when, state) {
            continue;
        }
        // Strictly greater keeps the earliest condition on equal specificity
        if best.is_none_or(|b| condition.specificity() > b.specificity()) {
            best = Some(condition);
        }
    }
    best
}
