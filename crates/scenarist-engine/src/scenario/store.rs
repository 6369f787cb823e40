//! Active scenario bookkeeping, keyed by test id.

use super::types::ActiveScenario;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Maps test ids to their active scenario.
///
/// A test id with no entry is implicitly on the default scenario.
pub trait ScenarioStore: Send + Sync {
    fn get(&self, test_id: &str) -> Option<ActiveScenario>;

    fn set(&self, test_id: &str, active: ActiveScenario);

    /// Remove the entry for a test id, returning what was there.
    fn delete(&self, test_id: &str) -> Option<ActiveScenario>;

    fn clear(&self);
}

#[derive(Default)]
pub struct InMemoryScenarioStore {
    active: RwLock<HashMap<String, ActiveScenario>>,
}

impl InMemoryScenarioStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.active.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.read().is_empty()
    }
}

impl ScenarioStore for InMemoryScenarioStore {
    fn get(&self, test_id: &str) -> Option<ActiveScenario> {
        self.active.read().get(test_id).cloned()
    }

    fn set(&self, test_id: &str, active: ActiveScenario) {
        self.active.write().insert(test_id.to_string(), active);
    }

    fn delete(&self, test_id: &str) -> Option<ActiveScenario> {
        self.active.write().remove(test_id)
    }

    fn clear(&self) {
        self.active.write().clear();
    }
}
