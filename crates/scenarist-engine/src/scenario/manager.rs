//! Scenario lifecycle coordination.
//!
//! The manager owns the catalog and the per-test-id active scenario, and keeps the
//! per-test-id sequence cursors and state consistent with scenario switches.

use super::registry::{RegisteredScenario, Registration, ScenarioRegistry};
use super::store::ScenarioStore;
use super::types::{ActiveScenario, ScenarioDefinition, DEFAULT_SCENARIO_ID};
use crate::error::{EngineError, ValidationIssue};
use crate::sequence::SequenceTracker;
use crate::state::StateManager;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ScenarioManager {
    registry: Arc<dyn ScenarioRegistry>,
    store: Arc<dyn ScenarioStore>,
    state: Arc<dyn StateManager>,
    sequences: Arc<dyn SequenceTracker>,
}

impl ScenarioManager {
    pub fn new(
        registry: Arc<dyn ScenarioRegistry>,
        store: Arc<dyn ScenarioStore>,
        state: Arc<dyn StateManager>,
        sequences: Arc<dyn SequenceTracker>,
    ) -> Self {
        Self {
            registry,
            store,
            state,
            sequences,
        }
    }

    /// Validate and register a scenario.
    ///
    /// Registering the same definition twice is a no-op. A different definition under
    /// an id that is already taken fails with `DuplicateScenario`.
    pub fn register_scenario(
        &self,
        definition: impl Into<Arc<ScenarioDefinition>>,
    ) -> Result<Registration, EngineError> {
        let compiled = RegisteredScenario::compile(definition.into())?;
        let id = compiled.id().to_string();
        let mocks = compiled.definition.mocks.len();

        let outcome = self.registry.register(compiled)?;
        match outcome {
            Registration::Inserted => {
                info!("Registered scenario '{}' with {} mocks", id, mocks)
            }
            Registration::AlreadyRegistered => {
                debug!("Scenario '{}' already registered, skipping", id)
            }
        }
        Ok(outcome)
    }

    /// Register a whole catalog.
    ///
    /// Every definition is validated and checked for id conflicts before anything is
    /// inserted, so a failing catalog leaves the registry untouched. The catalog (or the
    /// registry it lands in) must provide the default scenario.
    pub fn register_catalog(
        &self,
        definitions: Vec<ScenarioDefinition>,
    ) -> Result<Vec<Registration>, EngineError> {
        let has_default = definitions.iter().any(ScenarioDefinition::is_default)
            || self.registry.has(DEFAULT_SCENARIO_ID);
        if !has_default {
            return Err(EngineError::ScenarioValidation {
                scenario_id: DEFAULT_SCENARIO_ID.to_string(),
                issues: vec![ValidationIssue::new(
                    "catalog",
                    format!("Catalog must contain a scenario with id '{DEFAULT_SCENARIO_ID}'"),
                )],
            });
        }

        let compiled = definitions
            .into_iter()
            .map(|def| RegisteredScenario::compile(Arc::new(def)))
            .collect::<Result<Vec<_>, _>>()?;

        let ids: Vec<String> = compiled.iter().map(|s| s.id().to_string()).collect();
        let outcomes = self.registry.register_all(compiled)?;
        for (id, outcome) in ids.iter().zip(&outcomes) {
            match outcome {
                Registration::Inserted => info!("Registered scenario '{}'", id),
                Registration::AlreadyRegistered => {
                    debug!("Scenario '{}' already registered, skipping", id)
                }
            }
        }
        Ok(outcomes)
    }

    /// Activate a scenario for a test id and give it a clean slate.
    ///
    /// An unknown scenario id leaves the test id's active scenario, state and sequence
    /// cursors untouched.
    pub fn switch_scenario(&self, test_id: &str, scenario_id: &str) -> Result<(), EngineError> {
        if !self.registry.has(scenario_id) {
            return Err(EngineError::ScenarioNotFound {
                scenario_id: scenario_id.to_string(),
            });
        }

        self.store.set(test_id, ActiveScenario::new(scenario_id));
        self.sequences.reset(test_id);
        self.state.reset(test_id);

        info!("Switched test id '{}' to scenario '{}'", test_id, scenario_id);
        Ok(())
    }

    pub fn get_active_scenario(&self, test_id: &str) -> Option<ActiveScenario> {
        self.store.get(test_id)
    }

    /// Id of the scenario requests under this test id resolve against.
    pub fn active_scenario_id(&self, test_id: &str) -> String {
        self.store
            .get(test_id)
            .map_or_else(|| DEFAULT_SCENARIO_ID.to_string(), |a| a.scenario_id)
    }

    pub fn get_scenario_by_id(&self, scenario_id: &str) -> Option<Arc<ScenarioDefinition>> {
        self.registry.get(scenario_id).map(|s| Arc::clone(&s.definition))
    }

    pub(crate) fn get_registered(&self, scenario_id: &str) -> Option<Arc<RegisteredScenario>> {
        self.registry.get(scenario_id)
    }

    /// Every registered scenario, sorted by id.
    pub fn list_scenarios(&self) -> Vec<Arc<ScenarioDefinition>> {
        self.registry.list()
    }

    /// Forget the active scenario for a test id, returning it to the default scenario.
    pub fn clear_scenario(&self, test_id: &str) -> Option<ActiveScenario> {
        let cleared = self.store.delete(test_id);
        if cleared.is_some() {
            debug!("Cleared active scenario for test id '{}'", test_id);
        }
        cleared
    }

    /// Drop every test id's active scenario, state and sequence cursors.
    pub fn clear_all_scenarios(&self) {
        self.store.clear();
        self.sequences.reset_all();
        self.state.reset_all();
        info!("Cleared all active scenarios");
    }

    pub fn state(&self) -> &Arc<dyn StateManager> {
        &self.state
    }

    pub fn sequences(&self) -> &Arc<dyn SequenceTracker> {
        &self.sequences
    }
}
