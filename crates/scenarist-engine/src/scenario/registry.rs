//! Scenario catalog.

use super::types::{MockDefinition, ScenarioDefinition};
use super::validator::validate_scenario;
use crate::context::HttpRequestContext;
use crate::error::{EngineError, ValidationIssue};
use crate::predicate::{method_matches, CompiledUrlPattern};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A validated scenario with its URL patterns compiled.
#[derive(Debug)]
pub struct RegisteredScenario {
    pub definition: Arc<ScenarioDefinition>,
    urls: Vec<CompiledUrlPattern>,
}

impl RegisteredScenario {
    /// Validate a definition and compile its URL patterns.
    pub fn compile(definition: Arc<ScenarioDefinition>) -> Result<Self, EngineError> {
        let mut issues = validate_scenario(&definition);

        let mut urls = Vec::with_capacity(definition.mocks.len());
        for (idx, mock) in definition.mocks.iter().enumerate() {
            match CompiledUrlPattern::compile(&mock.url) {
                Ok(compiled) => urls.push(compiled),
                Err(e) => issues.push(ValidationIssue::new(
                    format!("mocks[{idx}].url"),
                    format!("Invalid URL pattern '{}': {e}", mock.url.as_str()),
                )),
            }
        }

        if !issues.is_empty() {
            return Err(EngineError::ScenarioValidation {
                scenario_id: definition.id.clone(),
                issues,
            });
        }

        Ok(Self { definition, urls })
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    /// Mocks whose method and URL match the request, with their index in this scenario.
    pub fn matching_mocks<'a>(
        &'a self,
        ctx: &'a HttpRequestContext,
    ) -> impl Iterator<Item = (usize, &'a MockDefinition)> + 'a {
        self.definition
            .mocks
            .iter()
            .zip(&self.urls)
            .enumerate()
            .filter(move |(_, (mock, url))| {
                method_matches(&mock.method, &ctx.method) && url.matches(ctx)
            })
            .map(|(idx, (mock, _))| (idx, mock))
    }
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Inserted,
    /// The same definition was already registered under this id
    AlreadyRegistered,
}

/// Catalog of scenario definitions keyed by id. Read-mostly after startup.
pub trait ScenarioRegistry: Send + Sync {
    /// Insert a scenario unless its id is taken.
    ///
    /// Re-registering an identical definition is a no-op; a different definition under
    /// an existing id fails with `DuplicateScenario`.
    fn register(&self, scenario: RegisteredScenario) -> Result<Registration, EngineError>;

    fn get(&self, id: &str) -> Option<Arc<RegisteredScenario>>;

    fn has(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Insert a batch of scenarios, all or nothing.
    ///
    /// Conflicts with the registry or within the batch fail the whole call before any
    /// scenario is inserted. Outcomes are returned in batch order.
    fn register_all(
        &self,
        scenarios: Vec<RegisteredScenario>,
    ) -> Result<Vec<Registration>, EngineError>;

    /// All registered definitions, sorted by id.
    fn list(&self) -> Vec<Arc<ScenarioDefinition>>;
}

fn registration_outcome(
    existing: &RegisteredScenario,
    incoming: &RegisteredScenario,
) -> Result<Registration, EngineError> {
    if Arc::ptr_eq(&existing.definition, &incoming.definition)
        || existing.definition == incoming.definition
    {
        Ok(Registration::AlreadyRegistered)
    } else {
        Err(EngineError::DuplicateScenario {
            scenario_id: incoming.id().to_string(),
        })
    }
}

#[derive(Default)]
pub struct InMemoryScenarioRegistry {
    scenarios: RwLock<HashMap<String, Arc<RegisteredScenario>>>,
}

impl InMemoryScenarioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.scenarios.read().len()
    }
}

impl ScenarioRegistry for InMemoryScenarioRegistry {
    fn register(&self, scenario: RegisteredScenario) -> Result<Registration, EngineError> {
        let mut scenarios = self.scenarios.write();
        if let Some(existing) = scenarios.get(scenario.id()) {
            return registration_outcome(existing, &scenario);
        }
        scenarios.insert(scenario.id().to_string(), Arc::new(scenario));
        Ok(Registration::Inserted)
    }

    fn register_all(
        &self,
        scenarios: Vec<RegisteredScenario>,
    ) -> Result<Vec<Registration>, EngineError> {
        let mut registered = self.scenarios.write();

        let mut outcomes = Vec::with_capacity(scenarios.len());
        let mut pending: HashMap<&str, &RegisteredScenario> = HashMap::new();
        for scenario in &scenarios {
            let outcome = match (registered.get(scenario.id()), pending.get(scenario.id())) {
                (Some(existing), _) => registration_outcome(existing, scenario)?,
                (None, Some(earlier)) => registration_outcome(earlier, scenario)?,
                (None, None) => {
                    pending.insert(scenario.id(), scenario);
                    Registration::Inserted
                }
            };
            outcomes.push(outcome);
        }
        drop(pending);

        for (scenario, outcome) in scenarios.into_iter().zip(&outcomes) {
            if *outcome == Registration::Inserted {
                registered.insert(scenario.id().to_string(), Arc::new(scenario));
            }
        }
        Ok(outcomes)
    }

    fn get(&self, id: &str) -> Option<Arc<RegisteredScenario>> {
        self.scenarios.read().get(id).cloned()
    }

    fn list(&self) -> Vec<Arc<ScenarioDefinition>> {
        let mut list: Vec<_> = self
            .scenarios
            .read()
            .values()
            .map(|s| Arc::clone(&s.definition))
            .collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }
}
