//! The mock engine: one explicitly constructed object bundling the scenario catalog,
//! per-test-id stores and the response selector.
//!
//! The transport layer hands every intercepted request to [`MockEngine::resolve`] and
//! acts on the returned [`Resolution`]:
//!
//! - the test id is read from the configured header, falling back to the configured
//!   default test id
//! - candidates are the default scenario's mocks followed by the active scenario's
//!   mocks, filtered by method and URL
//! - request-time errors go through the configured [`ErrorBehavior`] and, when not
//!   thrown, the [`UnmatchedPolicy`]

use crate::config::{EngineConfig, ErrorBehavior, UnmatchedPolicy};
use crate::context::{HttpRequestContext, MockResponse};
use crate::error::EngineError;
use crate::scenario::{
    InMemoryScenarioRegistry, InMemoryScenarioStore, Registration, ScenarioDefinition,
    ScenarioManager, ScenarioRegistry, ScenarioStore, DEFAULT_SCENARIO_ID,
};
use crate::selector::{CandidateMock, ResponseSelector};
use crate::sequence::{InMemorySequenceTracker, SequenceTracker};
use crate::state::{InMemoryStateManager, StateManager};
use anyhow::Context;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Status code of the synthesized response for unmatched requests.
pub const NOT_IMPLEMENTED_STATUS: u16 = 501;

/// What the transport layer should do with a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Answer with this response
    Respond(MockResponse),
    /// Forward the real request
    Passthrough,
}

impl Resolution {
    pub fn response(&self) -> Option<&MockResponse> {
        match self {
            Resolution::Respond(response) => Some(response),
            Resolution::Passthrough => None,
        }
    }
}

/// A catalog file holds a single scenario or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Many(Vec<ScenarioDefinition>),
    One(Box<ScenarioDefinition>),
}

pub struct MockEngine {
    config: EngineConfig,
    manager: ScenarioManager,
    selector: ResponseSelector,
}

impl MockEngine {
    /// Engine backed by the in-memory stores.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_ports(
            config,
            Arc::new(InMemoryScenarioRegistry::new()),
            Arc::new(InMemoryScenarioStore::new()),
            Arc::new(InMemoryStateManager::new()),
            Arc::new(InMemorySequenceTracker::new()),
        )
    }

    /// Engine backed by caller-provided stores.
    pub fn with_ports(
        config: EngineConfig,
        registry: Arc<dyn ScenarioRegistry>,
        store: Arc<dyn ScenarioStore>,
        state: Arc<dyn StateManager>,
        sequences: Arc<dyn SequenceTracker>,
    ) -> Self {
        let selector = ResponseSelector::new(Arc::clone(&sequences), Arc::clone(&state));
        let manager = ScenarioManager::new(registry, store, state, sequences);
        Self {
            config,
            manager,
            selector,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn manager(&self) -> &ScenarioManager {
        &self.manager
    }

    pub fn register_scenario(
        &self,
        definition: impl Into<Arc<ScenarioDefinition>>,
    ) -> Result<Registration, EngineError> {
        self.manager.register_scenario(definition)
    }

    pub fn switch_scenario(&self, test_id: &str, scenario_id: &str) -> Result<(), EngineError> {
        self.manager.switch_scenario(test_id, scenario_id)
    }

    /// Load and register a JSON or YAML catalog file.
    pub fn load_catalog<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Registration>, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario catalog {}", path.display()))?;
        let catalog: CatalogFile = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse scenario catalog {}", path.display()))?;

        let definitions = match catalog {
            CatalogFile::Many(definitions) => definitions,
            CatalogFile::One(definition) => vec![*definition],
        };
        let registrations = self.manager.register_catalog(definitions)?;
        Ok(registrations)
    }

    /// Test id for a request: the configured header, else the configured default.
    pub fn resolve_test_id(&self, ctx: &HttpRequestContext) -> Result<String, EngineError> {
        ctx.header(&self.config.test_id_header)
            .filter(|id| !id.is_empty())
            .or(self.config.default_test_id.as_deref())
            .map(str::to_string)
            .ok_or_else(|| EngineError::MissingTestId {
                method: ctx.method.clone(),
                url: ctx.url.clone(),
                header: self.config.test_id_header.clone(),
            })
    }

    /// Resolve a request end to end.
    pub fn resolve(&self, ctx: &HttpRequestContext) -> Result<Resolution, EngineError> {
        if !self.config.enabled {
            return Ok(Resolution::Passthrough);
        }
        match self.resolve_test_id(ctx) {
            Ok(test_id) => self.resolve_for(&test_id, ctx),
            Err(err) => self.handle_request_error(err),
        }
    }

    /// Resolve a request for an already known test id.
    pub fn resolve_for(
        &self,
        test_id: &str,
        ctx: &HttpRequestContext,
    ) -> Result<Resolution, EngineError> {
        if !self.config.enabled {
            return Ok(Resolution::Passthrough);
        }
        match self.select_for_request(test_id, ctx) {
            Ok(response) => Ok(Resolution::Respond(response)),
            Err(err) => self.handle_request_error(err),
        }
    }

    /// Gather candidates from the default and active scenarios and select a response.
    pub fn select_for_request(
        &self,
        test_id: &str,
        ctx: &HttpRequestContext,
    ) -> Result<MockResponse, EngineError> {
        let scenario_id = self.manager.active_scenario_id(test_id);
        let default = self.manager.get_registered(DEFAULT_SCENARIO_ID);
        let active = if scenario_id == DEFAULT_SCENARIO_ID {
            None
        } else {
            self.manager.get_registered(&scenario_id)
        };

        // Indexes run over the concatenated list, so they are stable per scenario
        let mut candidates: Vec<CandidateMock> = Vec::new();
        let mut offset = 0;
        if let Some(scenario) = &default {
            candidates.extend(
                scenario
                    .matching_mocks(ctx)
                    .map(|(idx, mock)| CandidateMock::from_default(idx, mock)),
            );
            offset = scenario.definition.mocks.len();
        }
        if let Some(scenario) = &active {
            candidates.extend(
                scenario
                    .matching_mocks(ctx)
                    .map(|(idx, mock)| CandidateMock::new(offset + idx, mock)),
            );
        }
        debug!(
            "{} candidate mocks for {} {} (test id '{}', scenario '{}')",
            candidates.len(),
            ctx.method,
            ctx.url,
            test_id,
            scenario_id
        );

        self.selector
            .select_response(test_id, &scenario_id, ctx, &candidates)
    }

    /// Select among explicitly supplied candidates.
    pub fn select_response(
        &self,
        test_id: &str,
        scenario_id: &str,
        ctx: &HttpRequestContext,
        candidates: &[CandidateMock<'_>],
    ) -> Result<MockResponse, EngineError> {
        self.selector
            .select_response(test_id, scenario_id, ctx, candidates)
    }

    fn handle_request_error(&self, err: EngineError) -> Result<Resolution, EngineError> {
        match self.config.error_behaviors.for_error(&err) {
            ErrorBehavior::Throw => return Err(err),
            ErrorBehavior::Warn => warn!("{} [{}] Hint: {}", err, err.code(), err.hint()),
            ErrorBehavior::Ignore => {}
        }
        Ok(self.unmatched(&err))
    }

    fn unmatched(&self, err: &EngineError) -> Resolution {
        match self.config.unmatched {
            UnmatchedPolicy::Passthrough => Resolution::Passthrough,
            UnmatchedPolicy::NotImplemented => Resolution::Respond(MockResponse::json(
                NOT_IMPLEMENTED_STATUS,
                json!({
                    "error": err.code(),
                    "message": err.to_string(),
                    "hint": err.hint(),
                }),
            )),
        }
    }
}
