//! Scenario-based HTTP mock resolution.
//!
//! Given an intercepted request and a test id, the engine decides which canned
//! response to return. All mutable state (active scenario, sequence cursors, captured
//! state) is partitioned per test id so concurrent test runs never interfere.
//!
//! ```no_run
//! use scenarist_engine::{EngineConfig, HttpRequestContext, MockEngine};
//!
//! let engine = MockEngine::new(EngineConfig::default());
//! engine.load_catalog("scenarios.yaml")?;
//! engine.switch_scenario("test-1", "cart")?;
//!
//! let request = HttpRequestContext::new("GET", "/cart/status")
//!     .with_header("x-scenarist-test-id", "test-1");
//! let resolution = engine.resolve(&request)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

// ===== Resolution engine =====
pub mod engine;
pub mod predicate;
pub mod scenario;
pub mod selector;
pub mod sequence;
pub mod state;

// ===== Ambient =====
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod value;

pub use config::{EngineConfig, ErrorBehavior, ErrorBehaviors, UnmatchedPolicy};
pub use context::{HttpRequestContext, MockResponse};
pub use engine::{MockEngine, Resolution};
pub use error::{EngineError, ValidationIssue};
pub use scenario::{
    MockDefinition, RepeatMode, ResponseVariant, ScenarioDefinition, ScenarioManager,
    DEFAULT_SCENARIO_ID,
};
pub use selector::{CandidateMock, ResponseSelector};
pub use sequence::{InMemorySequenceTracker, SequencePosition, SequenceTracker};
pub use state::{InMemoryStateManager, StateManager};
