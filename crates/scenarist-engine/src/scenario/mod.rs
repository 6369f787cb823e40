//! Scenario cataloging and activation.
//!
//! This module provides:
//! - `ScenarioDefinition` / `MockDefinition`: the authored data model
//! - `ScenarioRegistry`: catalog of validated, compiled scenarios
//! - `ScenarioStore`: active scenario per test id
//! - `ScenarioManager`: registration and per-test-id switching
//!
//! ## Module Structure
//!
//! - `types`: Scenario, mock and response variant definitions
//! - `registry`: `ScenarioRegistry` port and in-memory implementation
//! - `store`: `ScenarioStore` port and in-memory implementation
//! - `validator`: Structural checks run at registration
//! - `manager`: `ScenarioManager` coordination

mod manager;
mod registry;
mod store;
mod types;
mod validator;

#[cfg(test)]
mod tests;

pub use manager::ScenarioManager;
pub use registry::{InMemoryScenarioRegistry, RegisteredScenario, Registration, ScenarioRegistry};
pub use store::{InMemoryScenarioStore, ScenarioStore};
pub use types::{
    ActiveScenario, AfterResponse, MockDefinition, RepeatMode, ResponseVariant,
    ScenarioDefinition, SequenceSpec, StateCondition, StateResponse, DEFAULT_SCENARIO_ID,
};
pub use validator::{validate_mock, validate_scenario};
