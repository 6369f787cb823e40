//! Per-test-id mutable state.
//!
//! # Module Structure
//!
//! - `manager` - `StateManager` port and the in-memory implementation
//! - `path` - dot-path reads and writes on a state tree (`[]` appends)
//! - `conditions` - state-conditional response evaluation
//! - `template` - `{{state.*}}` substitution in resolved responses

mod conditions;
mod manager;
mod path;
mod template;

pub use conditions::{condition_matches, find_matching_condition};
pub use manager::{InMemoryStateManager, StateManager};
pub use path::{get_path, set_path, StateKey};
pub use template::{has_template_variables, render_response};
