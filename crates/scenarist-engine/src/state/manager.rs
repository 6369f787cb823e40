use super::path::{get_path, set_path};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Per-test-id state storage.
///
/// Keys are dot paths (`user.profile.name`); a key ending in `[]` appends to the
/// array at that path. This trait is intentionally synchronous: resolution is a
/// non-blocking decision function with no suspension points.
pub trait StateManager: Send + Sync {
    /// Get the value at a dot path, or `None` if it is absent or cannot be traversed.
    fn get(&self, test_id: &str, key: &str) -> Option<Value>;

    /// Set (or append to) the value at a dot path.
    fn set(&self, test_id: &str, key: &str, value: Value);

    /// Snapshot of the whole state tree for a test id (empty if none).
    fn get_all(&self, test_id: &str) -> Map<String, Value>;

    /// Delete the whole state tree for a test id.
    fn reset(&self, test_id: &str);

    /// Delete state for every test id.
    fn reset_all(&self);
}

/// In-memory implementation of StateManager
///
/// Each test id owns its own tree behind its own mutex, so writes under one test id
/// never contend with another's.
#[derive(Default)]
pub struct InMemoryStateManager {
    trees: RwLock<HashMap<String, Arc<Mutex<Map<String, Value>>>>>,
}

impl InMemoryStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the tree for a test id, creating it on first write.
    fn tree_for_write(&self, test_id: &str) -> Arc<Mutex<Map<String, Value>>> {
        let trees = self.trees.read();
        if let Some(tree) = trees.get(test_id) {
            return Arc::clone(tree);
        }
        drop(trees);
        let mut trees = self.trees.write();
        Arc::clone(trees.entry(test_id.to_string()).or_default())
    }

    fn tree(&self, test_id: &str) -> Option<Arc<Mutex<Map<String, Value>>>> {
        self.trees.read().get(test_id).map(Arc::clone)
    }

    /// Number of test ids currently holding state
    pub fn len(&self) -> usize {
        self.trees.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.read().is_empty()
    }
}

impl StateManager for InMemoryStateManager {
    fn get(&self, test_id: &str, key: &str) -> Option<Value> {
        let tree = self.tree(test_id)?;
        let tree = tree.lock();
        get_path(&tree, key).cloned()
    }

    fn set(&self, test_id: &str, key: &str, value: Value) {
        debug!("State set for test id '{}': {} = {}", test_id, key, value);
        let tree = self.tree_for_write(test_id);
        set_path(&mut tree.lock(), key, value);
    }

    fn get_all(&self, test_id: &str) -> Map<String, Value> {
        self.tree(test_id)
            .map(|tree| tree.lock().clone())
            .unwrap_or_default()
    }

    fn reset(&self, test_id: &str) {
        if self.trees.write().remove(test_id).is_some() {
            debug!("State reset for test id '{}'", test_id);
        }
    }

    fn reset_all(&self) {
        self.trees.write().clear();
    }
}
