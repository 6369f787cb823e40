//! Sequence cursor tracking.
//!
//! Every sequence mock owns a cursor per `(test id, scenario id, mock index)`.
//! Cursors start at 0 and move one step per served response; what happens at the end
//! of the sequence depends on the [`RepeatMode`].

use crate::scenario::RepeatMode;
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Cursor state of one sequence mock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SequencePosition {
    pub position: usize,
    pub exhausted: bool,
}

/// Apply one step of the repeat-mode transition table.
pub fn advance_position(
    current: SequencePosition,
    total_responses: usize,
    repeat: RepeatMode,
) -> SequencePosition {
    if current.position + 1 < total_responses {
        return SequencePosition {
            position: current.position + 1,
            exhausted: false,
        };
    }
    match repeat {
        RepeatMode::Last => SequencePosition {
            position: total_responses.saturating_sub(1),
            exhausted: false,
        },
        RepeatMode::Cycle => SequencePosition {
            position: 0,
            exhausted: false,
        },
        RepeatMode::None => SequencePosition {
            position: total_responses,
            exhausted: true,
        },
    }
}

/// Tracks sequence cursors, partitioned by test id.
pub trait SequenceTracker: Send + Sync {
    /// Current cursor (the default position when nothing has been served yet).
    fn get_position(&self, test_id: &str, scenario_id: &str, mock_index: usize)
        -> SequencePosition;

    /// Serve the current position and advance the cursor, as a single atomic step.
    ///
    /// Returns the index of the response to serve, or `None` if the sequence is
    /// exhausted (or empty).
    fn advance(
        &self,
        test_id: &str,
        scenario_id: &str,
        mock_index: usize,
        total_responses: usize,
        repeat: RepeatMode,
    ) -> Option<usize>;

    /// Drop every cursor owned by a test id.
    fn reset(&self, test_id: &str);

    /// Drop every cursor.
    fn reset_all(&self);
}

type CursorKey = (String, usize);

/// In-memory SequenceTracker
///
/// Uses a read lock on the outer map for the common case where the test id already
/// has cursors; the write lock is only taken to create or drop a test id's bucket.
#[derive(Default)]
pub struct InMemorySequenceTracker {
    buckets: RwLock<HashMap<String, Mutex<HashMap<CursorKey, SequencePosition>>>>,
}

impl InMemorySequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of test ids with at least one tracked cursor
    pub fn tracked_test_ids(&self) -> usize {
        self.buckets.read().len()
    }
}

impl SequenceTracker for InMemorySequenceTracker {
    fn get_position(
        &self,
        test_id: &str,
        scenario_id: &str,
        mock_index: usize,
    ) -> SequencePosition {
        let buckets = self.buckets.read();
        buckets
            .get(test_id)
            .and_then(|bucket| {
                bucket
                    .lock()
                    .get(&(scenario_id.to_string(), mock_index))
                    .copied()
            })
            .unwrap_or_default()
    }

    fn advance(
        &self,
        test_id: &str,
        scenario_id: &str,
        mock_index: usize,
        total_responses: usize,
        repeat: RepeatMode,
    ) -> Option<usize> {
        if total_responses == 0 {
            return None;
        }

        let mut buckets = self.buckets.read();
        // Opportunistically use just a read lock. If the test id has no bucket yet,
        // lock for writing, then downgrade
        if !buckets.contains_key(test_id) {
            drop(buckets);
            let mut write = self.buckets.write();
            write.entry(test_id.to_string()).or_default();
            buckets = RwLockWriteGuard::downgrade(write);
        }
        let bucket = buckets.get(test_id)?;

        let mut cursors = bucket.lock();
        let cursor = cursors
            .entry((scenario_id.to_string(), mock_index))
            .or_default();
        if cursor.exhausted {
            return None;
        }

        let served = cursor.position.min(total_responses - 1);
        *cursor = advance_position(*cursor, total_responses, repeat);
        debug!(
            "Sequence {}#{} for test id '{}' served {} (next {:?})",
            scenario_id, mock_index, test_id, served, cursor
        );
        Some(served)
    }

    fn reset(&self, test_id: &str) {
        self.buckets.write().remove(test_id);
    }

    fn reset_all(&self) {
        self.buckets.write().clear();
    }
}
