//! Process-wide record of consumed token ids.

use std::collections::HashMap;

use parking_lot::{Mutex, MutexGuard};

/// Token ids seen within the current cleanup horizon, mapped to their
/// `issued_at`.
///
/// One instance is shared (behind an `Arc`) by every validator in the
/// process. Entries are evicted lazily by [`ReplayWindow::cleanup`]; there is
/// no background sweep.
#[derive(Debug, Default)]
pub struct ReplayGuard {
    entries: Mutex<HashMap<String, i64>>,
}

/// Exclusive access to the guard for one cleanup-then-admit sequence.
///
/// Holding the window keeps every other validator out until it is dropped,
/// so two tokens with the same id can never both be admitted.
pub struct ReplayWindow<'a> {
    entries: MutexGuard<'a, HashMap<String, i64>>,
}

impl ReplayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the guard. Never call the vault while holding the window.
    pub fn lock(&self) -> ReplayWindow<'_> {
        ReplayWindow {
            entries: self.entries.lock(),
        }
    }

    /// Remove every entry issued before `older_than`. Returns how many were
    /// removed.
    pub fn cleanup(&self, older_than: i64) -> usize {
        self.lock().cleanup(older_than)
    }

    /// Record `token_id` unless it is already present.
    pub fn admit(&self, token_id: &str, issued_at: i64) -> bool {
        self.lock().admit(token_id, issued_at)
    }

    pub fn contains(&self, token_id: &str) -> bool {
        self.entries.lock().contains_key(token_id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl ReplayWindow<'_> {
    pub fn cleanup(&mut self, older_than: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, issued_at| *issued_at >= older_than);
        before - self.entries.len()
    }

    /// `true` and record the entry if `token_id` is new; `false` with state
    /// unchanged if it is already present.
    pub fn admit(&mut self, token_id: &str, issued_at: i64) -> bool {
        if self.entries.contains_key(token_id) {
            return false;
        }
        self.entries.insert(token_id.to_string(), issued_at);
        true
    }
}
