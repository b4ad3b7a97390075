//! Refresh suppression.
//!
//! Explorer surfaces re-query on every save event; most saves don't
//! change a given view's data. The gate remembers a hash of the last
//! result per view and answers whether a redraw is warranted. Owned
//! state, created where the views are created.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

#[derive(Debug, Default)]
pub struct RefreshGate {
    last: HashMap<String, u64>,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `value` differs from the last one seen for `view` (or
    /// the view has never been seen). Records the new hash either way.
    pub fn should_refresh<T: Hash>(&mut self, view: &str, value: &T) -> bool {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        let digest = hasher.finish();
        self.last.insert(view.to_string(), digest) != Some(digest)
    }

    /// Forget a view's last result so the next query always refreshes.
    pub fn reset(&mut self, view: &str) {
        self.last.remove(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sighting_always_refreshes() {
        let mut gate = RefreshGate::new();
        assert!(gate.should_refresh("codes", &vec!["a", "b"]));
    }

    #[test]
    fn unchanged_value_is_suppressed() {
        let mut gate = RefreshGate::new();
        assert!(gate.should_refresh("codes", &vec!["a"]));
        assert!(!gate.should_refresh("codes", &vec!["a"]));
        assert!(gate.should_refresh("codes", &vec!["a", "b"]));
    }

    #[test]
    fn views_are_tracked_independently() {
        let mut gate = RefreshGate::new();
        assert!(gate.should_refresh("codes", &1));
        assert!(gate.should_refresh("references", &1));
        assert!(!gate.should_refresh("codes", &1));
    }

    #[test]
    fn reset_forces_the_next_refresh() {
        let mut gate = RefreshGate::new();
        assert!(gate.should_refresh("codes", &1));
        gate.reset("codes");
        assert!(gate.should_refresh("codes", &1));
    }
}
