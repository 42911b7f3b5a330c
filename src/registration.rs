//! Definition storage and the pending-notify queue.

use std::collections::HashMap;
use std::sync::Arc;

use crate::definition::{Definition, MethodCall};

/// Service registry holding all definitions
///
/// Aliases are plain entries pointing at the same `Arc<Definition>` as their
/// target.
#[derive(Default)]
pub(crate) struct Registry {
    services: HashMap<String, Arc<Definition>>,
    /// Calls declared against names that were not bound yet
    pending: HashMap<String, Vec<MethodCall>>,
}

impl Registry {
    pub(crate) fn get(&self, name: &str) -> Option<&Arc<Definition>> {
        self.services.get(name)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub(crate) fn insert(&mut self, name: &str, definition: Arc<Definition>) {
        self.services.insert(name.to_string(), definition);
    }

    /// All bound names, sorted.
    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.services.keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn enqueue(&mut self, target: &str, call: MethodCall) {
        self.pending.entry(target.to_string()).or_default().push(call);
    }

    /// Removes and returns the calls waiting for `name`.
    pub(crate) fn take_pending(&mut self, name: &str) -> Vec<MethodCall> {
        self.pending.remove(name).unwrap_or_default()
    }

    #[cfg_attr(not(feature = "diagnostics"), allow(dead_code))]
    pub(crate) fn pending_count(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    #[cfg_attr(not(feature = "diagnostics"), allow(dead_code))]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &Arc<Definition>)> {
        self.services.iter()
    }
}
