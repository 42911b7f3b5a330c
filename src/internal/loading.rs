//! Loading set used for circular reference detection.

use parking_lot::Mutex;

/// Names currently mid-resolution, in the order they started loading.
///
/// A name is unvisited while absent, in progress while present; a finished
/// singleton is served from its definition's cache before it is ever entered
/// again.
#[derive(Debug, Default)]
pub(crate) struct LoadingSet {
    stack: Vec<String>,
}

impl LoadingSet {
    pub(crate) fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.stack.iter().any(|loading| loading == name)
    }

    /// Marks `name` as in progress.
    ///
    /// If it already is, the whole set is cleared and returned as the cycle
    /// chain, so an unrelated later resolution does not inherit it.
    pub(crate) fn enter(&mut self, name: &str) -> Result<(), Vec<String>> {
        if self.contains(name) {
            return Err(std::mem::take(&mut self.stack));
        }
        self.stack.push(name.to_string());
        Ok(())
    }

    pub(crate) fn leave(&mut self, name: &str) {
        if let Some(position) = self.stack.iter().rposition(|loading| loading == name) {
            self.stack.remove(position);
        }
    }
}

/// Guard for removing a name from the loading set on every exit path
pub(crate) struct LoadingGuard<'a> {
    set: &'a Mutex<LoadingSet>,
    name: String,
}

impl<'a> LoadingGuard<'a> {
    /// Wraps a name that was already entered into `set`.
    pub(crate) fn new(set: &'a Mutex<LoadingSet>, name: &str) -> Self {
        Self {
            set,
            name: name.to_string(),
        }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().leave(&self.name);
    }
}
