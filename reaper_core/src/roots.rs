//! Root set administration.

use crate::interner::AppIdentity;
use crate::reaper::Reaper;
use std::collections::BTreeSet;

/// Apps that are always considered reachable.
#[derive(Debug, Default)]
pub struct RootSet {
    roots: BTreeSet<AppIdentity>,
}

impl RootSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, app: AppIdentity) -> bool {
        self.roots.insert(app)
    }

    pub fn remove(&mut self, app: &AppIdentity) -> bool {
        self.roots.remove(app)
    }

    pub fn contains(&self, app: &AppIdentity) -> bool {
        self.roots.contains(app)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AppIdentity> {
        self.roots.iter()
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }
}

impl Reaper {
    /// Add or remove `url` from the root set.
    ///
    /// Removing a root does not trigger a collection; the app is reclaimed
    /// by the next pass if nothing else keeps it alive. The reaper's own
    /// identity holds parked transfer nodes and cannot be un-rooted.
    pub fn set_is_root(&mut self, url: &str, is_root: bool) {
        let app = self.interner.intern(url);
        if !is_root && app == self.service {
            tracing::error!(app = url, "refusing to remove the reaper's own identity from the root set");
            return;
        }
        let changed = if is_root {
            self.roots.insert(app)
        } else {
            self.roots.remove(&app)
        };
        if changed {
            tracing::debug!(app = url, is_root, "root set updated");
        }
    }

    /// Whether `url` is currently a root.
    pub fn is_root(&self, url: &str) -> bool {
        self.interner
            .get(url)
            .is_some_and(|app| self.roots.contains(&app))
    }

    /// Canonical URLs of every root, sorted.
    pub fn roots(&self) -> Vec<String> {
        self.roots.iter().map(|app| app.as_str().to_string()).collect()
    }
}
