//! Canonical application identities.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Canonical handle for an application participating in the reference graph.
///
/// Cloning is a reference-count bump. Two identities compare equal exactly
/// when their identity strings are equal, and identities interned by the
/// same [`Interner`] share one allocation.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AppIdentity(Arc<str>);

impl AppIdentity {
    /// The canonical identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AppIdentity({:?})", &*self.0)
    }
}

impl AsRef<str> for AppIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Interns identity strings into [`AppIdentity`] handles.
#[derive(Debug, Default)]
pub struct Interner {
    urls: HashSet<Arc<str>>,
}

impl Interner {
    /// Create an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern an identity string. Idempotent.
    pub fn intern(&mut self, url: &str) -> AppIdentity {
        if let Some(existing) = self.urls.get(url) {
            return AppIdentity(Arc::clone(existing));
        }
        let interned: Arc<str> = Arc::from(url);
        self.urls.insert(Arc::clone(&interned));
        AppIdentity(interned)
    }

    /// Look up an identity without interning it.
    pub fn get(&self, url: &str) -> Option<AppIdentity> {
        self.urls.get(url).map(|u| AppIdentity(Arc::clone(u)))
    }

    /// Number of distinct identities interned so far.
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Whether nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_idempotent() {
        let mut interner = Interner::new();
        let a = interner.intern("mojo:app_a");
        let b = interner.intern("mojo:app_a");

        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a.0, &b.0));
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_intern_distinct() {
        let mut interner = Interner::new();
        let a = interner.intern("mojo:app_a");
        let b = interner.intern("mojo:app_b");

        assert_ne!(a, b);
        assert_eq!(a.as_str(), "mojo:app_a");
        assert_eq!(b.to_string(), "mojo:app_b");
    }

    #[test]
    fn test_get_does_not_intern() {
        let mut interner = Interner::new();
        assert!(interner.get("mojo:missing").is_none());
        assert!(interner.is_empty());

        let a = interner.intern("mojo:present");
        assert_eq!(interner.get("mojo:present"), Some(a));
    }
}
