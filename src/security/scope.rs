use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::security::context::SecurityContext;

/// One logical execution unit (usually one request).
///
/// Scopes form a tree: [`Scope::child`] derives a unit whose parent is
/// `self`. Cloning a `Scope` yields a handle to the same node.
#[derive(Clone, Default)]
pub struct Scope {
    inner: Arc<ScopeNode>,
}

#[derive(Default)]
struct ScopeNode {
    slot: Mutex<Option<Arc<SecurityContext>>>,
    parent: Option<Scope>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(ScopeNode {
                slot: Mutex::new(None),
                parent: Some(self.clone()),
            }),
        }
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.inner.parent.as_ref()
    }

    pub(crate) fn slot(&self) -> &Mutex<Option<Arc<SecurityContext>>> {
        &self.inner.slot
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0;
        let mut cursor = self.parent();
        while let Some(p) = cursor {
            depth += 1;
            cursor = p.parent();
        }
        f.debug_struct("Scope")
            .field("depth", &depth)
            .field("has_context", &self.inner.slot.try_lock().map(|s| s.is_some()))
            .finish()
    }
}
