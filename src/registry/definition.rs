use std::sync::atomic::{AtomicU64, Ordering};

use crate::action::{ActionSet, StoreApi};
use crate::error::StoreError;

static NEXT_DEF_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of a store definition.
///
/// Definitions are identity-compared, never value-compared: two definitions
/// built from equal initial state are still distinct registry keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefId(u64);

impl DefId {
    fn mint() -> Self {
        DefId(NEXT_DEF_ID.fetch_add(1, Ordering::SeqCst))
    }
}

/// Identity that gives a store instance per-container lifetime instead of
/// process-wide lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeKey(String);

impl ScopeKey {
    /// Create a scope key.
    pub fn new(key: impl Into<String>) -> Self {
        ScopeKey(key.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ScopeKey {
    fn from(key: &str) -> Self {
        ScopeKey(key.to_string())
    }
}

impl From<String> for ScopeKey {
    fn from(key: String) -> Self {
        ScopeKey(key)
    }
}

/// Immutable descriptor of a store: a name for diagnostics, the initial
/// state, and the action-creator mapping.
///
/// `P` is the container-props type handed to scoped instances via
/// `StoreRegistry::configure`; it defaults to `()` for unscoped stores.
pub struct StoreDef<S, P = ()> {
    id: DefId,
    name: &'static str,
    initial: S,
    actions: ActionSet<S, P>,
}

impl<S, P> StoreDef<S, P>
where
    S: Clone + Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Create a definition with the given initial state.
    pub fn new(name: &'static str, initial: S) -> Self {
        Self {
            id: DefId::mint(),
            name,
            initial,
            actions: ActionSet::new(),
        }
    }

    /// Register an action-creator under `name`. See [`ActionSet::action`].
    pub fn action<A, C, B>(mut self, name: &'static str, creator: C) -> Self
    where
        A: Send + 'static,
        C: Fn(A) -> B + Send + Sync + 'static,
        B: FnOnce(&StoreApi<'_, S, P>) -> Result<(), StoreError>,
    {
        self.actions = self.actions.action(name, creator);
        self
    }

    /// This definition's registry identity.
    pub fn id(&self) -> DefId {
        self.id
    }

    /// Diagnostic name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn initial(&self) -> S {
        self.initial.clone()
    }

    pub(crate) fn actions(&self) -> &ActionSet<S, P> {
        &self.actions
    }
}
