use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::debug;

use crate::error::StoreError;
use crate::registry::{DefId, ScopeKey, StoreDef, StoreInstance};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RegistryKey {
    def: DefId,
    scope: Option<ScopeKey>,
}

struct RegistryEntry {
    instance: Arc<dyn Any + Send + Sync>,
    refs: usize,
}

/// Directory of live store instances, keyed by definition identity and
/// optional scope, with reference-counted lifecycle.
///
/// Registries are explicit, constructible objects so tests can isolate
/// themselves; [`StoreRegistry::global`] is the shared fallback for
/// adapters that need zero wiring.
///
/// # Examples
///
/// ```
/// use canister::{StoreApi, StoreDef, StoreRegistry};
///
/// let registry = StoreRegistry::new();
/// let def = StoreDef::new("counter", 0i64).action("add", |by: i64| {
///     move |api: &StoreApi<i64>| {
///         api.set(*api.get() + by);
///         Ok(())
///     }
/// });
///
/// let store = registry.get_store(&def, None).unwrap();
/// store.actions().dispatch("add", 2i64).unwrap();
/// assert_eq!(*store.state().get(), 2);
/// ```
pub struct StoreRegistry {
    entries: Mutex<HashMap<RegistryKey, RegistryEntry>>,
}

impl StoreRegistry {
    /// Create an isolated registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The shared process-wide registry (lazily constructed).
    pub fn global() -> &'static StoreRegistry {
        static GLOBAL: OnceLock<StoreRegistry> = OnceLock::new();
        GLOBAL.get_or_init(StoreRegistry::new)
    }

    /// Return the live instance for `(definition, scope)`, constructing it
    /// lazily from the definition's initial state. Each call increments the
    /// entry's reference count; pair it with [`delete_store`](Self::delete_store).
    ///
    /// The entry is installed under the registry lock before any caller can
    /// observe it, so a recursive lookup in the same synchronous tick finds
    /// the instance instead of constructing a second one.
    pub fn get_store<S, P>(
        &self,
        def: &StoreDef<S, P>,
        scope: Option<ScopeKey>,
    ) -> Result<Arc<StoreInstance<S, P>>, StoreError>
    where
        S: Clone + Send + Sync + 'static,
        P: Send + Sync + 'static,
    {
        if def.actions().is_empty() {
            return Err(StoreError::MisconfiguredStore { store: def.name() });
        }

        let key = RegistryKey {
            def: def.id(),
            scope,
        };
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(key.clone()).or_insert_with(|| {
            debug!(store = def.name(), scope = ?key.scope, "constructing store instance");
            RegistryEntry {
                instance: StoreInstance::create(def, def.initial(), None),
                refs: 0,
            }
        });
        entry.refs += 1;
        Ok(downcast_instance(&entry.instance))
    }

    /// Create or refresh a scoped instance.
    ///
    /// On first use the instance is seeded with `override_state` (falling
    /// back to the definition's initial state) and the given container
    /// props. On refresh the props are re-installed and, when an override
    /// is present, the state is re-seeded through the normal notify path.
    /// Increments the reference count like `get_store`.
    pub fn configure<S, P>(
        &self,
        def: &StoreDef<S, P>,
        scope: ScopeKey,
        override_state: Option<S>,
        props: Option<P>,
    ) -> Result<Arc<StoreInstance<S, P>>, StoreError>
    where
        S: Clone + Send + Sync + 'static,
        P: Send + Sync + 'static,
    {
        if def.actions().is_empty() {
            return Err(StoreError::MisconfiguredStore { store: def.name() });
        }

        let key = RegistryKey {
            def: def.id(),
            scope: Some(scope),
        };
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(&key) {
            entry.refs += 1;
            let instance: Arc<StoreInstance<S, P>> = downcast_instance(&entry.instance);
            // Release the registry lock before notifying: the re-seed below
            // runs user listeners that may call back into the registry.
            drop(entries);
            instance.set_props(props);
            if let Some(state) = override_state {
                instance.state().set(state);
            }
            return Ok(instance);
        }

        debug!(store = def.name(), scope = ?key.scope, "constructing scoped store instance");
        let initial = override_state.unwrap_or_else(|| def.initial());
        let instance = StoreInstance::create(def, initial, props);
        entries.insert(
            key,
            RegistryEntry {
                instance: instance.clone(),
                refs: 1,
            },
        );
        Ok(instance)
    }

    /// Release one reference to `(definition, scope)`.
    ///
    /// A scoped entry whose count reaches zero is destroyed: the instance
    /// is tombstoned, its listeners dropped, and the entry removed.
    /// Unscoped entries are never auto-destroyed; their count floors at
    /// zero so a later `get_store` keeps returning the same instance.
    pub fn delete_store<S, P>(&self, def: &StoreDef<S, P>, scope: Option<ScopeKey>)
    where
        S: Clone + Send + Sync + 'static,
        P: Send + Sync + 'static,
    {
        let key = RegistryKey {
            def: def.id(),
            scope,
        };
        let removed = {
            let mut entries = self.entries.lock().unwrap();
            match entries.get_mut(&key) {
                Some(entry) => {
                    entry.refs = entry.refs.saturating_sub(1);
                    if entry.refs == 0 && key.scope.is_some() {
                        entries.remove(&key)
                    } else {
                        None
                    }
                }
                None => None,
            }
        };
        if let Some(entry) = removed {
            debug!(store = def.name(), scope = ?key.scope, "destroying store instance");
            let instance: Arc<StoreInstance<S, P>> = downcast_instance(&entry.instance);
            instance.tear_down();
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Whether the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn downcast_instance<S, P>(instance: &Arc<dyn Any + Send + Sync>) -> Arc<StoreInstance<S, P>>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    // Keys carry the definition's unique id, and a definition fixes S and P,
    // so the entry type cannot disagree with the caller's.
    Arc::clone(instance)
        .downcast::<StoreInstance<S, P>>()
        .ok()
        .expect("registry entry type mismatch")
}
