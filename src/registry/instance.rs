use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::action::BoundActions;
use crate::registry::StoreDef;
use crate::state::StoreState;

/// A live store: its state, its bound actions, and any container props.
///
/// Exactly one instance exists per `(definition, scope)` pair while at
/// least one consumer holds it; the registry is the only constructor.
pub struct StoreInstance<S, P = ()> {
    name: &'static str,
    state: StoreState<S>,
    actions: BoundActions<S, P>,
    props: RwLock<Option<Arc<P>>>,
    torn_down: AtomicBool,
}

impl<S, P> std::fmt::Debug for StoreInstance<S, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreInstance")
            .field("name", &self.name)
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}

impl<S, P> StoreInstance<S, P>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    pub(crate) fn create(def: &StoreDef<S, P>, initial: S, props: Option<P>) -> Arc<Self>
    where
        S: Clone,
    {
        // Bound actions hold a weak back-reference to the instance that
        // owns them, so dispatch on a torn-down store is a typed error
        // rather than a dangling call.
        Arc::new_cyclic(|weak| StoreInstance {
            name: def.name(),
            state: StoreState::new(initial),
            actions: def.actions().bind(def.name(), weak.clone()),
            props: RwLock::new(props.map(Arc::new)),
            torn_down: AtomicBool::new(false),
        })
    }

    /// Diagnostic name of the owning definition.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The subscribe/notify primitive for this store.
    pub fn state(&self) -> &StoreState<S> {
        &self.state
    }

    /// The bound actions mapping.
    pub fn actions(&self) -> &BoundActions<S, P> {
        &self.actions
    }

    /// Container props installed at configure time, if any.
    pub fn props(&self) -> Option<Arc<P>> {
        self.props.read().unwrap().clone()
    }

    /// Install new container props. Takes effect for subsequent dispatches
    /// and selector recomputations; does not notify listeners by itself.
    pub fn set_props(&self, props: Option<P>) {
        *self.props.write().unwrap() = props.map(Arc::new);
    }

    pub(crate) fn tear_down(&self) {
        self.torn_down.store(true, Ordering::SeqCst);
        self.state.clear_listeners();
    }

    pub(crate) fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }
}
