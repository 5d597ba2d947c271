use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use crate::error::StoreError;
use crate::registry::StoreInstance;
use crate::state::StoreState;

type ErasedCreator<S, P> =
    Arc<dyn Fn(Box<dyn Any + Send>, &StoreApi<'_, S, P>) -> Result<(), StoreError> + Send + Sync>;

/// Named action-creators for one store definition.
///
/// Each creator keeps its own argument type `A` (use a tuple for
/// multi-argument actions); the type is erased behind `Box<dyn Any + Send>`
/// per entry and re-checked at dispatch.
pub struct ActionSet<S, P = ()> {
    creators: HashMap<&'static str, ErasedCreator<S, P>>,
}

impl<S, P> ActionSet<S, P>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Create an empty action set.
    pub fn new() -> Self {
        Self {
            creators: HashMap::new(),
        }
    }

    /// Register an action-creator under `name`.
    ///
    /// The creator receives the dispatch arguments with their original
    /// signature and returns the body to run against the store API.
    pub fn action<A, C, B>(mut self, name: &'static str, creator: C) -> Self
    where
        A: Send + 'static,
        C: Fn(A) -> B + Send + Sync + 'static,
        B: FnOnce(&StoreApi<'_, S, P>) -> Result<(), StoreError>,
    {
        let erased: ErasedCreator<S, P> = Arc::new(move |args, api| {
            let args = args
                .downcast::<A>()
                .map_err(|_| StoreError::ActionArguments {
                    store: api.store,
                    action: name.to_string(),
                })?;
            creator(*args)(api)
        });
        self.creators.insert(name, erased);
        self
    }

    /// Whether any action has been registered.
    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }

    /// Number of registered actions.
    pub fn len(&self) -> usize {
        self.creators.len()
    }

    /// Bind every creator to a concrete store instance.
    pub(crate) fn bind(
        &self,
        store: &'static str,
        instance: Weak<StoreInstance<S, P>>,
    ) -> BoundActions<S, P> {
        BoundActions {
            store,
            creators: self.creators.clone(),
            instance,
        }
    }
}

impl<S, P> Default for ActionSet<S, P>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Actions bound to one store instance, invocable by name.
///
/// Dispatch is a direct, re-entrant synchronous call chain: an action body
/// may dispatch further actions (itself included) and every `set`/`update`
/// notifies listeners before the dispatch returns. An action that always
/// re-dispatches itself recurses until stack exhaustion; that is the
/// documented semantics, not a defect to defend against.
pub struct BoundActions<S, P = ()> {
    store: &'static str,
    creators: HashMap<&'static str, ErasedCreator<S, P>>,
    instance: Weak<StoreInstance<S, P>>,
}

impl<S, P> BoundActions<S, P>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Invoke a bound action, forwarding `args` to its creator unchanged.
    pub fn dispatch<A: Send + 'static>(&self, name: &str, args: A) -> Result<(), StoreError> {
        self.dispatch_boxed(name, Box::new(args))
    }

    /// Zero-argument convenience for [`dispatch`](Self::dispatch).
    pub fn call(&self, name: &str) -> Result<(), StoreError> {
        self.dispatch(name, ())
    }

    /// Whether an action of this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.creators.contains_key(name)
    }

    fn dispatch_boxed(&self, name: &str, args: Box<dyn Any + Send>) -> Result<(), StoreError> {
        let instance = self
            .instance
            .upgrade()
            .ok_or(StoreError::TornDown { store: self.store })?;
        if instance.is_torn_down() {
            return Err(StoreError::TornDown { store: self.store });
        }
        let creator = self
            .creators
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownAction {
                store: self.store,
                action: name.to_string(),
            })?;

        let props = instance.props();
        let api = StoreApi {
            store: self.store,
            state: instance.state(),
            actions: self,
            props: props.as_deref(),
        };
        creator(args, &api)
    }
}

/// The state-access surface handed to an action body.
pub struct StoreApi<'a, S, P = ()> {
    store: &'static str,
    state: &'a StoreState<S>,
    actions: &'a BoundActions<S, P>,
    props: Option<&'a P>,
}

impl<'a, S, P> StoreApi<'a, S, P>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Current state reference.
    pub fn get(&self) -> Arc<S> {
        self.state.get()
    }

    /// Replace the state and notify listeners synchronously.
    pub fn set(&self, next: S) {
        self.state.set(next);
    }

    /// Clone-mutate-install: partial updates without rebuilding the whole
    /// value. Notifies listeners synchronously.
    pub fn update<F>(&self, f: F)
    where
        S: Clone,
        F: FnOnce(&mut S),
    {
        self.state.update(f);
    }

    /// Invoke another bound action on the same store (action composition).
    /// Direct synchronous call; no queuing.
    pub fn dispatch<A: Send + 'static>(&self, name: &str, args: A) -> Result<(), StoreError> {
        self.actions.dispatch(name, args)
    }

    /// Container props installed by `StoreRegistry::configure`, if any.
    pub fn props(&self) -> Option<&'a P> {
        self.props
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{StoreDef, StoreRegistry};
    use std::sync::Mutex;

    #[derive(Clone, Debug, PartialEq)]
    struct CounterState {
        count: i64,
    }

    fn counter_def() -> StoreDef<CounterState> {
        StoreDef::new("counter", CounterState { count: 0 })
            .action("increment", |by: i64| {
                move |api: &StoreApi<CounterState>| {
                    api.update(|state| state.count += by);
                    Ok(())
                }
            })
            .action("increment_twice", |by: i64| {
                move |api: &StoreApi<CounterState>| {
                    api.dispatch("increment", by)?;
                    api.dispatch("increment", by)
                }
            })
    }

    #[test]
    fn dispatch_runs_creator_and_body() {
        let registry = StoreRegistry::new();
        let def = counter_def();
        let store = registry.get_store(&def, None).unwrap();

        store.actions().dispatch("increment", 3i64).unwrap();
        assert_eq!(store.state().get().count, 3);
    }

    #[test]
    fn actions_compose_synchronously() {
        let registry = StoreRegistry::new();
        let def = counter_def();
        let store = registry.get_store(&def, None).unwrap();

        store.actions().dispatch("increment_twice", 2i64).unwrap();
        assert_eq!(store.state().get().count, 4);
    }

    #[test]
    fn unknown_action_is_an_error() {
        let registry = StoreRegistry::new();
        let def = counter_def();
        let store = registry.get_store(&def, None).unwrap();

        let err = store.actions().dispatch("missing", ()).unwrap_err();
        assert!(matches!(err, StoreError::UnknownAction { .. }));
    }

    #[test]
    fn mismatched_arguments_are_an_error() {
        let registry = StoreRegistry::new();
        let def = counter_def();
        let store = registry.get_store(&def, None).unwrap();

        let err = store.actions().dispatch("increment", "three").unwrap_err();
        assert!(matches!(err, StoreError::ActionArguments { .. }));
        assert_eq!(store.state().get().count, 0);
    }

    #[test]
    fn creators_see_container_props() {
        let received = Arc::new(Mutex::new(None::<String>));
        let received_clone = received.clone();

        let def: StoreDef<CounterState, String> =
            StoreDef::new("scoped-counter", CounterState { count: 0 }).action(
                "record_props",
                move |(): ()| {
                    let received = received_clone.clone();
                    move |api: &StoreApi<CounterState, String>| {
                        *received.lock().unwrap() = api.props().cloned();
                        Ok(())
                    }
                },
            );

        let registry = StoreRegistry::new();
        let store = registry
            .configure(&def, "tab-1".into(), None, Some("hello".to_string()))
            .unwrap();

        store.actions().call("record_props").unwrap();
        assert_eq!(received.lock().unwrap().as_deref(), Some("hello"));
    }
}
