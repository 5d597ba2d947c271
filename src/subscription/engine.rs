use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::action::BoundActions;
use crate::registry::StoreInstance;
use crate::state::ListenerHandle;
use crate::subscription::ShallowEq;

type RawSelector<S, P, V> = Arc<dyn Fn(&Arc<S>, Option<&P>) -> V + Send + Sync>;
type UpdateFn = Arc<dyn Fn() + Send + Sync>;

/// Result of a render-path read: the current selected value plus whether a
/// delivery is pending since the last `select`.
#[derive(Debug, Clone)]
pub struct Selected<V> {
    /// The selected value; `None` only for actions-only consumers.
    pub value: Option<V>,
    /// True exactly once per delivered change, then cleared.
    pub changed: bool,
}

struct SelectCell<S, P, V> {
    // Latest props, used for the next recomputation.
    props: Option<Arc<P>>,
    // Memoization key: the (state, props) reference pair of the last
    // selector invocation.
    last_state: Option<Arc<S>>,
    last_props: Option<Arc<P>>,
    // The previously delivered value; shallow-unequal outputs are compared
    // against this, equal outputs are discarded.
    last_value: Option<V>,
    pending: bool,
}

struct SubscriptionInner<S, P, V> {
    instance: Arc<StoreInstance<S, P>>,
    selector: RawSelector<S, P, V>,
    on_update: UpdateFn,
    cell: Mutex<SelectCell<S, P, V>>,
}

impl<S, P, V> SubscriptionInner<S, P, V>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
    V: ShallowEq + Send + 'static,
{
    /// Recompute against `state` unless the memo key still matches.
    /// Returns whether a new value was recorded for delivery.
    fn refresh(&self, cell: &mut SelectCell<S, P, V>, state: Arc<S>) -> bool {
        let props = cell.props.clone();
        let same_inputs = cell
            .last_state
            .as_ref()
            .is_some_and(|last| Arc::ptr_eq(last, &state))
            && arc_opt_ptr_eq(&cell.last_props, &props);
        if same_inputs {
            return false;
        }

        let value = (self.selector)(&state, props.as_deref());
        let changed = !cell
            .last_value
            .as_ref()
            .is_some_and(|last| last.shallow_eq(&value));
        cell.last_state = Some(state);
        cell.last_props = props;
        if changed {
            cell.last_value = Some(value);
            cell.pending = true;
        }
        changed
    }

    fn on_store_change(&self) {
        let state = self.instance.state().get();
        let deliver = {
            let mut cell = self.cell.lock().unwrap();
            self.refresh(&mut cell, state)
        };
        // The cell lock is released before the trigger runs: the consumer's
        // update path may re-enter `select` or dispatch further actions.
        if deliver {
            (self.on_update)();
        } else {
            trace!("selected value unchanged, delivery suppressed");
        }
    }
}

/// One consumer's subscription to one store instance.
///
/// Created on mount, dropped on unmount; there are no intermediate states.
/// Dropping removes the listener synchronously, and a notification already
/// iterating its snapshot finds only a dead weak reference, so no delivery
/// ever reaches a torn-down consumer.
pub struct Subscription<S, P = (), V = ()> {
    instance: Arc<StoreInstance<S, P>>,
    inner: Option<Arc<SubscriptionInner<S, P, V>>>,
    _listener: Option<ListenerHandle>,
}

impl<S, P, V> Subscription<S, P, V>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
    V: ShallowEq + Clone + Send + 'static,
{
    /// Subscribe with a selector.
    ///
    /// The selector is invoked immediately to seed the delivered value;
    /// `on_update` is the consumer's re-render trigger, invoked with no
    /// payload (pull model) whenever a store notification produces a
    /// shallow-unequal selector output.
    pub fn new<F, U>(
        instance: Arc<StoreInstance<S, P>>,
        selector: F,
        props: Option<P>,
        on_update: U,
    ) -> Self
    where
        F: Fn(&S, Option<&P>) -> V + Send + Sync + 'static,
        U: Fn() + Send + Sync + 'static,
    {
        let raw: RawSelector<S, P, V> = Arc::new(move |state, props| selector(state, props));
        Self::subscribe_with(instance, raw, props, Arc::new(on_update))
    }

    fn subscribe_with(
        instance: Arc<StoreInstance<S, P>>,
        selector: RawSelector<S, P, V>,
        props: Option<P>,
        on_update: UpdateFn,
    ) -> Self {
        let props = props.map(Arc::new);
        let state = instance.state().get();
        let value = selector(&state, props.as_deref());

        let inner = Arc::new(SubscriptionInner {
            instance: Arc::clone(&instance),
            selector,
            on_update,
            cell: Mutex::new(SelectCell {
                props: props.clone(),
                last_state: Some(state),
                last_props: props,
                last_value: Some(value),
                pending: false,
            }),
        });

        let weak = Arc::downgrade(&inner);
        let listener = instance.state().subscribe(move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_store_change();
            }
        });

        Subscription {
            instance,
            inner: Some(inner),
            _listener: Some(listener),
        }
    }

    /// Read the current selected value.
    ///
    /// Memoized at the input level: when neither the state pointer nor the
    /// props pointer moved since the last computation, the selector is not
    /// invoked and the cached value is returned. `changed` reports (and
    /// clears) the pending-delivery flag, so a re-render caused purely by
    /// the owning tree never observes a duplicate delivery.
    pub fn select(&self) -> Selected<V> {
        let inner = match &self.inner {
            Some(inner) => inner,
            None => {
                return Selected {
                    value: None,
                    changed: false,
                }
            }
        };
        let state = inner.instance.state().get();
        let mut cell = inner.cell.lock().unwrap();
        inner.refresh(&mut cell, state);
        Selected {
            value: cell.last_value.clone(),
            changed: std::mem::take(&mut cell.pending),
        }
    }

    /// Install new props for subsequent recomputation.
    pub fn set_props(&self, props: Option<P>) {
        if let Some(inner) = &self.inner {
            inner.cell.lock().unwrap().props = props.map(Arc::new);
        }
    }
}

impl<S, P> Subscription<S, P, Arc<S>>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Subscribe without a selector: the consumer's value is the state
    /// reference itself, so every transition (a fresh `Arc`) is delivered.
    pub fn of_state<U>(instance: Arc<StoreInstance<S, P>>, props: Option<P>, on_update: U) -> Self
    where
        U: Fn() + Send + Sync + 'static,
    {
        let raw: RawSelector<S, P, Arc<S>> = Arc::new(|state, _| Arc::clone(state));
        Self::subscribe_with(instance, raw, props, Arc::new(on_update))
    }
}

impl<S, P> Subscription<S, P, ()>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// The explicit-null-selector consumer: actions stay reachable, but no
    /// listener is registered, `select` always yields no value, and the
    /// consumer is never re-notified on state changes.
    pub fn actions_only(instance: Arc<StoreInstance<S, P>>) -> Self {
        Subscription {
            instance,
            inner: None,
            _listener: None,
        }
    }
}

impl<S, P, V> Subscription<S, P, V>
where
    S: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// The store's bound actions.
    pub fn actions(&self) -> &BoundActions<S, P> {
        self.instance.actions()
    }

    /// The subscribed store instance.
    pub fn instance(&self) -> &Arc<StoreInstance<S, P>> {
        &self.instance
    }
}

fn arc_opt_ptr_eq<T>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::StoreApi;
    use crate::registry::{StoreDef, StoreRegistry};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug, PartialEq)]
    struct CounterState {
        count: i64,
    }

    fn counter_def() -> StoreDef<CounterState> {
        StoreDef::new("counter", CounterState { count: 0 }).action("increment", |by: i64| {
            move |api: &StoreApi<CounterState>| {
                api.update(|state| state.count += by);
                Ok(())
            }
        })
    }

    #[test]
    fn selector_seeds_initial_value_without_update() {
        let registry = StoreRegistry::new();
        let def = counter_def();
        let store = registry.get_store(&def, None).unwrap();

        let updates = Arc::new(AtomicUsize::new(0));
        let updates_clone = updates.clone();
        let sub = Subscription::new(
            store,
            |state: &CounterState, _: Option<&()>| state.count,
            None,
            move || {
                updates_clone.fetch_add(1, Ordering::SeqCst);
            },
        );

        let selected = sub.select();
        assert_eq!(selected.value, Some(0));
        assert!(!selected.changed);
        assert_eq!(updates.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn shallow_equal_outputs_are_suppressed() {
        let registry = StoreRegistry::new();
        let def = counter_def();
        let store = registry.get_store(&def, None).unwrap();

        let updates = Arc::new(AtomicUsize::new(0));
        let updates_clone = updates.clone();
        let sub = Subscription::new(
            store.clone(),
            |state: &CounterState, _: Option<&()>| state.count > 0,
            None,
            move || {
                updates_clone.fetch_add(1, Ordering::SeqCst);
            },
        );

        store.actions().dispatch("increment", 1i64).unwrap();
        assert_eq!(updates.load(Ordering::SeqCst), 1);
        assert_eq!(sub.select().value, Some(true));

        // Output stays `true`; the recomputed value is discarded.
        store.actions().dispatch("increment", 1i64).unwrap();
        assert_eq!(updates.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn select_memoizes_on_state_and_props_references() {
        let registry = StoreRegistry::new();
        let def = counter_def();
        let store = registry.get_store(&def, None).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let sub = Subscription::new(
            store.clone(),
            move |state: &CounterState, _: Option<&()>| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                state.count
            },
            None,
            || {},
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Same state reference: select never re-invokes the selector.
        sub.select();
        sub.select();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        store.actions().dispatch("increment", 1i64).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        sub.select();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn changed_flag_reports_once_per_delivery() {
        let registry = StoreRegistry::new();
        let def = counter_def();
        let store = registry.get_store(&def, None).unwrap();

        let sub = Subscription::new(
            store.clone(),
            |state: &CounterState, _: Option<&()>| state.count,
            None,
            || {},
        );

        store.actions().dispatch("increment", 1i64).unwrap();
        assert!(sub.select().changed);
        assert!(!sub.select().changed);
    }

    #[test]
    fn new_props_reference_forces_recomputation() {
        let registry = StoreRegistry::new();
        let def: StoreDef<CounterState, i64> = StoreDef::new(
            "counter-with-props",
            CounterState { count: 2 },
        )
        .action("increment", |by: i64| {
            move |api: &StoreApi<CounterState, i64>| {
                api.update(|state| state.count += by);
                Ok(())
            }
        });
        let store = registry.get_store(&def, None).unwrap();

        let sub = Subscription::new(
            store,
            |state: &CounterState, props: Option<&i64>| state.count * props.copied().unwrap_or(1),
            Some(1),
            || {},
        );
        assert_eq!(sub.select().value, Some(2));

        sub.set_props(Some(10));
        let selected = sub.select();
        assert_eq!(selected.value, Some(20));
        assert!(selected.changed);
    }

    #[test]
    fn dropped_subscription_receives_nothing() {
        let registry = StoreRegistry::new();
        let def = counter_def();
        let store = registry.get_store(&def, None).unwrap();

        let updates = Arc::new(AtomicUsize::new(0));
        let updates_clone = updates.clone();
        let sub = Subscription::new(
            store.clone(),
            |state: &CounterState, _: Option<&()>| state.count,
            None,
            move || {
                updates_clone.fetch_add(1, Ordering::SeqCst);
            },
        );

        store.actions().dispatch("increment", 1i64).unwrap();
        assert_eq!(updates.load(Ordering::SeqCst), 1);

        drop(sub);
        store.actions().dispatch("increment", 1i64).unwrap();
        assert_eq!(updates.load(Ordering::SeqCst), 1);
        assert_eq!(store.state().listener_count(), 0);
    }

    #[test]
    fn actions_only_consumer_never_re_renders() {
        let registry = StoreRegistry::new();
        let def = counter_def();
        let store = registry.get_store(&def, None).unwrap();

        let sub: Subscription<CounterState> = Subscription::actions_only(store.clone());
        assert_eq!(store.state().listener_count(), 0);

        sub.actions().dispatch("increment", 1i64).unwrap();
        let selected = sub.select();
        assert!(selected.value.is_none());
        assert!(!selected.changed);
    }

    #[test]
    fn full_state_consumer_sees_every_transition() {
        let registry = StoreRegistry::new();
        let def = counter_def();
        let store = registry.get_store(&def, None).unwrap();

        let updates = Arc::new(AtomicUsize::new(0));
        let updates_clone = updates.clone();
        let sub = Subscription::of_state(store.clone(), None, move || {
            updates_clone.fetch_add(1, Ordering::SeqCst);
        });

        store.actions().dispatch("increment", 1i64).unwrap();
        store.actions().dispatch("increment", 5i64).unwrap();

        assert_eq!(updates.load(Ordering::SeqCst), 2);
        assert_eq!(sub.select().value.unwrap().count, 6);
    }
}
