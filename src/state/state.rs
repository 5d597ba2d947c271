use std::sync::{Arc, Mutex, RwLock, Weak};

use tracing::trace;

type Listener = Arc<dyn Fn() + Send + Sync>;

struct ListenerSet {
    next_id: u64,
    // Insertion order is notification order.
    entries: Vec<(u64, Listener)>,
}

/// The mutable holder for one store's current value and its listeners.
///
/// State lives behind an `Arc` that is replaced wholesale on every write,
/// so two reads straddling a transition never compare pointer-equal. Every
/// `set`/`update` notifies every listener, equal value or not: this
/// primitive performs no change detection.
pub struct StoreState<S> {
    state: RwLock<Arc<S>>,
    listeners: Arc<Mutex<ListenerSet>>,
}

impl<S> StoreState<S> {
    /// Create state holding the given initial value.
    pub fn new(initial: S) -> Self {
        Self {
            state: RwLock::new(Arc::new(initial)),
            listeners: Arc::new(Mutex::new(ListenerSet {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Get the current state reference. No side effects.
    pub fn get(&self) -> Arc<S> {
        Arc::clone(&self.state.read().unwrap())
    }

    /// Replace the state, then synchronously notify every listener in
    /// insertion order.
    pub fn set(&self, next: S) {
        self.install(Arc::new(next));
    }

    /// Clone the current value, apply `f`, and install the result as a new
    /// state reference. Same notification semantics as [`set`](Self::set).
    pub fn update<F>(&self, f: F)
    where
        S: Clone,
        F: FnOnce(&mut S),
    {
        let mut value = {
            let current = self.state.read().unwrap();
            (**current).clone()
        };
        f(&mut value);
        self.install(Arc::new(value));
    }

    fn install(&self, next: Arc<S>) {
        *self.state.write().unwrap() = next;
        self.notify();
    }

    /// Register a listener. The returned handle removes it; calling
    /// [`ListenerHandle::unsubscribe`] more than once is a no-op, and the
    /// handle also unsubscribes on drop.
    ///
    /// Listeners are invoked with no payload (pull model): a listener
    /// re-reads whatever state it needs.
    pub fn subscribe<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut set = self.listeners.lock().unwrap();
        let id = set.next_id;
        set.next_id += 1;
        set.entries.push((id, Arc::new(listener)));
        ListenerHandle {
            id,
            set: Arc::downgrade(&self.listeners),
        }
    }

    /// Notify all listeners in insertion order.
    ///
    /// Iterates a snapshot taken under the lock and released before any
    /// callback runs, so a listener may subscribe or unsubscribe (itself
    /// included) mid-notification without corrupting the set.
    fn notify(&self) {
        let snapshot: Vec<Listener> = {
            let set = self.listeners.lock().unwrap();
            set.entries.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        trace!(listeners = snapshot.len(), "state transition");
        for listener in snapshot {
            listener();
        }
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().entries.len()
    }

    /// Drop every listener. Teardown support for the registry.
    pub(crate) fn clear_listeners(&self) {
        self.listeners.lock().unwrap().entries.clear();
    }
}

/// Unsubscribe capability returned by [`StoreState::subscribe`].
///
/// Idempotent: once the listener is gone, further calls (and the drop) do
/// nothing.
pub struct ListenerHandle {
    id: u64,
    set: Weak<Mutex<ListenerSet>>,
}

impl ListenerHandle {
    /// Remove the listener this handle was issued for.
    pub fn unsubscribe(&self) {
        if let Some(set) = self.set.upgrade() {
            let mut set = set.lock().unwrap();
            set.entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
