//! The subscribe/notify primitive underneath every store.
//!
//! `StoreState` holds one store's current value and its ordered listener
//! set. It notifies unconditionally on every write; change detection lives
//! in the subscription engine, not here.

mod state;

pub use state::{ListenerHandle, StoreState};
