//! The change-detection engine shared by every view binding.
//!
//! A `Subscription` ties one consumer to one store instance: on every
//! store notification it recomputes the consumer's selector, compares the
//! output to the previously delivered value with shallow structural
//! equality, and only fires the consumer's update trigger when the value
//! actually moved. Reads on the render path (`select`) are memoized
//! against the last `(state, props)` reference pair.

mod engine;
mod shallow;

pub use engine::{Selected, Subscription};
pub use shallow::ShallowEq;
