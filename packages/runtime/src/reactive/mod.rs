//! Fine-grained reactive state.
//!
//! Objects track reads per key, arrays track reads as a whole. An effect run
//! records every dep it touches; a later write to one of them re-runs the
//! effect, or hands it to the effect's scheduler when it has one.

mod effect;
mod value;

pub(crate) use effect::WeakEffect;
pub use effect::{effect, untracked, ReactiveEffect};
pub use value::{format_number, Callable, ReactiveArray, ReactiveObject, Value};
