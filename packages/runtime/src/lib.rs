//! Petal runtime: binds directive attributes in a markup tree to reactive
//! state and keeps the tree in sync as that state changes.
//!
//! Mount an [`App`] on a [`Document`], write to its [`Scope`], then call
//! [`App::tick`] to flush the batched updates.

pub mod app;
pub mod block;
pub mod config;
pub mod context;
pub mod directives;
pub mod dom;
pub mod error;
pub mod eval;
pub mod reactive;
pub mod scheduler;
pub mod scope;
mod walk;

pub use app::App;
pub use block::{Block, BlockKey};
pub use config::AppConfig;
pub use context::{create_context, create_scoped_context, Context, Runtime};
pub use directives::{BindingSite, BuiltinDirective, Cleanup, Directive, Modifiers};
pub use dom::{Document, Event, NodeId, NodeKind, NodeRef};
pub use error::{DomError, DomResult, EvalError, EvalResult};
pub use eval::{is_global, Env, Evaluator};
pub use reactive::{effect, untracked, Callable, ReactiveArray, ReactiveEffect, ReactiveObject, Value};
pub use scheduler::{Job, Scheduler};
pub use scope::Scope;
