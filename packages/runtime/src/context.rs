use crate::block::Block;
use crate::config::AppConfig;
use crate::directives::{Cleanup, Directive};
use crate::dom::{Document, NodeId, NodeRef};
use crate::eval::{Env, Evaluator};
use crate::reactive::{untracked, ReactiveEffect, ReactiveObject};
use crate::scheduler::{Job, Scheduler};
use crate::scope::Scope;
use regex::Regex;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

pub(crate) type Registry = Rc<RefCell<HashMap<String, Rc<dyn Directive>>>>;

/// State shared by every context of one application
pub struct Runtime {
    pub scheduler: Scheduler,
    pub evaluator: Evaluator,
    pub config: AppConfig,
    pub(crate) interpolation: Regex,
    /// Set while walking a `v-once` subtree
    pub(crate) in_once: Cell<bool>,
}

impl Runtime {
    pub fn new(config: AppConfig) -> Self {
        Self {
            scheduler: Scheduler::new(config.max_job_runs),
            evaluator: Evaluator::new(config.expression_cache_capacity),
            interpolation: config.interpolation_pattern(),
            in_once: Cell::new(false),
            config,
        }
    }
}

/// What a context owns and releases on teardown
#[derive(Default)]
pub(crate) struct Lifecycle {
    pub(crate) blocks: RefCell<Vec<Rc<Block>>>,
    pub(crate) effects: RefCell<Vec<ReactiveEffect>>,
    pub(crate) cleanups: RefCell<Vec<Cleanup>>,
    pub(crate) torn_down: Cell<bool>,
}

impl Lifecycle {
    /// Child blocks first, then subscriptions, then cleanups. Runs once.
    pub(crate) fn teardown(&self) {
        if self.torn_down.replace(true) {
            return;
        }
        let blocks = std::mem::take(&mut *self.blocks.borrow_mut());
        for block in blocks {
            block.teardown();
        }
        let effects = std::mem::take(&mut *self.effects.borrow_mut());
        for effect in effects {
            effect.stop();
        }
        let cleanups = std::mem::take(&mut *self.cleanups.borrow_mut());
        for cleanup in cleanups {
            cleanup();
        }
    }
}

/// Everything a directive needs from the region it lives in: the scope
/// chain, the directive registry, and bookkeeping for what must be released
/// when the owning block goes away.
#[derive(Clone)]
pub struct Context {
    pub scope: Scope,
    pub document: Rc<Document>,
    pub(crate) registry: Registry,
    pub(crate) lifecycle: Rc<Lifecycle>,
    pub(crate) runtime: Rc<Runtime>,
}

impl Context {
    pub(crate) fn root(
        document: Rc<Document>,
        scope: Scope,
        registry: Registry,
        runtime: Rc<Runtime>,
    ) -> Self {
        Self {
            scope,
            document,
            registry,
            lifecycle: Rc::new(Lifecycle::default()),
            runtime,
        }
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.runtime.evaluator
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.runtime.scheduler
    }

    /// Evaluation environment with `$el` bound to `el`
    pub fn env(&self, el: NodeId) -> Env {
        Env::new(self.scope.clone()).with_el(NodeRef::new(self.document.clone(), el))
    }

    pub fn node_ref(&self, id: NodeId) -> NodeRef {
        NodeRef::new(self.document.clone(), id)
    }

    /// Register a computation that re-runs, through the scheduler, whenever
    /// the state it read changes. Inside a `v-once` subtree the computation
    /// runs once, right away, and never subscribes.
    pub fn effect(&self, f: impl Fn() + 'static) -> Option<ReactiveEffect> {
        if self.lifecycle.torn_down.get() {
            return None;
        }

        if self.runtime.in_once.get() {
            untracked(f);
            return None;
        }

        let slot: Rc<RefCell<Option<crate::reactive::WeakEffect>>> = Rc::new(RefCell::new(None));
        let job: Job = {
            let slot = slot.clone();
            Rc::new(move || {
                let effect = slot.borrow().as_ref().and_then(|weak| weak.upgrade());
                if let Some(effect) = effect {
                    effect.run();
                }
            })
        };
        let runtime = self.runtime.clone();
        let effect = ReactiveEffect::with_scheduler(f, move || {
            runtime.scheduler.queue_job(job.clone());
        });
        *slot.borrow_mut() = Some(effect.downgrade());

        self.lifecycle.effects.borrow_mut().push(effect.clone());
        effect.run();
        Some(effect)
    }

    pub fn on_cleanup(&self, cleanup: Cleanup) {
        self.lifecycle.cleanups.borrow_mut().push(cleanup);
    }

    /// Blocks mounted directly under this context
    pub fn child_block_count(&self) -> usize {
        self.lifecycle.blocks.borrow().len()
    }

    pub fn active_effect_count(&self) -> usize {
        self.lifecycle.effects.borrow().len()
    }

    pub fn is_torn_down(&self) -> bool {
        self.lifecycle.torn_down.get()
    }
}

/// A context sharing the parent's scope and registry, with its own
/// bookkeeping
pub fn create_context(parent: &Context) -> Context {
    Context {
        scope: parent.scope.clone(),
        document: parent.document.clone(),
        registry: parent.registry.clone(),
        lifecycle: Rc::new(Lifecycle::default()),
        runtime: parent.runtime.clone(),
    }
}

/// A context whose scope gains a new innermost frame seeded with `data`.
/// Bookkeeping stays with `ctx`, so whatever is bound under the new frame is
/// released together with the block that owns `ctx`.
pub fn create_scoped_context(ctx: &Context, data: ReactiveObject) -> Context {
    let mut scoped = ctx.clone();
    scoped.scope = ctx.scope.child(data);
    scoped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Value;

    fn context() -> Context {
        let runtime = Rc::new(Runtime::new(AppConfig::default()));
        let scope = Scope::root(ReactiveObject::from_pairs([("n", Value::from(1))]));
        Context::root(Document::new(), scope, Registry::default(), runtime)
    }

    #[test]
    fn test_effect_reruns_through_scheduler() {
        let ctx = context();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (scope, out) = (ctx.scope.clone(), seen.clone());
        ctx.effect(move || out.borrow_mut().push(scope.get("n")));

        ctx.scope.set("n", Value::from(2));
        ctx.scope.set("n", Value::from(3));
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(ctx.scheduler().pending_jobs(), 1);

        ctx.scheduler().flush();
        assert_eq!(*seen.borrow(), vec![Value::from(1), Value::from(3)]);
    }

    #[test]
    fn test_once_mode_runs_once_without_subscribing() {
        let ctx = context();
        let runs = Rc::new(Cell::new(0));
        ctx.runtime.in_once.set(true);
        let (scope, r) = (ctx.scope.clone(), runs.clone());
        assert!(ctx
            .effect(move || {
                scope.get("n");
                r.set(r.get() + 1);
            })
            .is_none());
        ctx.runtime.in_once.set(false);

        assert_eq!(runs.get(), 1);
        assert!(!ctx.scheduler().is_flush_pending());
        ctx.scope.set("n", Value::from(9));
        ctx.scheduler().flush();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_scoped_context_writes_through() {
        let ctx = context();
        let child = create_scoped_context(&ctx, ReactiveObject::from_pairs([("own", Value::Null)]));
        child.scope.set("n", Value::from(5));
        child.scope.set("own", Value::from(1));
        assert_eq!(ctx.scope.get("n"), Value::from(5));
        assert!(!ctx.scope.has("own"));
        assert!(Rc::ptr_eq(&child.registry, &ctx.registry));
        assert!(Rc::ptr_eq(&child.lifecycle, &ctx.lifecycle));
        assert!(!Rc::ptr_eq(&create_context(&ctx).lifecycle, &ctx.lifecycle));
    }

    #[test]
    fn test_teardown_stops_effects_and_runs_cleanups_once() {
        let ctx = context();
        let runs = Rc::new(Cell::new(0));
        let cleaned = Rc::new(Cell::new(0));
        let (scope, r) = (ctx.scope.clone(), runs.clone());
        ctx.effect(move || {
            scope.get("n");
            r.set(r.get() + 1);
        });
        let c = cleaned.clone();
        ctx.on_cleanup(Box::new(move || c.set(c.get() + 1)));

        ctx.lifecycle.teardown();
        ctx.lifecycle.teardown();
        ctx.scope.set("n", Value::from(2));
        ctx.scheduler().flush();

        assert_eq!(runs.get(), 1);
        assert_eq!(cleaned.get(), 1);
        assert!(ctx.effect(|| {}).is_none());
    }
}
