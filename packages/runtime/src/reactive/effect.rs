use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

thread_local! {
    static EFFECT_STACK: RefCell<Vec<Rc<EffectInner>>> = const { RefCell::new(Vec::new()) };
    static TRACKING_PAUSED: Cell<usize> = const { Cell::new(0) };
}

/// Subscriber list for one observable slot (an object key, an object's key
/// set, or a whole array)
#[derive(Clone, Default)]
pub(crate) struct Dep(Rc<RefCell<Vec<Weak<EffectInner>>>>);

impl Dep {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Subscribe the running effect, if any, to this dep
    pub(crate) fn track(&self) {
        if TRACKING_PAUSED.with(|p| p.get()) > 0 {
            return;
        }
        let Some(active) = EFFECT_STACK.with(|stack| stack.borrow().last().cloned()) else {
            return;
        };

        let mut subscribers = self.0.borrow_mut();
        let already = subscribers
            .iter()
            .any(|weak| std::ptr::eq(weak.as_ptr(), Rc::as_ptr(&active)));
        if !already {
            subscribers.push(Rc::downgrade(&active));
            active.deps.borrow_mut().push(self.clone());
        }
    }

    /// Notify every subscriber except the effect currently running
    pub(crate) fn trigger(&self) {
        let running = EFFECT_STACK.with(|stack| stack.borrow().last().cloned());
        let subscribers: Vec<Rc<EffectInner>> = {
            let mut list = self.0.borrow_mut();
            list.retain(|weak| weak.strong_count() > 0);
            list.iter().filter_map(Weak::upgrade).collect()
        };

        for effect in subscribers {
            if let Some(running) = &running {
                if Rc::ptr_eq(running, &effect) {
                    continue;
                }
            }
            ReactiveEffect(effect).schedule();
        }
    }

    fn unsubscribe(&self, effect: &EffectInner) {
        self.0
            .borrow_mut()
            .retain(|weak| !std::ptr::eq(weak.as_ptr(), effect as *const EffectInner));
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

pub(crate) struct EffectInner {
    func: RefCell<Option<Rc<dyn Fn()>>>,
    scheduler: RefCell<Option<Rc<dyn Fn()>>>,
    deps: RefCell<Vec<Dep>>,
    active: Cell<bool>,
}

impl EffectInner {
    fn cleanup(&self) {
        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        for dep in deps {
            dep.unsubscribe(self);
        }
    }
}

/// A computation that re-runs when the reactive state it read changes.
///
/// With a scheduler, a change calls the scheduler instead of re-running
/// directly; the scheduler decides when `run` happens.
#[derive(Clone)]
pub struct ReactiveEffect(Rc<EffectInner>);

impl ReactiveEffect {
    pub fn new(func: impl Fn() + 'static) -> Self {
        Self(Rc::new(EffectInner {
            func: RefCell::new(Some(Rc::new(func))),
            scheduler: RefCell::new(None),
            deps: RefCell::new(Vec::new()),
            active: Cell::new(true),
        }))
    }

    pub fn with_scheduler(func: impl Fn() + 'static, scheduler: impl Fn() + 'static) -> Self {
        let effect = Self::new(func);
        *effect.0.scheduler.borrow_mut() = Some(Rc::new(scheduler));
        effect
    }

    /// Run the computation, re-collecting its dependencies.
    /// A stopped effect does nothing.
    pub fn run(&self) {
        if !self.0.active.get() {
            return;
        }
        let Some(func) = self.0.func.borrow().clone() else {
            return;
        };

        self.0.cleanup();
        EFFECT_STACK.with(|stack| stack.borrow_mut().push(self.0.clone()));
        // an effect created inside `untracked` still tracks its own reads
        let _guard = PopOnDrop {
            paused: TRACKING_PAUSED.with(|p| p.replace(0)),
        };
        func();
    }

    /// Unsubscribe from every dep and drop the computation. Idempotent.
    pub fn stop(&self) {
        if !self.0.active.replace(false) {
            return;
        }
        self.0.cleanup();
        self.0.func.borrow_mut().take();
        self.0.scheduler.borrow_mut().take();
    }

    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    pub fn ptr_eq(&self, other: &ReactiveEffect) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> WeakEffect {
        WeakEffect(Rc::downgrade(&self.0))
    }

    fn schedule(&self) {
        let scheduler = self.0.scheduler.borrow().clone();
        match scheduler {
            Some(scheduler) => scheduler(),
            None => self.run(),
        }
    }

    #[cfg(test)]
    pub(crate) fn dep_count(&self) -> usize {
        self.0.deps.borrow().len()
    }
}

/// Non-owning handle, used by scheduler jobs so a queued job never keeps a
/// torn-down effect alive
#[derive(Clone)]
pub(crate) struct WeakEffect(Weak<EffectInner>);

impl WeakEffect {
    pub(crate) fn upgrade(&self) -> Option<ReactiveEffect> {
        self.0.upgrade().map(ReactiveEffect)
    }
}

struct PopOnDrop {
    paused: usize,
}

impl Drop for PopOnDrop {
    fn drop(&mut self) {
        EFFECT_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
        TRACKING_PAUSED.with(|p| p.set(self.paused));
    }
}

/// Create and immediately run an effect without a scheduler
pub fn effect(func: impl Fn() + 'static) -> ReactiveEffect {
    let effect = ReactiveEffect::new(func);
    effect.run();
    effect
}

/// Run `f` without subscribing the current effect to anything it reads
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    TRACKING_PAUSED.with(|p| p.set(p.get() + 1));
    struct Resume;
    impl Drop for Resume {
        fn drop(&mut self) {
            TRACKING_PAUSED.with(|p| p.set(p.get().saturating_sub(1)));
        }
    }
    let _resume = Resume;
    f()
}
