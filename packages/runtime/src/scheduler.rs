use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, warn};

pub type Job = Rc<dyn Fn()>;

fn job_ptr(job: &Job) -> *const () {
    Rc::as_ptr(job) as *const ()
}

/// Batches reactive re-runs into one flush.
///
/// A job is identified by its `Rc` allocation: queueing the same job again
/// before it has run is a no-op. A job queued while the flush is running is
/// appended and runs in the same flush, including a job that already ran;
/// `max_job_runs` caps how often one job may run per flush.
pub struct Scheduler {
    queue: RefCell<Vec<Job>>,
    post_flush: RefCell<Vec<Box<dyn FnOnce()>>>,
    /// Index of the job currently running, while flushing
    cursor: Cell<Option<usize>>,
    flush_pending: Cell<bool>,
    max_job_runs: usize,
}

impl Scheduler {
    pub fn new(max_job_runs: usize) -> Self {
        Self {
            queue: RefCell::new(Vec::new()),
            post_flush: RefCell::new(Vec::new()),
            cursor: Cell::new(None),
            flush_pending: Cell::new(false),
            max_job_runs: max_job_runs.max(1),
        }
    }

    pub fn queue_job(&self, job: Job) {
        let mut queue = self.queue.borrow_mut();
        let first_pending = self.cursor.get().map_or(0, |running| running + 1);
        let ptr = job_ptr(&job);
        if queue
            .iter()
            .skip(first_pending)
            .any(|queued| job_ptr(queued) == ptr)
        {
            return;
        }
        queue.push(job);
        drop(queue);
        self.request_flush();
    }

    /// Run `callback` once the next flush has drained the job queue
    pub fn next_tick(&self, callback: impl FnOnce() + 'static) {
        self.post_flush.borrow_mut().push(Box::new(callback));
        self.request_flush();
    }

    fn request_flush(&self) {
        if !self.flush_pending.replace(true) {
            debug!("Flush requested");
        }
    }

    pub fn is_flush_pending(&self) -> bool {
        self.flush_pending.get()
    }

    pub fn pending_jobs(&self) -> usize {
        let first_pending = self.cursor.get().map_or(0, |running| running + 1);
        self.queue.borrow().len().saturating_sub(first_pending)
    }

    /// Drain the queue in order, then the post-flush callbacks; repeat until
    /// both are empty. Calling `flush` from inside a job does nothing.
    pub fn flush(&self) {
        if self.cursor.get().is_some() {
            return;
        }

        let mut runs: HashMap<*const (), usize> = HashMap::new();
        let mut total = 0usize;
        loop {
            let mut index = 0;
            loop {
                let job = match self.queue.borrow().get(index) {
                    Some(job) => job.clone(),
                    None => break,
                };
                self.cursor.set(Some(index));
                index += 1;

                let count = runs.entry(job_ptr(&job)).or_insert(0);
                *count += 1;
                if *count > self.max_job_runs {
                    if *count == self.max_job_runs + 1 {
                        warn!(
                            max_job_runs = self.max_job_runs,
                            "Job re-queued itself too many times in one flush; skipping"
                        );
                    }
                    continue;
                }
                job();
                total += 1;
            }
            self.queue.borrow_mut().clear();
            self.cursor.set(None);
            self.flush_pending.set(false);

            let callbacks = std::mem::take(&mut *self.post_flush.borrow_mut());
            for callback in callbacks {
                callback();
            }

            if self.queue.borrow().is_empty() && self.post_flush.borrow().is_empty() {
                break;
            }
        }
        if total > 0 {
            debug!(jobs = total, "Flush complete");
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(100)
    }
}
