use std::fmt;
use std::rc::Rc;

use crate::scheduler::{MicrotaskQueue, Scheduler, Task};
use crate::unhandled::UnhandledRejections;

/// The capabilities every promise needs: where to defer work and whom to tell
/// about unhandled rejections.
///
/// Cloning is cheap and shares both. Promises derived from one another share
/// their runtime.
#[derive(Clone)]
pub struct Runtime {
    scheduler: Rc<dyn Scheduler>,
    queue: Option<Rc<MicrotaskQueue>>,
    unhandled: UnhandledRejections,
}

impl Runtime {
    /// A runtime backed by its own [`MicrotaskQueue`].
    pub fn new() -> Self {
        let queue = Rc::new(MicrotaskQueue::new());
        Self {
            scheduler: queue.clone(),
            queue: Some(queue),
            unhandled: UnhandledRejections::new(),
        }
    }

    /// A runtime that defers work to a host scheduler. The host is then
    /// responsible for running what it was given;
    /// [`run_until_idle`](Self::run_until_idle) does nothing.
    pub fn with_scheduler(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            queue: None,
            unhandled: UnhandledRejections::new(),
        }
    }

    pub fn schedule(&self, task: Task) {
        self.scheduler.schedule(task);
    }

    /// Drain the built-in queue. Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        match &self.queue {
            Some(queue) => queue.run_until_idle(),
            None => 0,
        }
    }

    pub fn unhandled_rejections(&self) -> &UnhandledRejections {
        &self.unhandled
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("builtin_queue", &self.queue.is_some())
            .field("unhandled", &self.unhandled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Runtime;
    use crate::scheduler::{Scheduler, Task};
    use crate::unhandled::RejectionEvent;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recording {
        tasks: RefCell<Vec<Task>>,
    }

    impl Scheduler for Recording {
        fn schedule(&self, task: Task) {
            self.tasks.borrow_mut().push(task);
        }
    }

    #[test]
    fn injected_scheduler_receives_tasks() {
        let host = Rc::new(Recording::default());
        let rt = Runtime::with_scheduler(host.clone());
        rt.schedule(Box::new(|| {}));
        assert_eq!(rt.run_until_idle(), 0);
        assert_eq!(host.tasks.borrow().len(), 1);
    }

    #[test]
    fn clones_share_queue_and_registry() {
        let rt = Runtime::new();
        let other = rt.clone();
        other.schedule(Box::new(|| {}));
        other.unhandled_rejections().add(Rc::new(|_: &RejectionEvent<'_>| {}));
        assert_eq!(rt.run_until_idle(), 1);
        assert_eq!(rt.unhandled_rejections().len(), 1);
    }
}
