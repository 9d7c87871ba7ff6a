//! Deferred execution. A scheduler runs callbacks later, after the current
//! synchronous turn, in the order they were scheduled.
//!
use std::fmt;
use std::sync::mpsc::{channel, Receiver, Sender};

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Queue-later execution.
///
/// Implementations must run tasks in FIFO order and must never run a task
/// from inside `schedule` itself.
pub trait Scheduler {
    fn schedule(&self, task: Task);
}

/// The default scheduler: a FIFO of tasks drained by
/// [`run_until_idle`](MicrotaskQueue::run_until_idle).
///
/// # Examples
///
/// ```
/// use rpromise::{MicrotaskQueue, Scheduler};
/// use std::{cell::RefCell, rc::Rc};
///
/// let queue = MicrotaskQueue::new();
/// let log = Rc::new(RefCell::new(vec![]));
/// for n in 0..3 {
///     let log = log.clone();
///     queue.schedule(Box::new(move || log.borrow_mut().push(n)));
/// }
/// assert!(log.borrow().is_empty());
/// assert_eq!(queue.run_until_idle(), 3);
/// assert_eq!(*log.borrow(), [0, 1, 2]);
/// ```
pub struct MicrotaskQueue {
    sender: Sender<Task>,
    receiver: Receiver<Task>,
}

impl MicrotaskQueue {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self { sender, receiver }
    }

    /// Run queued tasks until none are left, including the ones scheduled
    /// while draining. Returns how many tasks ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            ran += 1;
        }
        if ran > 0 {
            tracing::trace!(tasks = ran, "microtask queue idle");
        }
        ran
    }
}

impl Default for MicrotaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for MicrotaskQueue {
    fn schedule(&self, task: Task) {
        // The receiver lives as long as `self`, so sending cannot fail.
        let _ = self.sender.send(task);
    }
}

impl fmt::Debug for MicrotaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicrotaskQueue").finish_non_exhaustive()
    }
}
