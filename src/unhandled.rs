use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::Promise;

/// Observer invoked for a rejection that had no failure reaction attached.
pub type UnhandledRejectionCallback = Rc<dyn Fn(&RejectionEvent<'_>)>;

/// The rejected promise and its reason.
///
/// One registry serves promises of every type, so both are handed out
/// type-erased and recovered with the accessors below.
pub struct RejectionEvent<'a> {
    promise: &'a dyn Any,
    reason: &'a dyn Any,
}

impl<'a> RejectionEvent<'a> {
    pub(crate) fn new<T: 'static, E: 'static>(promise: &'a Promise<T, E>, reason: &'a E) -> Self {
        Self { promise, reason }
    }

    /// The rejected promise, if it has this type.
    pub fn promise<T: 'static, E: 'static>(&self) -> Option<&'a Promise<T, E>> {
        self.promise.downcast_ref()
    }

    /// The rejection reason, if it has this type.
    pub fn reason<E: 'static>(&self) -> Option<&'a E> {
        self.reason.downcast_ref()
    }
}

impl fmt::Debug for RejectionEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RejectionEvent").finish_non_exhaustive()
    }
}

/// Registered unhandled-rejection observers, in registration order.
///
/// The same callback may be added more than once and is then notified once per
/// registration.
///
/// # Examples
///
/// ```
/// use rpromise::{Error, Promise, RejectionEvent, Runtime, UnhandledRejectionCallback};
/// use std::{cell::Cell, rc::Rc};
///
/// let rt = Runtime::new();
/// let seen = Rc::new(Cell::new(0));
/// let s = seen.clone();
/// let cb: UnhandledRejectionCallback = Rc::new(move |event: &RejectionEvent<'_>| {
///     assert_eq!(event.reason::<Error>(), Some(&Error::ChainingCycle));
///     s.set(s.get() + 1);
/// });
/// rt.unhandled_rejections().add(cb.clone());
///
/// let _p = Promise::<(), Error>::rejected(&rt, Error::ChainingCycle);
/// rt.run_until_idle();
/// assert_eq!(seen.get(), 1);
///
/// assert!(rt.unhandled_rejections().remove(&cb));
/// ```
#[derive(Clone, Default)]
pub struct UnhandledRejections {
    callbacks: Rc<RefCell<Vec<UnhandledRejectionCallback>>>,
}

impl UnhandledRejections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, callback: UnhandledRejectionCallback) {
        self.callbacks.borrow_mut().push(callback);
    }

    /// Remove the first registration of `callback`. Returns `false` if it was
    /// not registered.
    pub fn remove(&self, callback: &UnhandledRejectionCallback) -> bool {
        let mut callbacks = self.callbacks.borrow_mut();
        match callbacks.iter().position(|cb| same_callback(cb, callback)) {
            Some(index) => {
                callbacks.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        self.callbacks.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.callbacks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.borrow().is_empty()
    }

    /// Notify every observer registered right now. Observers added or removed
    /// by a callback take effect from the next rejection.
    pub(crate) fn notify(&self, event: &RejectionEvent<'_>) {
        let snapshot: Vec<_> = self.callbacks.borrow().clone();
        tracing::debug!(observers = snapshot.len(), "unhandled promise rejection");
        for callback in snapshot {
            callback(event);
        }
    }
}

fn same_callback(a: &UnhandledRejectionCallback, b: &UnhandledRejectionCallback) -> bool {
    // Compare the allocation only; vtable pointers are not unique.
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

impl fmt::Debug for UnhandledRejections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnhandledRejections")
            .field("callbacks", &self.len())
            .finish()
    }
}
