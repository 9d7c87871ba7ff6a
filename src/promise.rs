use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::Rc;

use crate::resolution::{Resolution, Resolvers};
use crate::runtime::Runtime;
use crate::unhandled::RejectionEvent;
use crate::Error;

type Reaction<A> = Box<dyn FnOnce(A)>;

/// Where a promise is in its life. It leaves `Pending` at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Fulfilled,
    Rejected,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Pending => "pending",
            Status::Fulfilled => "fulfilled",
            Status::Rejected => "rejected",
        })
    }
}

enum State<T, E> {
    Pending {
        on_fulfilled: Vec<Reaction<T>>,
        on_rejected: Vec<Reaction<E>>,
    },
    Fulfilled(T),
    Rejected(E),
}

struct Inner<T, E> {
    state: State<T, E>,
    handled: bool,
}

/// A value that settles once, to `T` or to a reason `E`, and tells every
/// reaction about it on a later turn of its [`Runtime`].
///
/// `Promise` is a handle: clones refer to the same instance and compare equal.
///
/// # Examples
///
/// ```
/// use rpromise::{Error, Promise, Resolution, Runtime};
///
/// let rt = Runtime::new();
/// let doubled = Promise::<u32, Error>::new(&rt, |resolvers| {
///     resolvers.resolve(21);
///     Ok(())
/// })
/// .and_then(|n| Ok(Resolution::Value(n * 2)));
///
/// // nothing settles until the runtime gets a turn
/// assert_eq!(doubled.outcome(), None);
/// rt.run_until_idle();
/// assert_eq!(doubled.outcome(), Some(Ok(42)));
/// ```
pub struct Promise<T, E> {
    inner: Rc<RefCell<Inner<T, E>>>,
    runtime: Runtime,
}

impl<T, E> Promise<T, E> {
    pub(crate) fn pending(runtime: &Runtime) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state: State::Pending {
                    on_fulfilled: Vec::new(),
                    on_rejected: Vec::new(),
                },
                handled: false,
            })),
            runtime: runtime.clone(),
        }
    }

    pub fn status(&self) -> Status {
        match self.inner.borrow().state {
            State::Pending { .. } => Status::Pending,
            State::Fulfilled(_) => Status::Fulfilled,
            State::Rejected(_) => Status::Rejected,
        }
    }

    /// Whether any reaction was ever registered on this promise.
    pub fn is_handled(&self) -> bool {
        self.inner.borrow().handled
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    /// Run `executor` right away with this promise's [`Resolvers`].
    ///
    /// An `Err` returned by the executor rejects the promise, unless it was
    /// already resolved.
    pub fn new<F>(runtime: &Runtime, executor: F) -> Self
    where
        F: FnOnce(Resolvers<T, E>) -> Result<(), E>,
    {
        let (promise, resolvers) = Self::with_resolvers(runtime);
        if let Err(reason) = executor(resolvers.clone()) {
            resolvers.reject(reason);
        }
        promise
    }

    /// A promise that fulfills with `value` on the next turn.
    pub fn resolved(runtime: &Runtime, value: T) -> Self {
        Self::new(runtime, |resolvers| {
            resolvers.resolve(value);
            Ok(())
        })
    }

    /// A promise that rejects with `reason` on the next turn.
    pub fn rejected(runtime: &Runtime, reason: E) -> Self {
        Self::new(runtime, |resolvers| {
            resolvers.reject(reason);
            Ok(())
        })
    }

    /// A pending promise and the capabilities that settle it.
    pub fn with_resolvers(runtime: &Runtime) -> (Self, Resolvers<T, E>) {
        let promise = Self::pending(runtime);
        let resolvers = Resolvers::new(promise.clone());
        (promise, resolvers)
    }

    /// Run `f` now and settle with whatever it produced.
    pub fn attempt<F>(runtime: &Runtime, f: F) -> Self
    where
        F: FnOnce() -> Result<Resolution<T, E>, E>,
    {
        Self::new(runtime, |resolvers| {
            resolvers.resolve_with(f()?);
            Ok(())
        })
    }

    /// Lift a resolution into a promise. A promise is returned as is.
    pub fn from_resolution(runtime: &Runtime, resolution: Resolution<T, E>) -> Self {
        match resolution {
            Resolution::Promise(promise) => promise,
            resolution => Self::new(runtime, |resolvers| {
                resolvers.resolve_with(resolution);
                Ok(())
            }),
        }
    }

    /// The settled payload, or `None` while pending.
    pub fn outcome(&self) -> Option<Result<T, E>> {
        match &self.inner.borrow().state {
            State::Pending { .. } => None,
            State::Fulfilled(value) => Some(Ok(value.clone())),
            State::Rejected(reason) => Some(Err(reason.clone())),
        }
    }

    /// Derive a promise from this one's outcome.
    ///
    /// Exactly one handler runs, on a later turn. Its `Ok` result goes
    /// through the resolution procedure; its `Err` rejects the derived
    /// promise.
    pub fn then<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + 'static,
        R: FnOnce(E) -> Result<Resolution<U, E>, E> + 'static,
    {
        let (derived, resolvers) = Promise::with_resolvers(&self.runtime);
        self.subscribe(
            reaction(resolvers.clone(), on_fulfilled),
            reaction(resolvers, on_rejected),
        );
        derived
    }

    /// `then` with rejections passed through unchanged.
    pub fn and_then<U, F>(&self, on_fulfilled: F) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + 'static,
    {
        self.then(on_fulfilled, |reason| Err(reason))
    }

    /// `then` with fulfillments passed through unchanged.
    pub fn catch<R>(&self, on_rejected: R) -> Promise<T, E>
    where
        R: FnOnce(E) -> Result<Resolution<T, E>, E> + 'static,
    {
        self.then(|value| Ok(Resolution::Value(value)), on_rejected)
    }

    /// Run `on_finally` once this promise settles either way, wait for what it
    /// returns, then settle with the original outcome.
    ///
    /// If `on_finally` fails, or what it returns rejects, that reason wins.
    pub fn finally<X, F>(&self, on_finally: F) -> Promise<T, E>
    where
        X: Clone + 'static,
        F: FnOnce() -> Result<Resolution<X, E>, E> + 'static,
    {
        let slot = Rc::new(Cell::new(Some(on_finally)));
        let (runtime, slot_on_reject) = (self.runtime().clone(), slot.clone());
        let runtime_on_reject = runtime.clone();
        self.then(
            move |value| {
                let Some(on_finally) = slot.take() else {
                    return Ok(Resolution::Value(value));
                };
                let done = Promise::from_resolution(&runtime, on_finally()?);
                Ok(Resolution::Promise(done.then(
                    move |_| Ok(Resolution::Value(value)),
                    |reason| Err(reason),
                )))
            },
            move |reason| {
                let Some(on_finally) = slot_on_reject.take() else {
                    return Err(reason);
                };
                let done = Promise::from_resolution(&runtime_on_reject, on_finally()?);
                Ok(Resolution::Promise(
                    done.then(move |_| Err(reason), |reason| Err(reason)),
                ))
            },
        )
    }

    /// Register raw reactions. Runs the matching one on a later turn if this
    /// promise has already settled.
    pub(crate) fn subscribe(&self, on_fulfilled: Reaction<T>, on_rejected: Reaction<E>) {
        let mut inner = self.inner.borrow_mut();
        inner.handled = true;
        let task: Box<dyn FnOnce()> = match &mut inner.state {
            State::Pending {
                on_fulfilled: fulfill_reactions,
                on_rejected: reject_reactions,
            } => {
                fulfill_reactions.push(on_fulfilled);
                reject_reactions.push(on_rejected);
                return;
            }
            State::Fulfilled(value) => {
                let value = value.clone();
                Box::new(move || on_fulfilled(value))
            }
            State::Rejected(reason) => {
                let reason = reason.clone();
                Box::new(move || on_rejected(reason))
            }
        };
        drop(inner);
        self.runtime.schedule(task);
    }

    pub(crate) fn schedule_fulfill(&self, value: T) {
        let promise = self.clone();
        self.runtime.schedule(Box::new(move || promise.fulfill(value)));
    }

    pub(crate) fn schedule_reject(&self, reason: E) {
        let promise = self.clone();
        self.runtime.schedule(Box::new(move || promise.reject(reason)));
    }

    fn fulfill(&self, value: T) {
        let Some((on_fulfilled, _)) = self.settle(State::Fulfilled(value.clone())) else {
            return;
        };
        tracing::trace!(reactions = on_fulfilled.len(), "promise fulfilled");
        for reaction in on_fulfilled {
            reaction(value.clone());
        }
    }

    fn reject(&self, reason: E) {
        let Some((_, on_rejected)) = self.settle(State::Rejected(reason.clone())) else {
            return;
        };
        tracing::trace!(reactions = on_rejected.len(), "promise rejected");
        let unhandled = on_rejected.is_empty();
        for reaction in on_rejected {
            reaction(reason.clone());
        }
        if unhandled {
            self.runtime
                .unhandled_rejections()
                .notify(&RejectionEvent::new(self, &reason));
        }
    }

    /// Leave `Pending` for `next`, handing back the drained reactions. `None`
    /// if already settled.
    #[allow(clippy::type_complexity)]
    fn settle(&self, next: State<T, E>) -> Option<(Vec<Reaction<T>>, Vec<Reaction<E>>)> {
        let mut inner = self.inner.borrow_mut();
        if !matches!(inner.state, State::Pending { .. }) {
            return None;
        }
        match mem::replace(&mut inner.state, next) {
            State::Pending {
                on_fulfilled,
                on_rejected,
            } => Some((on_fulfilled, on_rejected)),
            _ => None,
        }
    }
}

fn reaction<A, U, E, H>(resolvers: Resolvers<U, E>, handler: H) -> Reaction<A>
where
    A: 'static,
    U: Clone + 'static,
    E: Clone + From<Error> + 'static,
    H: FnOnce(A) -> Result<Resolution<U, E>, E> + 'static,
{
    Box::new(move |arg| match handler(arg) {
        Ok(resolution) => resolvers.resolve_with(resolution),
        Err(reason) => resolvers.reject(reason),
    })
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T, E> PartialEq for Promise<T, E> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T, E> Eq for Promise<T, E> {}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("status", &self.status())
            .field("handled", &self.is_handled())
            .finish()
    }
}
