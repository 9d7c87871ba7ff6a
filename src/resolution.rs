//! The resolution procedure: settle a promise with a value that may itself be
//! a promise or some other thenable, adopting its outcome.
//!
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::{Error, Promise};

/// Anything that can report an outcome later, the way a promise does.
///
/// Implementors call the given [`Resolvers`] whenever they like, as often as
/// they like: only the first call has an effect. Returning `Err` rejects with
/// that reason, unless a resolver was already called.
pub trait Thenable<T, E> {
    fn then(&self, resolvers: Resolvers<T, E>) -> Result<(), E>;

    /// The promise behind this thenable, if it is one. Used to catch a
    /// promise being resolved with itself.
    #[doc(hidden)]
    fn as_promise(&self) -> Option<&Promise<T, E>> {
        None
    }
}

/// What a promise is being resolved with.
pub enum Resolution<T, E> {
    /// Fulfill with this value.
    Value(T),
    /// Adopt this promise's outcome.
    Promise(Promise<T, E>),
    /// Adopt the outcome of a foreign thenable.
    Thenable(Box<dyn Thenable<T, E>>),
}

impl<T, E> Resolution<T, E> {
    pub fn thenable<Th>(thenable: Th) -> Self
    where
        Th: Thenable<T, E> + 'static,
    {
        Resolution::Thenable(Box::new(thenable))
    }
}

impl<T, E> From<Promise<T, E>> for Resolution<T, E> {
    fn from(promise: Promise<T, E>) -> Self {
        Resolution::Promise(promise)
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Resolution<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Resolution::Promise(promise) => f.debug_tuple("Promise").field(promise).finish(),
            Resolution::Thenable(_) => f.write_str("Thenable(..)"),
        }
    }
}

/// The capabilities that settle one promise.
///
/// Clones share a single "already resolved" flag: whichever call comes first,
/// `resolve`, `resolve_with` or `reject`, wins and the rest are ignored.
pub struct Resolvers<T, E> {
    promise: Promise<T, E>,
    already_resolved: Rc<Cell<bool>>,
}

impl<T, E> Resolvers<T, E> {
    pub(crate) fn new(promise: Promise<T, E>) -> Self {
        Self {
            promise,
            already_resolved: Rc::new(Cell::new(false)),
        }
    }

    /// Whether one of the capabilities was already used.
    pub fn is_resolved(&self) -> bool {
        self.already_resolved.get()
    }
}

impl<T, E> Resolvers<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    pub fn resolve(&self, value: T) {
        self.resolve_with(Resolution::Value(value));
    }

    pub fn resolve_with(&self, resolution: Resolution<T, E>) {
        if self.already_resolved.replace(true) {
            return;
        }
        resolve(&self.promise, resolution);
    }

    pub fn reject(&self, reason: E) {
        if self.already_resolved.replace(true) {
            return;
        }
        self.promise.schedule_reject(reason);
    }
}

impl<T, E> Clone for Resolvers<T, E> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
            already_resolved: self.already_resolved.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Resolvers<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolvers")
            .field("promise", &self.promise)
            .field("already_resolved", &self.already_resolved.get())
            .finish()
    }
}

impl<T, E> Thenable<T, E> for Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    fn then(&self, resolvers: Resolvers<T, E>) -> Result<(), E> {
        let on_rejected = resolvers.clone();
        self.subscribe(
            Box::new(move |value| resolvers.resolve(value)),
            Box::new(move |reason| on_rejected.reject(reason)),
        );
        Ok(())
    }

    fn as_promise(&self) -> Option<&Promise<T, E>> {
        Some(self)
    }
}

fn resolve<T, E>(promise: &Promise<T, E>, resolution: Resolution<T, E>)
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    match resolution {
        Resolution::Value(value) => promise.schedule_fulfill(value),
        Resolution::Promise(other) => adopt(promise, &other),
        Resolution::Thenable(thenable) => adopt(promise, thenable.as_ref()),
    }
}

fn adopt<T, E>(promise: &Promise<T, E>, thenable: &dyn Thenable<T, E>)
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    if thenable.as_promise() == Some(promise) {
        tracing::warn!("chaining cycle detected for promise");
        promise.schedule_reject(E::from(Error::ChainingCycle));
        return;
    }
    // Fresh flag: the thenable gets one shot at settling `promise`.
    let resolvers = Resolvers::new(promise.clone());
    if let Err(reason) = thenable.then(resolvers.clone()) {
        resolvers.reject(reason);
    }
}
