use thiserror::Error;

/// Errors raised by the promise machinery itself.
///
/// Reason types used with [`Promise`](crate::Promise) must implement
/// `From<Error>` so these can be delivered as ordinary rejections.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A promise was resolved with itself.
    #[error("chaining cycle detected for promise")]
    ChainingCycle,
}

/// Rejection reason of [`any`](crate::any) when every input rejected.
///
/// `errors` follows input order, not settlement order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("all promises were rejected")]
pub struct AggregateError<E> {
    pub errors: Vec<E>,
}

impl<E> AggregateError<E> {
    pub fn new(errors: Vec<E>) -> Self {
        Self { errors }
    }
}

// Lets the aggregate stand in as a reason type; a machinery error becomes a
// single-entry aggregate.
impl<E: From<Error>> From<Error> for AggregateError<E> {
    fn from(err: Error) -> Self {
        Self::new(vec![E::from(err)])
    }
}
