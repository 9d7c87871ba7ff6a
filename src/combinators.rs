//! Promises built from many promises.
//!
//! Every combinator accepts anything that converts into a [`Resolution`]:
//! promises are used as is, other values are wrapped first. Losers of a race
//! keep running; their outcomes are dropped.
//!
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::{AggregateError, Error, Promise, Resolution, Runtime};

/// Outcome record produced by [`all_settled`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettledResult<T, E> {
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> SettledResult<T, E> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, SettledResult::Fulfilled(_))
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            SettledResult::Fulfilled(value) => Ok(value),
            SettledResult::Rejected(reason) => Err(reason),
        }
    }
}

/// Fulfills with every value, in input order, once all inputs fulfilled.
/// Rejects with the first rejection.
///
/// # Examples
///
/// ```
/// use rpromise::{all, Error, Promise, Runtime};
///
/// let rt = Runtime::new();
/// let joined = all(&rt, (1..=3).map(|n| Promise::<i32, Error>::resolved(&rt, n)));
/// rt.run_until_idle();
/// assert_eq!(joined.outcome(), Some(Ok(vec![1, 2, 3])));
/// ```
pub fn all<T, E, I>(runtime: &Runtime, promises: I) -> Promise<Vec<T>, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
    I: IntoIterator,
    I::Item: Into<Resolution<T, E>>,
{
    let (joined, resolvers) = Promise::with_resolvers(runtime);
    let values: Rc<RefCell<Vec<Option<T>>>> = Rc::default();
    // Starts at one so an empty input, or inputs that all settle before the
    // loop ends, still finish exactly once.
    let remaining = Rc::new(Cell::new(1usize));

    for (index, item) in promises.into_iter().enumerate() {
        values.borrow_mut().push(None);
        remaining.set(remaining.get() + 1);

        let element: Promise<T, E> = Promise::from_resolution(runtime, item.into());
        let (values, remaining) = (values.clone(), remaining.clone());
        let (on_fulfilled, on_rejected) = (resolvers.clone(), resolvers.clone());
        element.then(
            move |value| {
                values.borrow_mut()[index] = Some(value);
                if count_down(&remaining) {
                    on_fulfilled.resolve(drain(&values));
                }
                Ok(Resolution::Value(()))
            },
            move |reason| {
                on_rejected.reject(reason);
                Ok(Resolution::Value(()))
            },
        );
    }

    if count_down(&remaining) {
        resolvers.resolve(drain(&values));
    }
    joined
}

/// Fulfills once every input settled, with one record per input in input
/// order. Never rejects.
pub fn all_settled<T, E, I>(
    runtime: &Runtime,
    promises: I,
) -> Promise<Vec<SettledResult<T, E>>, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
    I: IntoIterator,
    I::Item: Into<Resolution<T, E>>,
{
    let (settled, resolvers) = Promise::with_resolvers(runtime);
    let records: Rc<RefCell<Vec<Option<SettledResult<T, E>>>>> = Rc::default();
    let remaining = Rc::new(Cell::new(1usize));

    for (index, item) in promises.into_iter().enumerate() {
        records.borrow_mut().push(None);
        remaining.set(remaining.get() + 1);

        let element: Promise<T, E> = Promise::from_resolution(runtime, item.into());
        let record = {
            let (records, remaining, resolvers) =
                (records.clone(), remaining.clone(), resolvers.clone());
            move |result: SettledResult<T, E>| {
                records.borrow_mut()[index] = Some(result);
                if count_down(&remaining) {
                    resolvers.resolve(drain(&records));
                }
            }
        };
        let on_rejected = record.clone();
        element.then(
            move |value| {
                record(SettledResult::Fulfilled(value));
                Ok(Resolution::Value(()))
            },
            move |reason| {
                on_rejected(SettledResult::Rejected(reason));
                Ok(Resolution::Value(()))
            },
        );
    }

    if count_down(&remaining) {
        resolvers.resolve(drain(&records));
    }
    settled
}

/// Fulfills with the first input to fulfill. Rejects with an
/// [`AggregateError`] of every reason, in input order, once all inputs
/// rejected; an empty input rejects with an empty aggregate.
pub fn any<T, E, I>(runtime: &Runtime, promises: I) -> Promise<T, AggregateError<E>>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
    I: IntoIterator,
    I::Item: Into<Resolution<T, E>>,
{
    let (first, resolvers) = Promise::with_resolvers(runtime);
    let reasons: Rc<RefCell<Vec<Option<E>>>> = Rc::default();
    let remaining = Rc::new(Cell::new(1usize));

    for (index, item) in promises.into_iter().enumerate() {
        reasons.borrow_mut().push(None);
        remaining.set(remaining.get() + 1);

        let element: Promise<T, E> = Promise::from_resolution(runtime, item.into());
        let (reasons, remaining) = (reasons.clone(), remaining.clone());
        let (on_fulfilled, on_rejected) = (resolvers.clone(), resolvers.clone());
        element.then(
            move |value| {
                on_fulfilled.resolve(value);
                Ok(Resolution::Value(()))
            },
            move |reason| {
                reasons.borrow_mut()[index] = Some(reason);
                if count_down(&remaining) {
                    on_rejected.reject(AggregateError::new(drain(&reasons)));
                }
                Ok(Resolution::Value(()))
            },
        );
    }

    if count_down(&remaining) {
        resolvers.reject(AggregateError::new(drain(&reasons)));
    }
    first
}

/// Settles like the first input to settle, either way.
///
/// An empty input never settles.
pub fn race<T, E, I>(runtime: &Runtime, promises: I) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
    I: IntoIterator,
    I::Item: Into<Resolution<T, E>>,
{
    let (winner, resolvers) = Promise::with_resolvers(runtime);
    for item in promises {
        let element: Promise<T, E> = Promise::from_resolution(runtime, item.into());
        let (on_fulfilled, on_rejected) = (resolvers.clone(), resolvers.clone());
        element.then(
            move |value| {
                on_fulfilled.resolve(value);
                Ok(Resolution::Value(()))
            },
            move |reason| {
                on_rejected.reject(reason);
                Ok(Resolution::Value(()))
            },
        );
    }
    winner
}

/// Returns `true` when this was the last outstanding element.
fn count_down(remaining: &Cell<usize>) -> bool {
    let left = remaining.get().saturating_sub(1);
    remaining.set(left);
    left == 0
}

fn drain<T>(slots: &RefCell<Vec<Option<T>>>) -> Vec<T> {
    slots.take().into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Status;

    #[derive(Debug, Clone, PartialEq)]
    enum Reason {
        Cycle,
        Msg(&'static str),
    }

    impl From<Error> for Reason {
        fn from(_: Error) -> Self {
            Reason::Cycle
        }
    }

    type P<T> = Promise<T, Reason>;

    /// Fulfill after `turns` extra trips through the scheduler.
    fn after<T>(rt: &Runtime, turns: usize, outcome: Result<T, Reason>) -> P<T>
    where
        T: Clone + 'static,
    {
        let (p, resolvers) = P::with_resolvers(rt);
        fn step<T: Clone + 'static>(
            rt: Runtime,
            turns: usize,
            resolvers: crate::Resolvers<T, Reason>,
            outcome: Result<T, Reason>,
        ) {
            if turns == 0 {
                match outcome {
                    Ok(value) => resolvers.resolve(value),
                    Err(reason) => resolvers.reject(reason),
                }
                return;
            }
            let next = rt.clone();
            rt.schedule(Box::new(move || step(next, turns - 1, resolvers, outcome)));
        }
        step(rt.clone(), turns, resolvers, outcome);
        p
    }

    #[test]
    fn all_keeps_input_order() {
        let rt = Runtime::new();
        let joined = all(
            &rt,
            vec![after(&rt, 3, Ok(1)), after(&rt, 1, Ok(2)), after(&rt, 2, Ok(3))],
        );
        rt.run_until_idle();
        assert_eq!(joined.outcome(), Some(Ok(vec![1, 2, 3])));
    }

    #[test]
    fn all_rejects_with_first_rejection() {
        let rt = Runtime::new();
        let joined = all(
            &rt,
            vec![
                P::resolved(&rt, 1),
                after(&rt, 2, Err(Reason::Msg("late"))),
                after(&rt, 1, Err(Reason::Msg("early"))),
            ],
        );
        rt.run_until_idle();
        assert_eq!(joined.outcome(), Some(Err(Reason::Msg("early"))));
    }

    #[test]
    fn all_accepts_plain_values() {
        let rt = Runtime::new();
        let joined = all(
            &rt,
            vec![Resolution::<i32, Reason>::Value(1), P::resolved(&rt, 2).into()],
        );
        rt.run_until_idle();
        assert_eq!(joined.outcome(), Some(Ok(vec![1, 2])));
    }

    #[test]
    fn all_of_nothing_is_empty() {
        let rt = Runtime::new();
        let joined = all(&rt, Vec::<P<i32>>::new());
        rt.run_until_idle();
        assert_eq!(joined.outcome(), Some(Ok(vec![])));
    }

    #[test]
    fn all_settled_records_each_outcome() {
        let rt = Runtime::new();
        let settled = all_settled(
            &rt,
            vec![after(&rt, 2, Ok(1)), P::rejected(&rt, Reason::Msg("no"))],
        );
        rt.run_until_idle();
        let records = match settled.outcome() {
            Some(Ok(records)) => records,
            other => panic!("unexpected outcome {other:?}"),
        };
        assert_eq!(
            records,
            vec![
                SettledResult::Fulfilled(1),
                SettledResult::Rejected(Reason::Msg("no")),
            ]
        );
        assert!(records[0].is_fulfilled());
        assert_eq!(records[1].clone().into_result(), Err(Reason::Msg("no")));
    }

    #[test]
    fn all_settled_of_nothing_is_empty() {
        let rt = Runtime::new();
        let settled = all_settled(&rt, Vec::<P<i32>>::new());
        rt.run_until_idle();
        assert_eq!(settled.outcome(), Some(Ok(vec![])));
    }

    #[test]
    fn any_takes_earliest_fulfillment() {
        let rt = Runtime::new();
        let first = any(
            &rt,
            vec![
                P::rejected(&rt, Reason::Msg("no")),
                after(&rt, 3, Ok(2)),
                after(&rt, 1, Ok(3)),
            ],
        );
        rt.run_until_idle();
        assert_eq!(first.outcome(), Some(Ok(3)));
    }

    #[test]
    fn any_aggregates_in_input_order() {
        let rt = Runtime::new();
        let first = any(
            &rt,
            vec![
                after(&rt, 2, Err::<i32, _>(Reason::Msg("a"))),
                after(&rt, 0, Err(Reason::Msg("b"))),
                after(&rt, 1, Err(Reason::Msg("c"))),
            ],
        );
        rt.run_until_idle();
        let expected =
            AggregateError::new(vec![Reason::Msg("a"), Reason::Msg("b"), Reason::Msg("c")]);
        assert_eq!(first.outcome(), Some(Err(expected)));
    }

    #[test]
    fn any_of_nothing_rejects_empty() {
        let rt = Runtime::new();
        let first = any(&rt, Vec::<P<i32>>::new());
        rt.run_until_idle();
        assert_eq!(first.outcome(), Some(Err(AggregateError::new(vec![]))));
    }

    #[test]
    fn race_follows_earliest_settlement() {
        let rt = Runtime::new();
        let winner = race(
            &rt,
            vec![after(&rt, 4, Ok(1)), after(&rt, 2, Ok(2)), after(&rt, 6, Ok(3))],
        );
        rt.run_until_idle();
        assert_eq!(winner.outcome(), Some(Ok(2)));

        let loser = race(
            &rt,
            vec![
                after(&rt, 4, Err::<i32, _>(Reason::Msg("1"))),
                after(&rt, 2, Err(Reason::Msg("2"))),
                after(&rt, 1, Ok(3)),
            ],
        );
        rt.run_until_idle();
        assert_eq!(loser.outcome(), Some(Ok(3)));
    }

    #[test]
    fn race_follows_an_earlier_rejection() {
        let rt = Runtime::new();
        let winner = race(
            &rt,
            vec![after(&rt, 3, Ok(1)), after(&rt, 1, Err(Reason::Msg("first")))],
        );
        rt.run_until_idle();
        assert_eq!(winner.outcome(), Some(Err(Reason::Msg("first"))));
    }

    #[test]
    fn race_of_nothing_stays_pending() {
        let rt = Runtime::new();
        let winner = race(&rt, Vec::<P<i32>>::new());
        rt.run_until_idle();
        assert_eq!(winner.status(), Status::Pending);
    }
}
