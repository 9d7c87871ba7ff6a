#![allow(dead_code)]

use rpromise::{Error, Promise, Resolvers, Runtime};

/// Rejection reason used across the integration tests.
#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    Machinery(Error),
    Msg(&'static str),
}

impl From<Error> for Reason {
    fn from(err: Error) -> Self {
        Reason::Machinery(err)
    }
}

pub type P<T> = Promise<T, Reason>;

/// Settle after `turns` extra trips through the scheduler.
pub fn after<T: Clone + 'static>(rt: &Runtime, turns: usize, outcome: Result<T, Reason>) -> P<T> {
    let (p, resolvers) = P::with_resolvers(rt);
    delay(rt.clone(), turns, resolvers, outcome);
    p
}

fn delay<T: Clone + 'static>(
    rt: Runtime,
    turns: usize,
    resolvers: Resolvers<T, Reason>,
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
    rt.schedule(Box::new(move || delay(next, turns - 1, resolvers, outcome)));
}
