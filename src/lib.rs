//! Promises/A+ deferred values for single-threaded code.
//!
//! A [`Promise`] starts pending, settles exactly once, and notifies its
//! reactions on a later turn of the [`Runtime`] it was created with, never
//! synchronously. Values that are themselves promises, or any other
//! [`Thenable`], are adopted rather than stored.
//!
//! ```
//! use rpromise::{any, Error, Promise, Resolution, Runtime};
//!
//! let rt = Runtime::new();
//! let (slow, settle) = Promise::<&str, Error>::with_resolvers(&rt);
//! let quick = Promise::resolved(&rt, "quick");
//!
//! let first = any(&rt, [slow, quick]).and_then(|s| Ok(Resolution::Value(s.len())));
//! settle.resolve("slow");
//! rt.run_until_idle();
//! assert_eq!(first.outcome(), Some(Ok(5)));
//! ```
//!
//! Rejections that nobody reacted to are reported to the observers in
//! [`Runtime::unhandled_rejections`].

pub mod combinators;
pub mod error;
pub mod promise;
pub mod resolution;
pub mod runtime;
pub mod scheduler;
pub mod unhandled;

pub use combinators::{all, all_settled, any, race, SettledResult};
pub use error::{AggregateError, Error};
pub use promise::{Promise, Status};
pub use resolution::{Resolution, Resolvers, Thenable};
pub use runtime::Runtime;
pub use scheduler::{MicrotaskQueue, Scheduler, Task};
pub use unhandled::{RejectionEvent, UnhandledRejectionCallback, UnhandledRejections};
