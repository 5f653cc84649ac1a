//! Bounded concurrency runner
//!
//! Runs a worker over a collection with at most `concurrency` invocations in
//! flight. Results come back in input order, not completion order, so every
//! caller owns a stable slot per item without any shared state.

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Apply `worker` to every item, keeping at most `concurrency` futures in flight.
///
/// A ceiling of 0 is treated as 1.
pub async fn run_bounded<T, R, F, Fut>(items: Vec<T>, concurrency: usize, worker: F) -> Vec<R>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = R>,
{
    if items.is_empty() {
        return Vec::new();
    }

    let limit = concurrency.clamp(1, items.len());

    stream::iter(items)
        .map(worker)
        .buffered(limit)
        .collect()
        .await
}
