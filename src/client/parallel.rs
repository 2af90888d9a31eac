//! Bounded-concurrency helpers for per-record network work.

use std::future::Future;
use std::pin::Pin;

use futures::stream::{FuturesUnordered, StreamExt};
use log::debug;

/// Type alias for boxed futures tagged with their input position
type IndexedFuture<'a, R> = Pin<Box<dyn Future<Output = (usize, R)> + Send + 'a>>;

/// Run `work` over every item with at most `max_concurrent` in flight.
///
/// Results come back in input order. `work` is infallible from this
/// function's point of view: each item reports its own outcome in `R`, so
/// one slow or failed item never cancels its siblings.
///
/// # Example
///
/// ```ignore
/// let images = map_bounded(
///     records,
///     |record| async move { fetcher.try_fetch(record.media_url.as_ref()).await },
///     4,
/// )
/// .await;
/// ```
pub async fn map_bounded<'a, T, R, F, Fut>(
    items: Vec<T>,
    work: F,
    max_concurrent: usize,
) -> Vec<R>
where
    T: 'a,
    R: Send + 'a,
    F: Fn(T) -> Fut + 'a,
    Fut: Future<Output = R> + Send + 'a,
{
    if items.is_empty() {
        return Vec::new();
    }

    let total = items.len();
    let max_concurrent = max_concurrent.max(1);
    debug!("Processing {} items with max {} concurrent", total, max_concurrent);

    let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
    let mut futures: FuturesUnordered<IndexedFuture<'a, R>> = FuturesUnordered::new();
    let mut pending = items.into_iter().enumerate();

    // Helper to create a boxed future
    let make_future = |index: usize, item: T| -> IndexedFuture<'a, R> {
        let fut = work(item);
        Box::pin(async move { (index, fut.await) })
    };

    // Seed initial batch up to max_concurrent
    for (index, item) in pending.by_ref().take(max_concurrent) {
        futures.push(make_future(index, item));
    }

    // Refill as each item finishes to keep the pipeline full
    while let Some((index, result)) = futures.next().await {
        slots[index] = Some(result);

        if let Some((next_index, next_item)) = pending.next() {
            futures.push(make_future(next_index, next_item));
        }
    }

    slots.into_iter().flatten().collect()
}
