//! Bounded worker pool for phase fan-out.
//!
//! Items are pulled lazily from the input iterator and at most `limit`
//! tasks are in flight. The first failure aborts the remaining tasks.

use std::future::Future;
use std::sync::Arc;

use mapmirror_core::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

fn flatten<T>(joined: Result<Result<T, Error>, JoinError>) -> Result<T, Error> {
    joined.map_err(|e| Error::Task(e.to_string()))?
}

/// Run `task` for every item with at most `limit` concurrent tasks.
///
/// Results are returned in completion order.
pub async fn run_bounded<I, F, Fut, T>(limit: usize, items: I, task: F) -> Result<Vec<T>, Error>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = Result<T, Error>> + Send + 'static,
    T: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut join_set = JoinSet::new();
    let mut results = Vec::new();

    for item in items {
        while let Some(joined) = join_set.try_join_next() {
            results.push(flatten(joined)?);
        }

        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| Error::Task(e.to_string()))?;

        let fut = task(item);
        join_set.spawn(async move {
            let _permit = permit;
            fut.await
        });
    }

    while let Some(joined) = join_set.join_next().await {
        results.push(flatten(joined)?);
    }

    Ok(results)
}
